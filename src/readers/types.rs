use std::fmt;

pub trait GridReader {
    fn read_grid(&self) -> Result<Grid, ReadError>;
}

#[derive(Debug)]
pub enum ReadError {
    Io(String),
    Header(String),
    Body(String),
}

#[derive(Debug)]
pub enum FileError {
    UnknownFileType,
}

pub enum FileType {
    AsciiGrid,
}

/// Decoded raster grid. Values are row-major with the first row being the
/// northernmost, as stored in the file.
#[derive(Debug, Clone)]
pub struct Grid {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: f32,
    pub values: Vec<f32>,
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid = self.values.iter().filter(|&&v| v != self.nodata);

        let min_value = valid
            .clone()
            .min_by(|a, b| a.partial_cmp(b).unwrap())
            .unwrap_or(&f32::NAN);

        let max_value = valid
            .max_by(|a, b| a.partial_cmp(b).unwrap())
            .unwrap_or(&f32::NAN);

        write!(
            f,
            "Cols: {}\nRows: {}\nCell size: {}\nMin value: {}\nMax value: {}",
            self.ncols, self.nrows, self.cellsize, min_value, max_value,
        )
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(msg) => write!(f, "I/O error: {}", msg),
            ReadError::Header(msg) => write!(f, "Invalid grid header: {}", msg),
            ReadError::Body(msg) => write!(f, "Invalid grid body: {}", msg),
        }
    }
}

impl std::error::Error for ReadError {}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::UnknownFileType => write!(f, "Unknown raster file type"),
        }
    }
}

impl std::error::Error for FileError {}
