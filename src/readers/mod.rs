pub mod ascii_grid;
pub mod types;
pub mod utils;

pub use ascii_grid::AsciiGridReader;
pub use types::{FileError, FileType, Grid, GridReader, ReadError};
pub use utils::reader_from_filetype;

pub fn create_reader(file_name: String) -> Result<Box<dyn GridReader>, FileError> {
    match reader_from_filetype(file_name.as_ref()) {
        Ok(FileType::AsciiGrid) => Ok(Box::new(AsciiGridReader { file_name })),
        Err(e) => Err(e),
    }
}
