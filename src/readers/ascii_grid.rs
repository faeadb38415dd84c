use super::{Grid, GridReader, ReadError};
use std::fs;

const DEFAULT_NODATA: f32 = -9999.0;

/// Reader for ESRI ASCII grids: a short `key value` header followed by
/// whitespace-separated cell values, first row northernmost.
pub struct AsciiGridReader {
    pub file_name: String,
}

impl GridReader for AsciiGridReader {
    fn read_grid(&self) -> Result<Grid, ReadError> {
        let content = fs::read_to_string(&self.file_name)
            .map_err(|e| ReadError::Io(format!("Failed to open {}: {}", self.file_name, e)))?;

        let mut ncols: Option<usize> = None;
        let mut nrows: Option<usize> = None;
        let mut xllcorner: Option<f64> = None;
        let mut yllcorner: Option<f64> = None;
        let mut cellsize: Option<f64> = None;
        let mut nodata: Option<f32> = None;

        let mut body_start = 0;

        for (index, line) in content.lines().enumerate() {
            let mut parts = line.split_whitespace();

            let Some(key) = parts.next() else {
                continue; // blank line
            };

            // The body starts at the first line not beginning with a header key
            if !key.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                body_start = index;
                break;
            }

            let value = parts
                .next()
                .ok_or_else(|| ReadError::Header(format!("Missing value for '{}'", key)))?;

            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(parse_header(key, value)?),
                "nrows" => nrows = Some(parse_header(key, value)?),
                "xllcorner" => xllcorner = Some(parse_header(key, value)?),
                "yllcorner" => yllcorner = Some(parse_header(key, value)?),
                "cellsize" => cellsize = Some(parse_header(key, value)?),
                "nodata_value" => nodata = Some(parse_header(key, value)?),
                other => {
                    return Err(ReadError::Header(format!("Unknown header key '{}'", other)));
                }
            }

            body_start = index + 1;
        }

        let ncols = require(ncols, "ncols")?;
        let nrows = require(nrows, "nrows")?;
        let xllcorner = require(xllcorner, "xllcorner")?;
        let yllcorner = require(yllcorner, "yllcorner")?;
        let cellsize = require(cellsize, "cellsize")?;

        if cellsize <= 0.0 {
            return Err(ReadError::Header("cellsize must be positive".to_string()));
        }

        let values: Vec<f32> = content
            .lines()
            .skip(body_start)
            .flat_map(|line| line.split_whitespace())
            .map(|token| {
                token
                    .parse::<f32>()
                    .map_err(|e| ReadError::Body(format!("Bad cell value '{}': {}", token, e)))
            })
            .collect::<Result<_, _>>()?;

        if values.len() != ncols * nrows {
            return Err(ReadError::Body(format!(
                "Expected {} cell values ({} x {}), found {}",
                ncols * nrows,
                ncols,
                nrows,
                values.len()
            )));
        }

        Ok(Grid {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
            nodata: nodata.unwrap_or(DEFAULT_NODATA),
            values,
        })
    }
}

fn parse_header<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ReadError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ReadError::Header(format!("Bad value for '{}': {}", key, e)))
}

fn require<T>(value: Option<T>, key: &str) -> Result<T, ReadError> {
    value.ok_or_else(|| ReadError::Header(format!("Missing header key '{}'", key)))
}
