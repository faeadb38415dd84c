use super::types::{FileError, FileType};
use std::path::Path;

pub fn reader_from_filetype(path: &Path) -> Result<FileType, FileError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("asc") | Some("grd") => Ok(FileType::AsciiGrid),
        _ => Err(FileError::UnknownFileType),
    }
}
