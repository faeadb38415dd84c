pub mod color_scale;
pub mod composite;
pub mod glyphs;
pub mod heatmap;

pub use color_scale::{ColorScale, Rgb};
pub use composite::CompositeFigure;
pub use heatmap::{HeatmapPlot, PlotLabels};

use image::RgbaImage;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Output dimensions for one figure. `scale` is an integer supersampling
/// factor: everything (tiles, text, margins) is drawn `scale` times larger,
/// the resolution knob for print-quality output.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FigureSize {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_scale() -> u32 {
    1
}

#[derive(Debug)]
pub enum RenderError {
    Io(std::io::Error),
    Encode(image::ImageError),
    TooFewPanels(usize),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Io(e) => write!(f, "Failed to write figure: {}", e),
            RenderError::Encode(e) => write!(f, "Failed to encode figure: {}", e),
            RenderError::TooFewPanels(n) => {
                write!(f, "A composite figure needs at least two panels, got {}", n)
            }
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> RenderError {
        RenderError::Io(err)
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> RenderError {
        RenderError::Encode(err)
    }
}

/// Encode to PNG in memory, then write in one call so a failed render
/// leaves no partial file.
pub(crate) fn write_png<P: AsRef<Path>>(img: &RgbaImage, path: P) -> Result<(), RenderError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    fs::write(path, buffer.into_inner())?;

    Ok(())
}
