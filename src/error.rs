use std::fmt;

use crate::common::{ColorIdx, ColorRGB, RASTER_LEN, SHEET_HEIGHT, SHEET_WIDTH, SPRITE_LEN};

/// Reasons a single conversion can be rejected. None of them leave output behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    BadDimensions { width: usize, height: usize },
    BadRasterLength(usize),
    ShortPalette { found: usize },
    UnmatchedPixel { x: usize, y: usize, color: ColorRGB },
    MalformedSource(String),
    BadSpriteLength(usize),
    BadColorIndex(ColorIdx),
    BadMail(usize),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodecError::BadDimensions { width, height } => write!(
                f,
                "Image dimensions must be {}x{} (found {}x{})",
                SHEET_WIDTH, SHEET_HEIGHT, width, height
            ),
            CodecError::BadRasterLength(len) => write!(
                f,
                "Pixel data must be {} bytes (found {})",
                RASTER_LEN, len
            ),
            CodecError::ShortPalette { found } => {
                write!(f, "Unable to find 16 colors (only {} found)", found)
            }
            CodecError::UnmatchedPixel { x, y, color } => write!(
                f,
                "Pixel at ({}, {}) has color {:?} which is not in the palette",
                x, y, color
            ),
            CodecError::MalformedSource(msg) => write!(f, "Error reading palette: {}", msg),
            CodecError::BadSpriteLength(len) => write!(
                f,
                "Sprite data must be 0x{:X} bytes (found 0x{:X})",
                SPRITE_LEN, len
            ),
            CodecError::BadColorIndex(idx) => {
                write!(f, "Color index {} is out of range (0-15)", idx)
            }
            CodecError::BadMail(mail) => write!(f, "Mail {} is out of range (0-3)", mail),
        }
    }
}

impl std::error::Error for CodecError {}
