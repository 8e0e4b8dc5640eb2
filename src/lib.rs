//! Conversion between 128x448 PNG sprite sheets and ALttP-style SNES 4bpp
//! sprite files (`.spr`).
//!
//! Encoding resolves a 64-color palette, maps each pixel to a palette index,
//! cuts the sheet into 896 8x8 tiles, packs each tile into bit planes and
//! appends the 5:5:5 palette. Decoding runs the same steps backwards.

pub mod color;
pub mod common;
pub mod error;
pub mod palette;
pub mod persist;
pub mod planar;
pub mod sprite;
pub mod tiles;

pub use common::{ColorRGB, Raster, Tile};
pub use error::CodecError;
pub use palette::{resolve_palette, PaletteSource, PaletteTable};
pub use sprite::{
    decode, decode_mail, encode, encode_scrambled, palette_from_sprite, IndexMask, Sprite,
};
