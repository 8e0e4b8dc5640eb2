// SNES colors are 5 bits per channel. Everything that compares colors works on
// channels rounded down to a multiple of 8 so that matching survives the trip
// through 5:5:5.
use crate::common::{ColorRGB, ColorValue};

pub fn round_channel(c: ColorValue) -> ColorValue {
    (c / 8) * 8
}

pub fn round_color(color: ColorRGB) -> ColorRGB {
    color.map(round_channel)
}

/// Packs to `0bbbbbgggggrrrrr`.
pub fn pack_555(color: ColorRGB) -> u16 {
    let [r, g, b] = color.map(|c| (c / 8) as u16);
    b << 10 | g << 5 | r
}

pub fn unpack_555(c: u16) -> ColorRGB {
    let r = c & 31;
    let g = (c >> 5) & 31;
    let b = (c >> 10) & 31;
    [(r << 3) as u8, (g << 3) as u8, (b << 3) as u8]
}

/// 5:5:5 color as stored in palette data (low byte first).
pub fn pack_555_bytes(color: ColorRGB) -> [u8; 2] {
    pack_555(color).to_le_bytes()
}

pub fn unpack_555_bytes(bytes: [u8; 2]) -> ColorRGB {
    unpack_555(u16::from_le_bytes(bytes))
}
