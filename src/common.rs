use crate::error::CodecError;

pub type ColorValue = u8; // Color channel (0-255, multiples of 8 once rounded)
pub type ColorIdx = u8; // Index into a 16-color mail (0-15)
pub type ColorRGB = [ColorValue; 3];

// 8x8 grid of color indices, addressed as tile[row][column].
pub type Tile = [[ColorIdx; 8]; 8];

pub const SHEET_WIDTH: usize = 128;
pub const SHEET_HEIGHT: usize = 448;
pub const TILE_SIZE: usize = 8;
pub const SHEET_TILES_WIDE: usize = SHEET_WIDTH / TILE_SIZE; // 16
pub const TILE_COUNT: usize = SHEET_TILES_WIDE * (SHEET_HEIGHT / TILE_SIZE); // 896
pub const PIXEL_COUNT: usize = SHEET_WIDTH * SHEET_HEIGHT;
pub const BYTES_PER_PIXEL: usize = 4;
pub const RASTER_LEN: usize = PIXEL_COUNT * BYTES_PER_PIXEL;

pub const TILE_BYTES: usize = 32;
pub const PIXEL_DATA_LEN: usize = TILE_COUNT * TILE_BYTES; // 0x7000
pub const PALETTE_REGION_LEN: usize = 0x78;
pub const SPRITE_LEN: usize = PIXEL_DATA_LEN + PALETTE_REGION_LEN; // 0x7078

/// A full sprite sheet, 128x448 pixels stored as A,B,G,R bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    data: Vec<u8>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Raster({}x{})", SHEET_WIDTH, SHEET_HEIGHT)
    }
}

fn check_dimensions(width: usize, height: usize, len: usize) -> Result<(), CodecError> {
    if width != SHEET_WIDTH || height != SHEET_HEIGHT {
        return Err(CodecError::BadDimensions { width, height });
    }
    if len != RASTER_LEN {
        return Err(CodecError::BadRasterLength(len));
    }
    Ok(())
}

impl Raster {
    pub fn from_abgr(width: usize, height: usize, data: Vec<u8>) -> Result<Self, CodecError> {
        check_dimensions(width, height, data.len())?;
        Ok(Raster { data })
    }

    pub fn from_rgba(width: usize, height: usize, rgba: &[u8]) -> Result<Self, CodecError> {
        check_dimensions(width, height, rgba.len())?;
        let data = rgba
            .chunks_exact(BYTES_PER_PIXEL)
            .flat_map(|p| [p[3], p[2], p[1], p[0]])
            .collect();
        Ok(Raster { data })
    }

    /// Fully transparent sheet with every pixel set to `color`.
    pub fn filled(color: ColorRGB) -> Self {
        let [r, g, b] = color;
        Raster {
            data: [0, b, g, r].repeat(PIXEL_COUNT),
        }
    }

    pub fn as_abgr(&self) -> &[u8] {
        &self.data
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .flat_map(|p| [p[3], p[2], p[1], p[0]])
            .collect()
    }

    pub fn color_at(&self, x: usize, y: usize) -> ColorRGB {
        self.color(y * SHEET_WIDTH + x)
    }

    pub fn alpha_at(&self, x: usize, y: usize) -> ColorValue {
        self.data[(y * SHEET_WIDTH + x) * BYTES_PER_PIXEL]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, alpha: ColorValue, color: ColorRGB) {
        let i = (y * SHEET_WIDTH + x) * BYTES_PER_PIXEL;
        let [r, g, b] = color;
        self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&[alpha, b, g, r]);
    }

    /// Color of the pixel at raster position `i` (row-major).
    pub fn color(&self, i: usize) -> ColorRGB {
        let p = &self.data[i * BYTES_PER_PIXEL..(i + 1) * BYTES_PER_PIXEL];
        [p[3], p[2], p[1]]
    }

    /// Colors of all pixels in raster order.
    pub fn colors(&self) -> impl Iterator<Item = ColorRGB> + '_ {
        self.data
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|p| [p[3], p[2], p[1]])
    }
}
