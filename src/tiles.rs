// Conversion between the flat 128x448 sheet and its 896 8x8 tiles.
//
// The sheet is 16 tiles wide. Pixels are visited in raster order, so each
// scanline fills one row of 16 side-by-side tiles before the next scanline
// moves back to the first of them.
use hashbrown::{hash_map::Entry, HashMap};

use crate::{
    color::round_color,
    common::{
        ColorIdx, ColorRGB, Raster, Tile, PIXEL_COUNT, SHEET_TILES_WIDE, SHEET_WIDTH, TILE_COUNT,
        TILE_SIZE,
    },
    error::CodecError,
    palette::{PaletteTable, MAIL_SIZE},
};

/// Position of one pixel within the tile sheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SheetPos {
    pub tile: usize,
    pub row: usize,
    pub col: usize,
}

/// Walks the sheet in raster order, yielding where each pixel lands.
#[derive(Default)]
pub struct SheetScan {
    remaining: usize,
    col: usize,
    tile_col: usize,
    row: usize,
    tile: usize,
}

impl SheetScan {
    pub fn new() -> Self {
        SheetScan {
            remaining: PIXEL_COUNT,
            ..Default::default()
        }
    }
}

impl Iterator for SheetScan {
    type Item = SheetPos;

    fn next(&mut self) -> Option<SheetPos> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let pos = SheetPos {
            tile: self.tile,
            row: self.row,
            col: self.col,
        };
        self.col += 1;
        if self.col == TILE_SIZE {
            // Next tile along the scanline
            self.col = 0;
            self.tile += 1;
            self.tile_col += 1;
            if self.tile_col == SHEET_TILES_WIDE {
                // Back to the first tile of the strip, one row down
                self.tile_col = 0;
                self.tile -= SHEET_TILES_WIDE;
                self.row += 1;
                if self.row == TILE_SIZE {
                    // Strip finished; move on to the next one
                    self.row = 0;
                    self.tile += SHEET_TILES_WIDE;
                }
            }
        }
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SheetScan {}

// First exact match wins. Matches in mails 1-3 are folded into mail 0 indices.
fn color_lookup(palette: &PaletteTable) -> HashMap<ColorRGB, ColorIdx> {
    let mut lookup = HashMap::new();
    for (i, color) in palette.colors().enumerate() {
        if let Entry::Vacant(e) = lookup.entry(color) {
            e.insert((i % MAIL_SIZE) as ColorIdx);
        }
    }
    lookup
}

/// Maps every pixel of the (rounded) raster to its palette index.
pub fn index_raster(raster: &Raster, palette: &PaletteTable) -> Result<Vec<ColorIdx>, CodecError> {
    let lookup = color_lookup(palette);
    raster
        .colors()
        .enumerate()
        .map(|(i, color)| {
            let color = round_color(color);
            lookup
                .get(&color)
                .copied()
                .ok_or(CodecError::UnmatchedPixel {
                    x: i % SHEET_WIDTH,
                    y: i / SHEET_WIDTH,
                    color,
                })
        })
        .collect()
}

/// Splits a full sheet of indices (raster order) into tiles.
pub fn split_tiles(indices: &[ColorIdx]) -> Vec<Tile> {
    assert_eq!(indices.len(), PIXEL_COUNT);
    let mut tiles = vec![[[0; TILE_SIZE]; TILE_SIZE]; TILE_COUNT];
    for (pos, &idx) in SheetScan::new().zip(indices) {
        tiles[pos.tile][pos.row][pos.col] = idx;
    }
    tiles
}

/// Inverse of `split_tiles`.
pub fn join_tiles(tiles: &[Tile]) -> Vec<ColorIdx> {
    assert_eq!(tiles.len(), TILE_COUNT);
    SheetScan::new()
        .map(|pos| tiles[pos.tile][pos.row][pos.col])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::SHEET_HEIGHT,
        palette::{resolve_palette, PaletteSource},
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn scan_matches_tile_grid() {
        let positions: Vec<SheetPos> = SheetScan::new().collect();
        assert_eq!(positions.len(), PIXEL_COUNT);
        for y in 0..SHEET_HEIGHT {
            for x in 0..SHEET_WIDTH {
                let pos = positions[y * SHEET_WIDTH + x];
                assert_eq!(pos.tile, (y / 8) * SHEET_TILES_WIDE + x / 8);
                assert_eq!((pos.row, pos.col), (y % 8, x % 8));
            }
        }
    }

    #[test]
    fn first_scanline_touches_sixteen_tiles() {
        let tiles: Vec<usize> = SheetScan::new().take(SHEET_WIDTH).map(|p| p.tile).collect();
        assert_eq!(tiles[0], 0);
        assert_eq!(tiles[7], 0);
        assert_eq!(tiles[8], 1);
        assert_eq!(tiles[127], 15);
        let next = SheetScan::new().nth(SHEET_WIDTH).unwrap();
        assert_eq!(next, SheetPos { tile: 0, row: 1, col: 0 });
        let strip = SheetScan::new().nth(SHEET_WIDTH * 8).unwrap();
        assert_eq!(strip, SheetPos { tile: 16, row: 0, col: 0 });
    }

    #[test]
    fn split_then_join_is_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let indices: Vec<ColorIdx> = (0..PIXEL_COUNT).map(|_| rng.gen_range(0..16)).collect();
        let tiles = split_tiles(&indices);
        assert_eq!(tiles.len(), TILE_COUNT);
        assert_eq!(tiles[17][3][5], indices[(8 + 3) * SHEET_WIDTH + 8 + 5]);
        assert_eq!(join_tiles(&tiles), indices);
    }

    fn test_palette() -> PaletteTable {
        let text: String = (0..16).map(|i| format!("{} 0 0\n", i * 16)).collect();
        resolve_palette(PaletteSource::Ascii(&text)).unwrap()
    }

    #[test]
    fn index_uses_rounded_colors() {
        let mut raster = Raster::filled([0, 0, 0]);
        raster.set_pixel(9, 1, 255, [16 * 5 + 7, 3, 6]);
        let indices = index_raster(&raster, &test_palette()).unwrap();
        assert_eq!(indices[SHEET_WIDTH + 9], 5);
        assert_eq!(indices.iter().filter(|&&i| i != 0).count(), 1);
    }

    #[test]
    fn unmatched_pixel_is_reported() {
        let mut raster = Raster::filled([0, 0, 0]);
        raster.set_pixel(4, 300, 255, [0, 255, 0]);
        let err = index_raster(&raster, &test_palette()).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnmatchedPixel {
                x: 4,
                y: 300,
                color: [0, 248, 0]
            }
        );
    }

    #[test]
    fn later_mail_matches_fold_to_local_index() {
        let mut samples = [[0; 3]; 64];
        for i in 0..16 {
            samples[i] = [i as u8 * 8, 0, 0];
        }
        for i in 16..64 {
            samples[i] = [0, 8, i as u8];
        }
        let palette = PaletteTable::from_samples(samples);
        let lookup = color_lookup(&palette);
        // [0, 8, 32] first appears at index 32 (mail 2, index 0)
        assert_eq!(lookup[&[0u8, 8, 32]], 0);
        assert_eq!(lookup[&[0u8, 8, 40]], 8);
        assert_eq!(lookup[&[16u8, 0, 0]], 2);
    }
}
