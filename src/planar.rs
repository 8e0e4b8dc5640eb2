// SNES 4bpp tile format: 32 bytes per 8x8 tile. Each byte is one bit plane of
// one pixel row, leftmost pixel in the high bit. Planes 0 and 1 of all eight
// rows come first (interleaved per row), followed by planes 2 and 3.
use crate::common::{Tile, TILE_BYTES, TILE_SIZE};

// (row, plane) stored at each byte of a tile
#[rustfmt::skip]
const PLANE_ORDER: [(usize, u8); TILE_BYTES] = [
    (0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1), (3, 0), (3, 1),
    (4, 0), (4, 1), (5, 0), (5, 1), (6, 0), (6, 1), (7, 0), (7, 1),
    (0, 2), (0, 3), (1, 2), (1, 3), (2, 2), (2, 3), (3, 2), (3, 3),
    (4, 2), (4, 3), (5, 2), (5, 3), (6, 2), (6, 3), (7, 2), (7, 3),
];

pub fn encode_tile(tile: &Tile) -> [u8; TILE_BYTES] {
    let mut out = [0; TILE_BYTES];
    for (byte, &(row, plane)) in out.iter_mut().zip(PLANE_ORDER.iter()) {
        for x in 0..TILE_SIZE {
            let bit = (tile[row][x] >> plane) & 1;
            *byte |= bit << (7 - x);
        }
    }
    out
}

pub fn decode_tile(data: &[u8; TILE_BYTES]) -> Tile {
    let mut tile: Tile = [[0; TILE_SIZE]; TILE_SIZE];
    for (&byte, &(row, plane)) in data.iter().zip(PLANE_ORDER.iter()) {
        for x in 0..TILE_SIZE {
            let bit = (byte >> (7 - x)) & 1;
            tile[row][x] |= bit << plane;
        }
    }
    tile
}
