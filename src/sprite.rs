// ALttP sprite (.spr) assembly: 896 4bpp tiles followed by the mail palettes.
//
// Layout of the 0x7078-byte file:
//   0x0000-0x6FFF  tile data, 32 bytes per tile in sheet order
//   0x7000-0x7077  mails 0-3, 15 colors each (color 0 is transparent in-game)
//
// The palette block is written starting 2 bytes early, at 0x6FFE, so mail 0's
// color 0 overwrites the last two bytes of tile 895.
use std::{fmt, str::FromStr};

use log::debug;
use rand::Rng;

use crate::{
    color::{pack_555_bytes, unpack_555_bytes},
    common::{ColorIdx, Raster, Tile, PIXEL_DATA_LEN, SHEET_WIDTH, SPRITE_LEN, TILE_BYTES},
    error::CodecError,
    palette::{PaletteTable, MAIL_COUNT, MAIL_SIZE},
    planar::{decode_tile, encode_tile},
    tiles::{index_raster, join_tiles, split_tiles},
};

pub const PALETTE_OFFSET: usize = PIXEL_DATA_LEN - 2;
const PALETTE_BLOCK_LEN: usize = 0x80;
const MAIL_STRIDE: usize = 30;

#[derive(Clone, PartialEq, Eq)]
pub struct Sprite {
    data: Vec<u8>,
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sprite(0x{:X} bytes)", self.data.len())
    }
}

impl Sprite {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, CodecError> {
        if data.len() != SPRITE_LEN {
            return Err(CodecError::BadSpriteLength(data.len()));
        }
        Ok(Sprite { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Set of color indices (0-15) to replace with noise when encoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexMask(u16);

impl IndexMask {
    pub fn new() -> Self {
        IndexMask(0)
    }

    pub fn with(self, idx: ColorIdx) -> Result<Self, CodecError> {
        if idx as usize >= MAIL_SIZE {
            return Err(CodecError::BadColorIndex(idx));
        }
        Ok(IndexMask(self.0 | 1 << idx))
    }

    pub fn contains(&self, idx: ColorIdx) -> bool {
        (idx as usize) < MAIL_SIZE && self.0 & (1 << idx) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Parses a string of hex digits, one per index (e.g. "1f" is indices 1 and 15).
impl FromStr for IndexMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = IndexMask::new();
        for c in s.chars() {
            let idx = c
                .to_digit(16)
                .ok_or_else(|| format!("'{}' is not a hex digit", c))?;
            mask = mask.with(idx as ColorIdx).map_err(|e| e.to_string())?;
        }
        Ok(mask)
    }
}

impl fmt::Display for IndexMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in 0..MAIL_SIZE as ColorIdx {
            if self.contains(idx) {
                write!(f, "{:X}", idx)?;
            }
        }
        Ok(())
    }
}

/// Serializes the palette into the hardware layout. Color (mail, idx) goes to
/// byte `30 * mail + 2 * idx`; writes run index by index over all four mails,
/// so each mail's color 15 replaces the next mail's color 0.
pub fn serialize_palette(palette: &PaletteTable) -> [u8; PALETTE_BLOCK_LEN] {
    let mut block = [0; PALETTE_BLOCK_LEN];
    for idx in 0..MAIL_SIZE {
        for mail in 0..MAIL_COUNT {
            let pos = MAIL_STRIDE * mail + 2 * idx;
            block[pos..pos + 2].copy_from_slice(&pack_555_bytes(palette.mail(mail)[idx]));
        }
    }
    block
}

/// Reads the palette back out of a sprite. Color 0 of mails 1-3 is not stored
/// and is taken from mail 0.
pub fn palette_from_sprite(sprite: &Sprite) -> PaletteTable {
    let tail = &sprite.data[PALETTE_OFFSET..];
    let mut mails = [[[0; 3]; MAIL_SIZE]; MAIL_COUNT];
    for (mail, colors) in mails.iter_mut().enumerate() {
        for (idx, color) in colors.iter_mut().enumerate() {
            let pos = if mail > 0 && idx == 0 {
                0
            } else {
                MAIL_STRIDE * mail + 2 * idx
            };
            *color = unpack_555_bytes([tail[pos], tail[pos + 1]]);
        }
    }
    PaletteTable::from_mails(mails)
}

pub fn assemble(tiles: &[Tile], palette: &PaletteTable) -> Sprite {
    let mut data = vec![0; SPRITE_LEN];
    for (chunk, tile) in data[..PIXEL_DATA_LEN]
        .chunks_exact_mut(TILE_BYTES)
        .zip(tiles)
    {
        chunk.copy_from_slice(&encode_tile(tile));
    }
    let block = serialize_palette(palette);
    let n = SPRITE_LEN - PALETTE_OFFSET;
    data[PALETTE_OFFSET..].copy_from_slice(&block[..n]);
    Sprite { data }
}

pub fn disassemble(sprite: &Sprite) -> Vec<Tile> {
    sprite.data[..PIXEL_DATA_LEN]
        .chunks_exact(TILE_BYTES)
        .map(|chunk| decode_tile(chunk.try_into().unwrap()))
        .collect()
}

/// Replaces every masked index with a random one, independently per pixel.
pub fn scramble_tiles<R: Rng + ?Sized>(tiles: &mut [Tile], mask: IndexMask, rng: &mut R) {
    for px in tiles.iter_mut().flatten().flatten() {
        if mask.contains(*px) {
            *px = rng.gen_range(0..MAIL_SIZE as ColorIdx);
        }
    }
}

pub fn encode(raster: &Raster, palette: &PaletteTable) -> Result<Sprite, CodecError> {
    let indices = index_raster(raster, palette)?;
    Ok(assemble(&split_tiles(&indices), palette))
}

/// Like `encode`, but with the indices in `mask` replaced by noise.
pub fn encode_scrambled<R: Rng + ?Sized>(
    raster: &Raster,
    palette: &PaletteTable,
    mask: IndexMask,
    rng: &mut R,
) -> Result<Sprite, CodecError> {
    let indices = index_raster(raster, palette)?;
    let mut tiles = split_tiles(&indices);
    if !mask.is_empty() {
        debug!("Scrambling indices {}", mask);
        scramble_tiles(&mut tiles, mask, rng);
    }
    Ok(assemble(&tiles, palette))
}

pub fn decode(sprite: &Sprite, palette: &PaletteTable) -> Raster {
    rasterize(sprite, palette, 0)
}

/// Rasterizes the sprite with one of the four mails. Index 0 is transparent.
pub fn decode_mail(
    sprite: &Sprite,
    palette: &PaletteTable,
    mail: usize,
) -> Result<Raster, CodecError> {
    if mail >= MAIL_COUNT {
        return Err(CodecError::BadMail(mail));
    }
    Ok(rasterize(sprite, palette, mail))
}

fn rasterize(sprite: &Sprite, palette: &PaletteTable, mail: usize) -> Raster {
    let indices = join_tiles(&disassemble(sprite));
    let mut raster = Raster::filled([0, 0, 0]);
    for (i, idx) in indices.into_iter().enumerate() {
        let alpha = if idx == 0 { 0 } else { 255 };
        raster.set_pixel(
            i % SHEET_WIDTH,
            i / SHEET_WIDTH,
            alpha,
            palette.color(mail, idx),
        );
    }
    raster
}
