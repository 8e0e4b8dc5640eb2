// Module for resolving the 64-color sprite palette: four 16-color mails
// (green, blue, red, bunny), from text files, binary files or the sheet itself.
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    color::{round_color, unpack_555_bytes},
    common::{ColorIdx, ColorRGB, Raster, SHEET_HEIGHT, SHEET_WIDTH, TILE_SIZE},
    error::CodecError,
};

pub const MAIL_COUNT: usize = 4;
pub const MAIL_SIZE: usize = 16;
pub const PALETTE_SIZE: usize = MAIL_COUNT * MAIL_SIZE;

// Binary palettes hold 64 little-endian 5:5:5 colors after a 4-byte header.
const BINARY_HEADER_LEN: usize = 4;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaletteTable {
    mails: [[ColorRGB; MAIL_SIZE]; MAIL_COUNT],
}

/// Where a palette comes from. Each variant resolves to the same 64-color table.
#[derive(Clone, Copy, Debug)]
pub enum PaletteSource<'a> {
    /// GIMP (.gpl) or Graphics Gale (.pal): three decimal channels per line.
    Ascii(&'a str),
    /// Paint.NET (.txt): one `AARRGGBB` record per line.
    Hex(&'a str),
    /// YY-CHR style binary palette.
    Binary(&'a [u8]),
    /// The last 8x8 block of the sprite sheet.
    Extracted(&'a Raster),
}

pub fn resolve_palette(source: PaletteSource) -> Result<PaletteTable, CodecError> {
    let palette = match source {
        PaletteSource::Ascii(text) => PaletteTable::from_sourced(&parse_ascii(text))?,
        PaletteSource::Hex(text) => PaletteTable::from_sourced(&parse_hex(text)?)?,
        PaletteSource::Binary(bytes) => PaletteTable::from_sourced(&parse_binary(bytes)?)?,
        PaletteSource::Extracted(raster) => PaletteTable::from_samples(extract_samples(raster)),
    };
    debug!("Resolved palette from {}", source.describe());
    Ok(palette)
}

impl PaletteSource<'_> {
    fn describe(&self) -> &'static str {
        match self {
            PaletteSource::Ascii(_) => "text palette",
            PaletteSource::Hex(_) => "hex palette",
            PaletteSource::Binary(_) => "binary palette",
            PaletteSource::Extracted(_) => "image",
        }
    }
}

impl PaletteTable {
    /// Builds a table from colors read out of a palette file.
    ///
    /// At least one full mail is required. The count is truncated to a multiple
    /// of 16 and any missing mail is copied from mail 0.
    pub fn from_sourced(colors: &[ColorRGB]) -> Result<Self, CodecError> {
        if colors.len() < MAIL_SIZE {
            return Err(CodecError::ShortPalette {
                found: colors.len(),
            });
        }
        let usable = (colors.len() / MAIL_SIZE * MAIL_SIZE).min(PALETTE_SIZE);
        if usable != colors.len() {
            warn!(
                "Palette has {} colors; using the first {}",
                colors.len(),
                usable
            );
        }
        if usable < PALETTE_SIZE {
            debug!(
                "Copying mail 0 into mails {}-{}",
                usable / MAIL_SIZE,
                MAIL_COUNT - 1
            );
        }
        let mut mails = [[[0; 3]; MAIL_SIZE]; MAIL_COUNT];
        for i in 0..PALETTE_SIZE {
            let src = if i < usable { i } else { i % MAIL_SIZE };
            mails[i / MAIL_SIZE][i % MAIL_SIZE] = round_color(colors[src]);
        }
        Ok(PaletteTable { mails })
    }

    /// Builds a table from 64 sampled colors. Samples in mails 1-3 that equal
    /// color 0 count as unfilled and take the mail 0 color at the same index.
    pub fn from_samples(samples: [ColorRGB; PALETTE_SIZE]) -> Self {
        let mut colors = samples;
        for i in MAIL_SIZE..PALETTE_SIZE {
            if colors[i] == colors[0] {
                colors[i] = colors[i % MAIL_SIZE];
            }
        }
        let mut mails = [[[0; 3]; MAIL_SIZE]; MAIL_COUNT];
        for (i, c) in colors.into_iter().enumerate() {
            mails[i / MAIL_SIZE][i % MAIL_SIZE] = round_color(c);
        }
        PaletteTable { mails }
    }

    /// Re-quantizes a table that was deserialized from outside the codec.
    pub fn from_mails(mails: [[ColorRGB; MAIL_SIZE]; MAIL_COUNT]) -> Self {
        PaletteTable {
            mails: mails.map(|mail| mail.map(round_color)),
        }
    }

    pub fn mails(&self) -> &[[ColorRGB; MAIL_SIZE]; MAIL_COUNT] {
        &self.mails
    }

    pub fn mail(&self, mail: usize) -> &[ColorRGB; MAIL_SIZE] {
        &self.mails[mail]
    }

    pub fn color(&self, mail: usize, idx: ColorIdx) -> ColorRGB {
        self.mails[mail][idx as usize]
    }

    /// All 64 colors, mail by mail.
    pub fn colors(&self) -> impl Iterator<Item = ColorRGB> + '_ {
        self.mails.iter().flatten().copied()
    }
}

fn malformed(line_no: usize, reason: &str) -> CodecError {
    CodecError::MalformedSource(format!("line {}: {}", line_no + 1, reason))
}

// Any line with three digit runs is a color, comment lines included. Lines
// whose first three runs don't fit in a byte (dates, sizes) are skipped.
fn parse_ascii(text: &str) -> Vec<ColorRGB> {
    let mut colors = vec![];
    for (line_no, line) in text.lines().enumerate() {
        let numbers = line
            .split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .take(3)
            .collect_vec();
        if numbers.len() < 3 {
            continue;
        }
        let channels: Result<Vec<u8>, _> = numbers.iter().map(|s| s.parse()).collect();
        let Ok(channels) = channels else {
            warn!(
                "Skipping palette line {}: values {} don't fit in 0-255",
                line_no + 1,
                numbers.join(", ")
            );
            continue;
        };
        colors.push([channels[0], channels[1], channels[2]]);
        if colors.len() == PALETTE_SIZE {
            break;
        }
    }
    colors
}

fn parse_hex(text: &str) -> Result<Vec<ColorRGB>, CodecError> {
    let mut colors = vec![];
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.len() != 8 || !line.bytes().all(|b| b.is_ascii_hexdigit()) {
            continue;
        }
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&line[i * 2..i * 2 + 2], 16)
                .map_err(|e| malformed(line_no, &e.to_string()))?;
        }
        colors.push([bytes[1], bytes[2], bytes[3]]);
        if colors.len() == PALETTE_SIZE {
            break;
        }
    }
    Ok(colors)
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<ColorRGB>, CodecError> {
    let needed = BINARY_HEADER_LEN + PALETTE_SIZE * 2;
    if bytes.len() < needed {
        return Err(CodecError::MalformedSource(format!(
            "binary palette must be at least {} bytes (found {})",
            needed,
            bytes.len()
        )));
    }
    Ok(bytes[BINARY_HEADER_LEN..needed]
        .chunks_exact(2)
        .map(|c| unpack_555_bytes([c[0], c[1]]))
        .collect())
}

// Each row of the sheet's last 8x8 block holds half a mail: row 0 is mail 0
// colors 0-7, row 1 is mail 0 colors 8-15, and so on.
fn extract_samples(raster: &Raster) -> [ColorRGB; PALETTE_SIZE] {
    let x0 = SHEET_WIDTH - TILE_SIZE;
    let y0 = SHEET_HEIGHT - TILE_SIZE;
    let mut samples = [[0; 3]; PALETTE_SIZE];
    for y in 0..TILE_SIZE {
        for x in 0..TILE_SIZE {
            samples[y * TILE_SIZE + x] = round_color(raster.color_at(x0 + x, y0 + y));
        }
    }
    samples
}
