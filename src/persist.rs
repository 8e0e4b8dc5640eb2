// Loading and saving of images, palettes and sprite files.
use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use json_pretty_compact::PrettyCompactFormatter;
use log::info;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Serializer;

use crate::{
    common::{Raster, SHEET_HEIGHT, SHEET_WIDTH},
    palette::{resolve_palette, PaletteSource, PaletteTable},
    sprite::{palette_from_sprite, Sprite},
};

pub const IMAGE_EXTS: &[&str] = &["png"];
pub const PALETTE_EXTS: &[&str] = &["gpl", "pal", "txt", "json"];
pub const EXPORT_EXTS: &[&str] = &["spr"];

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PaletteMethod {
    /// Pick from the palette file's extension, or extract from the image
    Auto,
    /// GIMP (.gpl) or Graphics Gale (.pal) text palette
    Text,
    /// Paint.NET (.txt) hex palette
    Hex,
    /// YY-CHR binary palette
    Binary,
    /// Palette previously saved as JSON
    Json,
    /// Palette stored in an existing .spr file
    Sprite,
    /// Last 8x8 block of the sprite sheet
    Extract,
}

pub fn has_extension(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

pub fn check_extension(path: &Path, exts: &[&str], what: &str) -> Result<()> {
    if !has_extension(path, exts) {
        bail!(
            "{} must be of the following extensions: {} ({})",
            what,
            exts.join(", "),
            path.display()
        );
    }
    Ok(())
}

/// `<dir>/<stem> (<tag>).<ext>` next to `input`.
pub fn default_output(input: &Path, tag: &str, ext: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sprite".to_string());
    input.with_file_name(format!("{} ({}).{}", stem, tag, ext))
}

/// Expands a glob pattern. A pattern with no matches is returned as-is so that
/// the caller reports the missing file.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for entry in glob::glob(pattern)? {
        paths.push(entry?);
    }
    if paths.is_empty() {
        paths.push(PathBuf::from(pattern));
    }
    Ok(paths)
}

/// An explicit output path only makes sense for a single input.
pub fn check_batch_output(output: Option<&Path>, matched: usize) -> Result<()> {
    ensure!(
        output.is_none() || matched == 1,
        "--output can only be used with a single image ({} matched)",
        matched
    );
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    info!("Saving {}", path.display());
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, data).with_context(|| format!("Error writing {}", path.display()))?;
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    info!("Loading {}", path.display());
    fs::read(path).with_context(|| format!("File not found: {}", path.display()))
}

pub fn json_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)?;
    Ok(data_bytes)
}

fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    write_file(path, &json_bytes(data)?)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data_bytes = read_file(path)?;
    let data: T = serde_json::from_slice(&data_bytes)
        .with_context(|| format!("Error reading {}", path.display()))?;
    Ok(data)
}

pub fn save_palette_json(path: &Path, palette: &PaletteTable) -> Result<()> {
    save_json(path, palette)
}

pub fn load_raster(path: &Path) -> Result<Raster> {
    let bytes = read_file(path)?;
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().context("Error reading image")?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).context("Error reading image")?;
    let data = &buf[..frame.buffer_size()];
    let rgba: Vec<u8> = match frame.color_type {
        png::ColorType::Rgba => data.to_vec(),
        png::ColorType::Rgb => data
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => data
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        png::ColorType::Indexed => bail!("Unexpected indexed output from PNG decoder"),
    };
    let raster = Raster::from_rgba(frame.width as usize, frame.height as usize, &rgba)
        .with_context(|| format!("Error reading {}", path.display()))?;
    Ok(raster)
}

pub fn save_raster(path: &Path, raster: &Raster) -> Result<()> {
    let mut png_bytes = vec![];
    {
        let mut encoder =
            png::Encoder::new(&mut png_bytes, SHEET_WIDTH as u32, SHEET_HEIGHT as u32);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&raster.to_rgba())?;
        writer.finish()?;
    }
    write_file(path, &png_bytes)
}

pub fn load_sprite(path: &Path) -> Result<Sprite> {
    let sprite = Sprite::from_bytes(read_file(path)?)
        .with_context(|| format!("Error reading {}", path.display()))?;
    Ok(sprite)
}

pub fn save_sprite(path: &Path, sprite: &Sprite) -> Result<()> {
    write_file(path, sprite.as_bytes())
}

fn detect_method(path: Option<&Path>) -> Result<PaletteMethod> {
    let Some(path) = path else {
        return Ok(PaletteMethod::Extract);
    };
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let method = match ext.as_str() {
        "txt" => PaletteMethod::Hex,
        "gpl" | "pal" => PaletteMethod::Text,
        "json" => PaletteMethod::Json,
        "spr" => PaletteMethod::Sprite,
        "png" => PaletteMethod::Extract,
        _ => bail!(
            "Palettes must be of the following extensions: {}",
            PALETTE_EXTS.join(", ")
        ),
    };
    Ok(method)
}

fn require_path(path: Option<&Path>) -> Result<&Path> {
    path.context("No palette source was specified despite using a palette method that requires it")
}

fn require_palette_file(path: Option<&Path>) -> Result<&Path> {
    let path = require_path(path)?;
    check_extension(path, PALETTE_EXTS, "Palettes")?;
    Ok(path)
}

fn read_text(path: &Path) -> Result<String> {
    Ok(String::from_utf8_lossy(&read_file(path)?).into_owned())
}

/// Resolves a palette. `image` is the sheet being converted, used when the
/// palette is extracted and no separate image is given as `path`.
pub fn load_palette(
    method: PaletteMethod,
    path: Option<&Path>,
    image: Option<&Raster>,
) -> Result<PaletteTable> {
    let palette = match method {
        PaletteMethod::Auto => return load_palette(detect_method(path)?, path, image),
        PaletteMethod::Extract => match (path, image) {
            (Some(path), _) if has_extension(path, IMAGE_EXTS) => {
                resolve_palette(PaletteSource::Extracted(&load_raster(path)?))?
            }
            (_, Some(raster)) => resolve_palette(PaletteSource::Extracted(raster))?,
            _ => bail!("Extracting a palette requires a PNG image"),
        },
        PaletteMethod::Text => {
            resolve_palette(PaletteSource::Ascii(&read_text(require_palette_file(path)?)?))?
        }
        PaletteMethod::Hex => {
            resolve_palette(PaletteSource::Hex(&read_text(require_palette_file(path)?)?))?
        }
        PaletteMethod::Binary => {
            resolve_palette(PaletteSource::Binary(&read_file(require_path(path)?)?))?
        }
        PaletteMethod::Json => {
            let palette: PaletteTable = load_json(require_palette_file(path)?)?;
            PaletteTable::from_mails(*palette.mails())
        }
        PaletteMethod::Sprite => palette_from_sprite(&load_sprite(require_path(path)?)?),
    };
    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::{decode, encode};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("png_to_4bpp_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn gpl_text() -> String {
        let mut text = "GIMP Palette\nName: Test\n#\n".to_string();
        for i in 0..16 {
            text += &format!("{} {} {}\tUntitled\n", i * 16, 0, 255 - i * 16);
        }
        text
    }

    #[test]
    fn extension_checks() {
        assert!(has_extension(Path::new("a/b/Link.PNG"), IMAGE_EXTS));
        assert!(!has_extension(Path::new("link.spr.bak"), EXPORT_EXTS));
        assert!(!has_extension(Path::new("noext"), EXPORT_EXTS));
        assert!(check_extension(Path::new("x.gpl"), PALETTE_EXTS, "Palettes").is_ok());
        let err = check_extension(Path::new("x.bmp"), IMAGE_EXTS, "Images").unwrap_err();
        assert!(err.to_string().contains("png"));
    }

    #[test]
    fn default_output_names() {
        assert_eq!(
            default_output(Path::new("sheets/link.png"), "exported", "spr"),
            PathBuf::from("sheets/link (exported).spr")
        );
        assert_eq!(
            default_output(Path::new("link.spr"), "decoded", "png"),
            PathBuf::from("link (decoded).png")
        );
    }

    #[test]
    fn method_detection() {
        assert_eq!(detect_method(None).unwrap(), PaletteMethod::Extract);
        assert_eq!(
            detect_method(Some(Path::new("p.TXT"))).unwrap(),
            PaletteMethod::Hex
        );
        assert_eq!(
            detect_method(Some(Path::new("p.gpl"))).unwrap(),
            PaletteMethod::Text
        );
        assert!(detect_method(Some(Path::new("p.act"))).is_err());
    }

    #[test]
    fn files_round_trip() {
        let dir = temp_dir("files");
        let pal_path = dir.join("link.gpl");
        fs::write(&pal_path, gpl_text()).unwrap();
        let palette = load_palette(PaletteMethod::Auto, Some(&pal_path), None).unwrap();
        assert_eq!(palette.color(0, 3), [48, 0, 200]);

        let mut raster = Raster::filled(palette.color(0, 0));
        raster.set_pixel(5, 5, 255, palette.color(0, 9));
        let image_path = dir.join("link.png");
        save_raster(&image_path, &raster).unwrap();
        let loaded = load_raster(&image_path).unwrap();
        assert_eq!(loaded, raster);

        let sprite = encode(&loaded, &palette).unwrap();
        let sprite_path = default_output(&image_path, "exported", "spr");
        save_sprite(&sprite_path, &sprite).unwrap();
        let back = load_sprite(&sprite_path).unwrap();
        assert_eq!(back, sprite);
        assert_eq!(decode(&back, &palette).color_at(5, 5), palette.color(0, 9));

        let from_sprite = load_palette(PaletteMethod::Auto, Some(&sprite_path), None).unwrap();
        assert_eq!(from_sprite.mail(0), palette.mail(0));

        let json_path = dir.join("link.json");
        save_palette_json(&json_path, &palette).unwrap();
        let from_json = load_palette(PaletteMethod::Auto, Some(&json_path), None).unwrap();
        assert_eq!(from_json, palette);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn wrong_size_files_are_rejected() {
        let dir = temp_dir("sizes");
        let sprite_path = dir.join("short.spr");
        fs::write(&sprite_path, [0u8; 16]).unwrap();
        assert!(load_sprite(&sprite_path).is_err());

        let image_path = dir.join("small.png");
        let mut png_bytes = vec![];
        {
            let mut encoder = png::Encoder::new(&mut png_bytes, 16, 16);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0; 16 * 16 * 3]).unwrap();
        }
        fs::write(&image_path, png_bytes).unwrap();
        let err = load_raster(&image_path).unwrap_err();
        let codec_err = err.downcast_ref::<crate::error::CodecError>().unwrap();
        assert!(matches!(
            codec_err,
            crate::error::CodecError::BadDimensions {
                width: 16,
                height: 16
            }
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn glob_patterns_expand_to_matching_images() {
        let dir = temp_dir("glob");
        for name in ["link.png", "zelda.png", "notes.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let pattern = dir.join("*.png");
        let paths = expand_pattern(&pattern.to_string_lossy()).unwrap();
        assert_eq!(paths, vec![dir.join("link.png"), dir.join("zelda.png")]);

        let missing = dir.join("link [v2].png");
        let paths = expand_pattern(&missing.to_string_lossy()).unwrap();
        assert_eq!(paths, vec![missing]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn output_path_needs_a_single_image() {
        let out = Path::new("out.spr");
        assert!(check_batch_output(None, 3).is_ok());
        assert!(check_batch_output(Some(out), 1).is_ok());
        let err = check_batch_output(Some(out), 2).unwrap_err();
        assert!(err.to_string().contains("2 matched"));
    }

    #[test]
    fn explicit_methods_check_palette_extensions() {
        let dir = temp_dir("exts");
        let bmp = dir.join("x.bmp");
        fs::write(&bmp, gpl_text()).unwrap();
        for method in [PaletteMethod::Text, PaletteMethod::Hex, PaletteMethod::Json] {
            let err = load_palette(method, Some(&bmp), None).unwrap_err();
            assert!(err.to_string().contains("Palettes must be"), "{:?}", method);
        }
        let gpl = dir.join("x.gpl");
        fs::write(&gpl, gpl_text()).unwrap();
        assert!(load_palette(PaletteMethod::Text, Some(&gpl), None).is_ok());

        // Binary palettes have no fixed extension
        let bin = dir.join("x.bin");
        fs::write(&bin, vec![0u8; 4 + 128]).unwrap();
        assert!(load_palette(PaletteMethod::Binary, Some(&bin), None).is_ok());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_palette_path_is_an_error() {
        let err = load_palette(PaletteMethod::Text, None, None).unwrap_err();
        assert!(err.to_string().contains("No palette source"));
        assert!(load_palette(PaletteMethod::Extract, None, None).is_err());
    }
}
