use std::{
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use png_to_4bpp::{
    palette_from_sprite,
    persist::{self, PaletteMethod, EXPORT_EXTS, IMAGE_EXTS},
    sprite, IndexMask,
};

#[derive(Parser, Debug)]
#[command(version, about = "Convert 128x448 PNG sprite sheets to SNES 4bpp .spr files and back")]
struct Args {
    /// Log debugging details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert PNG sprite sheets into .spr files
    Encode {
        /// PNG image, or a glob pattern matching several
        #[arg(long)]
        image: String,

        /// Palette file; omit to extract the palette from the image
        #[arg(long)]
        palette: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = PaletteMethod::Auto)]
        palette_method: PaletteMethod,

        /// Output .spr file (single image only)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Palette indices to fill with random noise, as hex digits (e.g. "1f")
        #[arg(long)]
        scramble: Option<IndexMask>,
    },
    /// Render a .spr file back into a PNG sprite sheet
    Decode {
        #[arg(long)]
        sprite: PathBuf,

        /// Palette file; omit to use the palette stored in the sprite
        #[arg(long)]
        palette: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = PaletteMethod::Auto)]
        palette_method: PaletteMethod,

        /// Mail (sub-palette) to render with
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        mail: u8,

        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Resolve a palette and write it out as JSON
    Palette {
        /// Palette file, PNG sheet or .spr file
        #[arg(long)]
        source: PathBuf,

        #[arg(long, value_enum, default_value_t = PaletteMethod::Auto)]
        palette_method: PaletteMethod,

        /// Output .json file; omit to print to stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn encode_image(
    image: &Path,
    palette: Option<&Path>,
    method: PaletteMethod,
    output: Option<&Path>,
    scramble: Option<IndexMask>,
) -> Result<()> {
    persist::check_extension(image, IMAGE_EXTS, "Images")?;
    let target = match output {
        Some(p) => p.to_owned(),
        None => {
            let tag = if scramble.is_some() { "scrambled" } else { "exported" };
            persist::default_output(image, tag, "spr")
        }
    };
    persist::check_extension(&target, EXPORT_EXTS, "Export location")?;

    let raster = persist::load_raster(image)?;
    let palette = persist::load_palette(method, palette, Some(&raster))?;
    let sprite = match scramble {
        Some(mask) => sprite::encode_scrambled(&raster, &palette, mask, &mut rand::thread_rng())?,
        None => sprite::encode(&raster, &palette)?,
    };
    persist::save_sprite(&target, &sprite)?;
    info!("Sprite file successfully written to {}", target.display());
    Ok(())
}

fn encode_images(
    pattern: &str,
    palette: Option<&Path>,
    method: PaletteMethod,
    output: Option<&Path>,
    scramble: Option<IndexMask>,
) -> Result<()> {
    let images = persist::expand_pattern(pattern)?;
    persist::check_batch_output(output, images.len())?;
    let mut failures = 0;
    for image in &images {
        if let Err(e) = encode_image(image, palette, method, output, scramble) {
            error!("{}: {:#}", image.display(), e);
            failures += 1;
        }
    }
    ensure!(
        failures == 0,
        "{} of {} images failed to convert",
        failures,
        images.len()
    );
    Ok(())
}

fn decode_sprite(
    sprite_path: &Path,
    palette: Option<&Path>,
    method: PaletteMethod,
    mail: u8,
    output: Option<&Path>,
) -> Result<()> {
    persist::check_extension(sprite_path, EXPORT_EXTS, "Sprites")?;
    let target = match output {
        Some(p) => p.to_owned(),
        None => persist::default_output(sprite_path, "decoded", "png"),
    };
    persist::check_extension(&target, IMAGE_EXTS, "Images")?;

    let sprite = persist::load_sprite(sprite_path)?;
    let palette = match palette {
        Some(p) => persist::load_palette(method, Some(p), None)?,
        None => palette_from_sprite(&sprite),
    };
    let raster = sprite::decode_mail(&sprite, &palette, mail as usize)?;
    persist::save_raster(&target, &raster)?;
    info!("Image successfully written to {}", target.display());
    Ok(())
}

fn dump_palette(source: &Path, method: PaletteMethod, output: Option<&Path>) -> Result<()> {
    let palette = persist::load_palette(method, Some(source), None)?;
    match output {
        Some(p) => persist::save_palette_json(p, &palette)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&persist::json_bytes(&palette)?)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Encode {
            image,
            palette,
            palette_method,
            output,
            scramble,
        } => encode_images(
            &image,
            palette.as_deref(),
            palette_method,
            output.as_deref(),
            scramble,
        ),
        Command::Decode {
            sprite,
            palette,
            palette_method,
            mail,
            output,
        } => decode_sprite(
            &sprite,
            palette.as_deref(),
            palette_method,
            mail,
            output.as_deref(),
        ),
        Command::Palette {
            source,
            palette_method,
            output,
        } => dump_palette(&source, palette_method, output.as_deref()),
    }
}

pub fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args.command) {
        error!("{:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
