//! Headless runner (SPEC_FULL.md §10.4): loads ROM images and an optional
//! RKS program, drives a [`Computer`] for a bounded or free-running number
//! of steps, and can dump the final display as a PGM raster.

mod config;

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use fakhivets_core::prelude::*;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "fakhivets", about = "Фахівець-85 emulation core runner")]
struct Args {
    /// Optional TOML config file supplying defaults for the other flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// 2 KiB bootloader ROM image.
    #[arg(long)]
    rom: Option<PathBuf>,

    /// 12 KiB monitor ROM image.
    #[arg(long = "rom-extra")]
    rom_extra: Option<PathBuf>,

    /// RKS tape image to load into memory before running.
    #[arg(long)]
    program: Option<PathBuf>,

    /// Run a bounded number of CPU steps instead of free-running forever.
    #[arg(long)]
    steps: Option<u64>,

    /// Write the final display as a PGM raster to this path.
    #[arg(long = "dump-frame")]
    dump_frame: Option<PathBuf>,

    /// Log verbosity (error, warn, info, debug, trace).
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();
    let file_config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("fatal: {e}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let log_level = args.log_level.or(file_config.log_level).unwrap_or_else(|| "info".to_string());
    env_logger::Builder::new().parse_filters(&log_level).init();

    let rom_path = args.rom.or(file_config.rom);
    let rom_extra_path = args.rom_extra.or(file_config.rom_extra);
    let program_path = args.program.or(file_config.program);
    let steps = args.steps.or(file_config.steps);
    let dump_frame_path = args.dump_frame.or(file_config.dump_frame);

    let rom = match rom_path {
        Some(path) => match std::fs::read(&path) {
            Ok(data) => {
                log::info!("loaded bootloader ROM from {} ({} bytes)", path.display(), data.len());
                data
            }
            Err(e) => {
                log::error!("failed to read ROM {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => {
            log::error!("--rom is required");
            std::process::exit(1);
        }
    };

    let rom_extra = match rom_extra_path {
        Some(path) => match std::fs::read(&path) {
            Ok(data) => {
                log::info!("loaded monitor ROM from {} ({} bytes)", path.display(), data.len());
                data
            }
            Err(e) => {
                log::error!("failed to read ROM extra {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => {
            log::error!("--rom-extra is required");
            std::process::exit(1);
        }
    };

    let mut computer = Computer::new(&rom, &rom_extra);

    if let Some(path) = program_path {
        match std::fs::read(&path) {
            Ok(bytes) => match read_rks(&bytes[..]) {
                Ok(image) => {
                    log::info!(
                        "loaded RKS program {} ({:#06x}-{:#06x}, {} bytes)",
                        path.display(),
                        image.start_address,
                        image.end_address,
                        image.content.len()
                    );
                    computer.load_program(&image);
                }
                Err(e) => {
                    log::error!("failed to parse RKS program {}: {e}", path.display());
                    std::process::exit(1);
                }
            },
            Err(e) => {
                log::error!("failed to read program {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }

    let mut executed: u64 = 0;
    loop {
        if let Some(limit) = steps {
            if executed >= limit {
                break;
            }
        }

        match computer.step() {
            Ok(_) => {
                executed += 1;
                computer.sim_sleep();
            }
            Err(e) => {
                log::error!("fatal: {e} after {executed} steps");
                log::error!("register state at failure: {:?}", computer.cpu.snapshot());
                break;
            }
        }
    }

    log::info!("ran {executed} steps");

    if let Some(path) = dump_frame_path {
        if let Err(e) = dump_frame(&computer, &path) {
            log::error!("failed to write frame dump {}: {e}", path.display());
            std::process::exit(1);
        }
        log::info!("wrote frame dump to {}", path.display());
    }

    computer.shutdown();
}

/// Write the current display as a raw binary PGM (P5): the simplest
/// possible raster format, avoiding an image-decoding dependency (§10.4).
fn dump_frame(computer: &Computer, path: &std::path::Path) -> std::io::Result<()> {
    let image = computer.image();
    let mut file = std::fs::File::create(path)?;
    write!(file, "P5\n{} {}\n255\n", image.width, image.height)?;
    file.write_all(&image.pixels)?;
    Ok(())
}
