//! 32×32 memory-mapped screen for small 6502 programs (snake and friends).
//!
//! - `$0200-$05FF`: one byte per pixel, low nibble picks a palette colour
//! - `$FE`: a fresh random byte before every instruction
//! - `$FF`: ASCII code of the last W/A/S/D key pressed
//!
//! Raw binaries are loaded at `$0600`; `.nes` files go through the cartridge loader.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use elaris_core::{
    console::{Console, ConsoleConfig},
    cpu::{CPU, StopReason},
    memory::Memory,
};

const WIDTH: usize = 32;
const HEIGHT: usize = 32;
const SCREEN_START: u16 = 0x0200;
const RANDOM_ADDR: u16 = 0x00FE;
const KEY_ADDR: u16 = 0x00FF;
const PROGRAM_START: u16 = 0x0600;

const PALETTE: [u32; 16] = [
    0x000000, 0xFFFFFF, 0x880000, 0xAAFFEE, 0xCC44CC, 0x00CC55, 0x0000AA, 0xEEEE77,
    0xDD8855, 0x664400, 0xFF7777, 0x333333, 0x777777, 0xAAFF66, 0x0088FF, 0xBBBBBB,
];

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Raw 6502 binary, or an iNES ROM if the extension is .nes
    program: PathBuf,

    /// Instructions executed per 60 Hz frame
    #[arg(short, long, default_value_t = 200)]
    steps_per_frame: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let mut cpu = load(&args.program)?;

    let mut window = Window::new(
        "Elaris screen",
        WIDTH,
        HEIGHT,
        WindowOptions {
            scale: Scale::X16,
            ..WindowOptions::default()
        },
    )
    .context("failed to create window")?;
    window.set_target_fps(60);

    let mut buffer = vec![0u32; WIDTH * HEIGHT];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(code) = window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .find_map(key_code)
        {
            cpu.bus.load(KEY_ADDR, &[code]);
        }

        let mut budget = args.steps_per_frame;
        cpu.bus.load(RANDOM_ADDR, &[rand::random::<u8>()]);
        let reason = cpu
            .run_with_callback(|tick| {
                tick.bus.load(RANDOM_ADDR, &[rand::random::<u8>()]);
                budget = budget.saturating_sub(1);
                budget > 0
            })
            .context("emulation stopped")?;

        for (pixel, &byte) in buffer
            .iter_mut()
            .zip(cpu.bus.slice(SCREEN_START, WIDTH * HEIGHT))
        {
            *pixel = PALETTE[(byte & 0x0F) as usize];
        }
        window
            .update_with_buffer(&buffer, WIDTH, HEIGHT)
            .context("failed to update window")?;

        if reason == StopReason::Halted {
            info!("halted on BRK at ${:04X}", cpu.pc);
            break;
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<CPU<Memory>> {
    let is_rom = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("nes"));

    if is_rom {
        let console = Console::from_path(path, ConsoleConfig::default())
            .with_context(|| format!("failed to load {}", path.display()))?;
        return Ok(console.into_cpu());
    }

    let program =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    info!(
        "loaded {} bytes at ${PROGRAM_START:04X} from {}",
        program.len(),
        path.display()
    );

    let mut memory = Memory::new();
    memory.load_prg(PROGRAM_START, &program);
    let mut cpu = CPU::new(memory);
    cpu.reset()?;
    Ok(cpu)
}

fn key_code(key: Key) -> Option<u8> {
    match key {
        Key::W => Some(b'w'),
        Key::A => Some(b'a'),
        Key::S => Some(b's'),
        Key::D => Some(b'd'),
        _ => None,
    }
}
