//! Runs an NROM cartridge on the CPU core until it halts on `BRK`.
//!
//! Exit status: 0 on a clean halt, 1 if the ROM cannot be loaded, 2 on an illegal
//! opcode, 3 on any other CPU fault.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use elaris_core::{
    console::{Console, ConsoleConfig, ConsoleError},
    cpu::{BrkMode, CpuConfig, CpuError, StopReason, Tick, flags},
    memory::{IoPolicy, Memory},
    trace::trace_line,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// iNES / NES 2.0 ROM to run
    #[arg(long)]
    rom_path: PathBuf,

    /// Print a nestest-style line for every instruction
    #[arg(short, long)]
    trace: bool,

    /// Colour the trace
    #[arg(long, requires = "trace")]
    color: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Behaviour of the PPU/APU register range
    #[arg(long, value_enum, default_value_t = IoArg::Flat)]
    io: IoArg,

    /// What BRK does
    #[arg(long, value_enum, default_value_t = BrkArg::Halt)]
    brk: BrkArg,

    /// Stop after this many instructions
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_steps: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IoArg {
    Flat,
    Mirrored,
    Silent,
    Fault,
}

impl From<IoArg> for IoPolicy {
    fn from(arg: IoArg) -> Self {
        match arg {
            IoArg::Flat => IoPolicy::Flat,
            IoArg::Mirrored => IoPolicy::Mirrored,
            IoArg::Silent => IoPolicy::Silent,
            IoArg::Fault => IoPolicy::Fault,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BrkArg {
    Halt,
    Interrupt,
}

impl From<BrkArg> for BrkMode {
    fn from(arg: BrkArg) -> Self {
        match arg {
            BrkArg::Halt => BrkMode::Halt,
            BrkArg::Interrupt => BrkMode::Interrupt,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("failed to initialise logging: {e}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = ConsoleConfig {
        cpu: CpuConfig {
            brk: args.brk.into(),
            ..CpuConfig::default()
        },
        io: args.io.into(),
    };

    info!("Loading ROM: {}", args.rom_path.display());
    let mut console = Console::from_path(&args.rom_path, config)
        .with_context(|| format!("failed to load {}", args.rom_path.display()))?;

    if args.trace {
        println!("{}", console.cpu().trace());
    }

    let mut steps: u64 = 0;
    let mut stdout = io::stdout().lock();
    let reason = console
        .run_with_callback(|tick| on_tick(args, tick, &mut steps, &mut stdout))
        .context("emulation stopped")?;

    let cpu = console.cpu();
    match reason {
        StopReason::Halted => info!(
            "halted on BRK at ${:04X} after {} cycles, A:{:02X} X:{:02X} Y:{:02X} P:{}",
            cpu.pc,
            cpu.cycles,
            cpu.a,
            cpu.x,
            cpu.y,
            flags::describe(cpu.status)
        ),
        StopReason::Cancelled => info!(
            "stopped after {steps} instructions at ${:04X} ({} cycles)",
            cpu.pc, cpu.cycles
        ),
    }
    Ok(())
}

/// Counts the instruction just executed and traces the next one if the run goes on.
fn on_tick(args: &Args, tick: &Tick<'_, Memory>, steps: &mut u64, out: &mut impl Write) -> bool {
    *steps += 1;
    let keep_going = args.max_steps.is_none_or(|max| *steps < max);

    if args.trace && keep_going && !tick.outcome.halted {
        let line = trace_line(&*tick.bus, &tick.registers, tick.cycles, args.color);
        if let Err(e) = writeln!(out, "{line}") {
            error!("failed to write trace: {e}");
            return false;
        }
    }
    keep_going
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ConsoleError>() {
        Some(ConsoleError::Cartridge(_)) => 1,
        Some(ConsoleError::Cpu(CpuError::IllegalOpcode { .. })) => 2,
        Some(ConsoleError::Cpu(_)) => 3,
        None => match err.downcast_ref::<CpuError>() {
            Some(CpuError::IllegalOpcode { .. }) => 2,
            _ => 3,
        },
    }
}
