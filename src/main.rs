//! CHIP-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `chip8-emu run <rom>` - Run a program headless until it halts
//! - `chip8-emu debug <rom>` - Interactive debugger
//! - `chip8-emu disasm <rom>` - Disassemble a program image
//! - `chip8-emu inspect <rom>` - Run and dump the machine state as JSON

use chip8::{load_rom, Chip8, EmulatorConfig, RomImage};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "chip8-emu")]
#[command(version = "0.1.0")]
#[command(about = "A CHIP-8 interpreter with a terminal debugger")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: Level,
    /// Seed for the random number generator
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Write the draw collision result to VF
    #[arg(long, global = true)]
    collision_flag: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the ROM image
        rom: PathBuf,
        /// Maximum number of ticks to run
        #[arg(short, long, default_value = "100000")]
        max_ticks: u64,
        /// Print every executed instruction
        #[arg(short, long)]
        trace: bool,
    },
    /// Interactive terminal debugger
    Debug {
        /// Path to the ROM image
        rom: PathBuf,
    },
    /// Disassemble a ROM image
    Disasm {
        /// Path to the ROM image
        rom: PathBuf,
        /// Only list the first N instructions
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Run for a number of ticks and print the machine state as JSON
    Inspect {
        /// Path to the ROM image
        rom: PathBuf,
        /// Number of ticks to run before the snapshot
        #[arg(short, long, default_value = "0")]
        ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // The debugger captures its own log output.
    if !matches!(cli.command, Commands::Debug { .. }) {
        tracing_subscriber::fmt()
            .with_max_level(cli.log_level)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = load_config(&cli);

    match cli.command {
        Commands::Run { rom, max_ticks, trace } => run_program(open_rom(&rom), config, max_ticks, trace),
        Commands::Debug { rom } => debug_program(open_rom(&rom), config),
        Commands::Disasm { rom, count } => disassemble_file(open_rom(&rom), count),
        Commands::Inspect { rom, ticks } => inspect_program(open_rom(&rom), config, ticks),
    }
}

fn load_config(cli: &Cli) -> EmulatorConfig {
    let mut config = match &cli.config {
        Some(path) => match EmulatorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => EmulatorConfig::default(),
    };

    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }
    if cli.collision_flag {
        config.collision_flag = true;
    }
    config
}

fn open_rom(path: &Path) -> RomImage {
    match load_rom(path) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn new_machine(rom: RomImage, config: EmulatorConfig) -> Chip8 {
    match Chip8::new(rom, config) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("❌ Failed to build machine: {}", e);
            process::exit(1);
        }
    }
}

fn run_program(rom: RomImage, config: EmulatorConfig, max_ticks: u64, trace: bool) {
    println!("🔧 Running: {} ({} bytes)", rom.name, rom.len());
    let mut machine = new_machine(rom, config);

    println!();
    println!("━━━ Execution ━━━");

    let mut ticks = 0u64;
    while !machine.is_stopped() && ticks < max_ticks {
        let pc = machine.cpu.regs.pc;
        let text = machine.disassembly().next().map(|(_, text)| text);

        if let Err(e) = machine.step() {
            eprintln!("❌ Fault at PC={:03X}: {}", pc, e);
            process::exit(1);
        }
        if trace {
            println!("{:03X}: {}", pc, text.unwrap_or_default());
        }
        ticks += 1;
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Instructions: {}", machine.instructions());
    println!("State: {:?}", machine.cpu.state);
    for reg in machine.registers() {
        println!("{:>3}: {:0width$X}", reg.name, reg.value, width = reg.width as usize * 2);
    }

    if ticks >= max_ticks && !machine.is_stopped() {
        println!();
        println!("⚠️  Reached max ticks limit ({}). Use --max-ticks to increase.", max_ticks);
    }
}

#[cfg(feature = "tui")]
fn debug_program(rom: RomImage, config: EmulatorConfig) {
    if let Err(e) = chip8::run_debugger(rom, config) {
        eprintln!("❌ Debugger error: {}", e);
        process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_rom: RomImage, _config: EmulatorConfig) {
    eprintln!("❌ Built without the `tui` feature");
    process::exit(1);
}

fn disassemble_file(rom: RomImage, count: Option<usize>) {
    let bytes = match count {
        Some(n) => rom.head(n),
        None => rom.bytes(),
    };

    println!("📖 Disassembling: {}", rom.name);
    println!();
    print!("{}", chip8::disassemble(bytes, chip8::cpu::PROGRAM_START));
}

fn inspect_program(rom: RomImage, config: EmulatorConfig, ticks: u64) {
    let mut machine = new_machine(rom, config);
    let fault = machine.run_for(ticks).err();

    let snapshot = machine.snapshot();
    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("❌ Failed to serialize snapshot: {}", e);
            process::exit(1);
        }
    }

    if let Some(e) = fault {
        eprintln!("❌ Fault: {}", e);
        process::exit(1);
    }
}
