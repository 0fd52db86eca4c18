//! LS-8 Emulator - CLI entry point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run a program file until it halts
//! - `ls8-emu dasm <program>` - Print a program as a readable listing

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use ls8::{disassemble, load_program, Cpu, LoadError};

/// Exit code for a CPU failure at run time.
const EXIT_RUNTIME: i32 = 1;
/// Exit code for a malformed program file (sysexits EX_DATAERR).
const EXIT_DATAERR: i32 = 65;
/// Exit code for a missing program file (sysexits EX_NOINPUT).
const EXIT_NOINPUT: i32 = 66;
/// Exit code for any other I/O failure (sysexits EX_IOERR).
const EXIT_IOERR: i32 = 74;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version)]
#[command(about = "An emulator for the LS-8 8-bit register machine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the program file to execute
        program: PathBuf,
        /// Maximum number of cycles to run
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Print a trace line for every cycle
        #[arg(short, long)]
        trace: bool,
        /// Reproduce the hardware's unknown-opcode stall instead of failing
        #[arg(long)]
        compat_stall: bool,
        /// Write the final CPU state as JSON
        #[arg(long, value_name = "FILE")]
        dump_state: Option<PathBuf>,
    },
    /// Print a program as a readable instruction listing
    Dasm {
        /// Path to the program file
        program: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            program,
            max_cycles,
            trace,
            compat_stall,
            dump_state,
        } => {
            init_logger(trace);
            run_program(&program, max_cycles, compat_stall, dump_state.as_deref());
        }
        Commands::Dasm { program } => {
            init_logger(false);
            disassemble_file(&program);
        }
    }
}

/// Diagnostics go to stderr through the logger; stdout carries nothing
/// but PRN output.
fn init_logger(trace: bool) {
    let default = if trace { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn load_or_exit(path: &Path) -> Vec<u8> {
    match load_program(path) {
        Ok(bytes) => bytes,
        Err(e @ LoadError::FileNotFound(_)) => {
            eprintln!("{}", e);
            process::exit(EXIT_NOINPUT);
        }
        Err(e @ LoadError::Io(_)) => {
            eprintln!("{}", e);
            process::exit(EXIT_IOERR);
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(EXIT_DATAERR);
        }
    }
}

fn run_program(path: &Path, max_cycles: u64, compat_stall: bool, dump_state: Option<&Path>) {
    let program = load_or_exit(path);

    let mut cpu = Cpu::new();
    cpu.stall_on_unknown(compat_stall);
    if let Err(e) = cpu.load_program(&program) {
        eprintln!("{}", e);
        process::exit(EXIT_DATAERR);
    }

    log::debug!("loaded {} bytes from {}", program.len(), path.display());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cpu.run_limited(&mut out, max_cycles) {
        Ok(executed) => {
            let _ = out.flush();
            log::debug!("executed {} instructions, state {:?}", executed, cpu.state);
            if cpu.is_running() {
                log::warn!(
                    "reached the {} cycle limit; use --max-cycles to raise it",
                    max_cycles
                );
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            process::exit(EXIT_RUNTIME);
        }
    }

    if let Some(path) = dump_state {
        let json = match serde_json::to_string_pretty(&cpu) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("failed to serialize state: {}", e);
                process::exit(EXIT_RUNTIME);
            }
        };
        if let Err(e) = std::fs::write(path, json) {
            eprintln!("failed to write state dump: {}", e);
            process::exit(EXIT_IOERR);
        }
    }
}

fn disassemble_file(path: &Path) {
    let program = load_or_exit(path);
    print!("{}", disassemble(&program));
}
