//! Reference host for the HanoiVM: load, check, disassemble and run
//! bytecode files from the command line.

use clap::{Parser, Subcommand, ValueEnum};

use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};

use hanoi_vm::prelude::*;

const EXIT_OK: u8 = 0;
const EXIT_VALIDATION: u8 = 1;
const EXIT_RUNTIME: u8 = 2;
const EXIT_CANCELLED: u8 = 3;
const EXIT_USAGE: u8 = 4;

#[derive(Parser)]
#[command(name = "hvm")]
#[command(about = "HanoiVM bytecode tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    T81,
    T243,
    T729,
}

impl From<Mode> for Tier {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::T81 => Tier::T81,
            Mode::T243 => Tier::T243,
            Mode::T729 => Tier::T729,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load, run, and print the final stack
    Run {
        /// Bytecode file, headered or raw
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Initial tier mode
        #[arg(long, value_enum, default_value = "t81")]
        mode: Mode,
        /// Session id override (defaults to the program fingerprint)
        #[arg(long)]
        session: Option<String>,
        /// Print entropy events to stderr
        #[arg(long)]
        trace: bool,
        /// Expected SHA-256 digest of the body, hex
        #[arg(long)]
        expect_digest: Option<String>,
    },
    /// Print the disassembly to stdout
    Disasm {
        /// Bytecode file, headered or raw
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Validate without executing
    Check {
        /// Bytecode file, headered or raw
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Expected SHA-256 digest of the body, hex
        #[arg(long)]
        expect_digest: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Run {
            file,
            mode,
            session,
            trace,
            expect_digest,
        } => run(&file, mode, session, trace, expect_digest),
        Commands::Disasm { file } => disasm(&file),
        Commands::Check { file, expect_digest } => check(&file, expect_digest),
    };
    ExitCode::from(code)
}

fn load(file: &PathBuf, expect_digest: Option<String>) -> Result<Program, u8> {
    let bytes = fs::read(file).map_err(|error| {
        eprintln!("[HVM Io] {}: {error}", file.display());
        EXIT_USAGE
    })?;
    let config = LoadConfig::default();
    let loaded = match expect_digest {
        Some(expected) => {
            let digest = parse_digest(&expected).ok_or_else(|| {
                eprintln!("[HVM Usage] --expect-digest wants 64 hex characters");
                EXIT_USAGE
            })?;
            Program::load_expecting(&bytes, &config, &digest)
        }
        None => Program::load(&bytes, &config),
    };
    loaded.map_err(|error| {
        eprintln!("[HVM {}] {error}", load_error_kind(&error));
        EXIT_VALIDATION
    })
}

fn run(
    file: &PathBuf,
    mode: Mode,
    session: Option<String>,
    trace: bool,
    expect_digest: Option<String>,
) -> u8 {
    let program = match load(file, expect_digest) {
        Ok(program) => program,
        Err(code) => return code,
    };

    let params = InterpreterParams {
        initial_tier: mode.into(),
        session_id: session.map(SessionId::new),
        ..InterpreterParams::default()
    };
    let mut vm = Interpreter::new(Arc::new(program), params);
    if trace {
        vm = vm.with_sink(Arc::new(WriterSink::new(std::io::stderr())));
    }

    match vm.run() {
        ProgramState::Completed => {
            for operand in vm.stack() {
                println!("{operand}");
            }
            EXIT_OK
        }
        ProgramState::Faulted(info) => {
            eprintln!(
                "[HVM {}] {} at offset {}",
                info.reason, info.mnemonic, info.offset
            );
            EXIT_RUNTIME
        }
        ProgramState::Cancelled => {
            eprintln!("[HVM Cancelled] execution cancelled");
            EXIT_CANCELLED
        }
    }
}

fn disasm(file: &PathBuf) -> u8 {
    match load(file, None) {
        Ok(program) => {
            print!("{}", disassemble(&program));
            EXIT_OK
        }
        Err(code) => code,
    }
}

fn check(file: &PathBuf, expect_digest: Option<String>) -> u8 {
    match load(file, expect_digest) {
        Ok(program) => {
            println!("{}", program.fingerprint());
            EXIT_OK
        }
        Err(code) => code,
    }
}

fn parse_digest(hex_digest: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(hex_digest.trim()).ok()?;
    bytes.try_into().ok()
}

fn load_error_kind(error: &LoadError) -> &'static str {
    match error {
        LoadError::ProgramTooLarge { .. } => "ProgramTooLarge",
        LoadError::UnknownOpcode { .. } => "UnknownOpcode",
        LoadError::TagMismatch { .. } => "TagMismatch",
        LoadError::MalformedOperand { .. } => "MalformedOperand",
        LoadError::Truncated(_) => "Truncated",
        LoadError::DigestMismatch { .. } => "DigestMismatch",
        LoadError::InvalidHeader(_) => "InvalidHeader",
    }
}
