// ABOUTME: CLI entry point: wires up the environment, loader, I/O, and clock, then runs a script

mod ast;
mod config;
mod env;
mod error;
mod eval;
mod lexer;
mod loader;
mod parser;
mod scheduler;
mod value;

use clap::Parser;
use env::Environment;
use eval::{Interpreter, StdIo};
use loader::FsModuleLoader;
use scheduler::RealClock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// A tree-walking interpreter for SST, a small imperative scripting language.
#[derive(Parser, Debug)]
#[command(name = "sst")]
#[command(version = config::VERSION)]
#[command(about = "Run an SST script")]
struct Cli {
    /// Script file to execute. Defaults to `main.sst` in the current directory.
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let script_path = cli
        .script
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_ENTRY_FILE));

    if let Err(e) = run_file(&script_path) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_file(path: &PathBuf) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot open script '{}': {}", path.display(), e))?;

    let program = parser::parse(&source).map_err(|e| e.to_string())?;

    let root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));

    let interp = Interpreter::new(
        Environment::new(),
        Arc::new(FsModuleLoader::new(root)),
        Arc::new(StdIo::default()),
        Arc::new(RealClock),
    );

    eval::run(&interp, &program).map_err(|e| e.to_string())
}
