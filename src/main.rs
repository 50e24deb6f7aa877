// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lark - a small scripting language with a bytecode VM, written in Rust
//!
//! This is the main entry point for the lark CLI/REPL.
//!
//! ## Features
//!
//! - Interactive REPL with syntax highlighting and history
//! - Async file execution with tokio
//! - Bytecode listings and heap statistics for debugging

mod repl;

use clap::Parser;
use lark_engine::{AsyncEngine, Error, HeapStats, disassemble};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::fs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Lark - compile and run Lark scripts
#[derive(Parser, Debug)]
#[command(name = "lark")]
#[command(author = "Pegasus Heavy Industries, LLC")]
#[command(version)]
#[command(about = "Compile and run Lark scripts", long_about = None)]
struct Cli {
    /// Script file to run (starts the REPL when omitted)
    file: Option<PathBuf>,

    /// Run a program given on the command line
    #[arg(short = 'e', long = "eval", value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the bytecode listing before running
    #[arg(short = 'b', long)]
    bytecode: bool,

    /// Stop after printing the bytecode listing
    #[arg(long, requires = "bytecode")]
    compile_only: bool,

    /// Print heap statistics after the run
    #[arg(long)]
    gc_stats: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "lark=debug,lark_engine=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let source = match (&cli.file, &cli.eval) {
        (None, None) => return run_repl(),
        (_, Some(code)) => code.clone(),
        (Some(path), None) => match fs::read_to_string(path).await {
            Ok(source) => source,
            Err(e) => {
                eprintln!(
                    "{}: cannot read '{}': {}",
                    "Error".red().bold(),
                    path.display().cyan(),
                    e
                );
                return ExitCode::FAILURE;
            }
        },
    };

    match run(&cli, &source).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Compiles `source`, then runs it unless only a listing was asked for.
async fn run(cli: &Cli, source: &str) -> Result<(), Error> {
    let bytecode = lark_engine::compile(source)?;
    debug!(instructions = bytecode.instructions.len(), "Compiled program");

    if cli.bytecode {
        print!("{}", disassemble(&bytecode));
    }
    if cli.compile_only {
        return Ok(());
    }

    let engine = AsyncEngine::new();
    engine.execute(&bytecode).await?;

    if cli.gc_stats {
        print_heap_stats(&engine.heap_stats().await);
    }
    Ok(())
}

/// Start the interactive REPL
fn run_repl() -> ExitCode {
    match repl::Repl::new() {
        Ok(mut repl) => {
            if let Err(e) = repl.run() {
                eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{}: Failed to initialize REPL: {:?}",
                "Error".red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

fn print_heap_stats(stats: &HeapStats) {
    eprintln!("{}", "Heap statistics:".white().bold());
    eprintln!("  {:20} {}", "allocations".cyan(), stats.total_allocations);
    eprintln!("  {:20} {}", "live objects".cyan(), stats.live_objects);
    eprintln!("  {:20} {}", "collections".cyan(), stats.collections);
    eprintln!("  {:20} {}", "reclaimed".cyan(), stats.reclaimed);
}

fn print_error(error: &Error) {
    let message = error.to_string();

    match message.split_once(':') {
        Some((kind, rest)) => eprintln!("{}:{}", kind.red().bold(), rest),
        None => eprintln!("{}", message.red()),
    }
}
