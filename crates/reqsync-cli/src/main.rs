//! reqsync CLI
//!
//! Keeps requirements files in step with the versions installed in the
//! active Python environment.

mod cli;
mod commands;
mod error;
mod gate;
mod logging;
mod pip;

use std::io::IsTerminal;

use clap::Parser;
use colored::Colorize;
use reqsync_core::ExitCode;

use cli::{Cli, Commands};
use error::Result;
use pip::PipEnvironment;

fn main() {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let code = match execute_command(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            e.exit_code()
        }
    };
    std::process::exit(code.code());
}

fn execute_command(cmd: Commands) -> Result<ExitCode> {
    match cmd {
        Commands::Run(args) => {
            logging::init(args.verbose, args.quiet, args.log_file.as_deref())?;
            let cwd = std::env::current_dir()?;
            commands::run_sync(&args, &cwd, &PipEnvironment::default())
        }
        Commands::Version => {
            println!("reqsync {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::Ok)
        }
        Commands::Completions { shell } => {
            commands::run_completions(shell, &mut std::io::stdout());
            Ok(ExitCode::Ok)
        }
    }
}
