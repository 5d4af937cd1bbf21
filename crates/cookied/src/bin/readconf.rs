//! Prints a cookied config file as the programs see it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cookied::cli::parse_args;
use cookied::{Config, ExitStatus};

/// Dump a cookied.conf file (password masked).
#[derive(Parser)]
#[command(name = "readconf", version)]
struct Cli {
    /// Config file to read
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };
    match Config::load(&cli.file) {
        Ok(config) => {
            println!("{config}");
            ExitStatus::Normal.into()
        }
        Err(e) => {
            eprintln!("readconf: {e}");
            ExitStatus::Fatal.into()
        }
    }
}
