//! Verifies a signed cookie and asks the daemon whether its session lives.

use std::process::ExitCode;

use clap::Parser;
use cookied::cli::{ConfigArg, parse_args};
use cookied::tools::verify_cookie;
use cookied::{CookiedError, ExitStatus, logging};

/// Check a signed session cookie.
#[derive(Parser)]
#[command(name = "verify-cookie", version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArg,

    /// Signed cookie as produced by sign-cookie
    signed_cookie: String,

    /// Require the cookie to have been issued to this IP
    ip: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(&cli).await {
        Ok(response) => {
            print!("{response}");
            ExitStatus::Normal.into()
        }
        Err(e) => {
            eprintln!("verify-cookie: {e}");
            e.exit_status().into()
        }
    }
}

async fn run(cli: &Cli) -> Result<String, CookiedError> {
    let settings = cli.config.load()?.verifier_settings()?;
    verify_cookie(&settings, &cli.signed_cookie, cli.ip.as_deref()).await
}
