//! Opens a session and prints a signed cookie for it.

use std::process::ExitCode;

use clap::Parser;
use cookied::cli::{ConfigArg, parse_args};
use cookied::tools::{SignRequest, sign_cookie};
use cookied::{CookiedError, ExitStatus, logging};

/// Mint a signed session cookie.
#[derive(Parser)]
#[command(name = "sign-cookie", version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArg,

    /// User ID (1-12 characters)
    user_id: String,

    /// Client IP address (dotted quad)
    ip: String,

    /// Lifetime in seconds of the cookie in the user's browser
    soft_lifetime: u32,

    /// Absolute lifetime in seconds; must be at least the soft lifetime
    hard_lifetime: u32,
}

fn main() -> ExitCode {
    logging::init();
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(&cli) {
        Ok(cookie) => {
            print!("{cookie}");
            ExitStatus::Normal.into()
        }
        Err(e) => {
            eprintln!("sign-cookie: {e}");
            e.exit_status().into()
        }
    }
}

fn run(cli: &Cli) -> Result<String, CookiedError> {
    let req = SignRequest {
        user_id: cli.user_id.clone(),
        ip: cli.ip.clone(),
        soft_lifetime_secs: cli.soft_lifetime,
        hard_lifetime_secs: cli.hard_lifetime,
    };
    let settings = cli.config.load()?.signer_settings()?;
    Ok(sign_cookie(&settings, &req)?.build())
}
