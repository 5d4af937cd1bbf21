//! The cookie daemon.

use std::process::ExitCode;

use clap::Parser;
use cookied::cli::{ConfigArg, parse_args};
use cookied::{CookiedError, Daemon, ExitStatus, logging};

/// Answers session lifetime queries on a local socket.
#[derive(Parser)]
#[command(name = "cookied", version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArg,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli: Cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    match run(&cli).await {
        Ok(()) => ExitStatus::Normal.into(),
        Err(e) => {
            tracing::error!(error = %e, "cookied exiting");
            ExitStatus::Fatal.into()
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CookiedError> {
    let settings = cli.config.load()?.daemon_settings()?;
    tracing::info!(
        config = %cli.config.config.display(),
        socket = %settings.socket_path.display(),
        "starting cookied"
    );
    Daemon::start(settings).await?.run().await
}
