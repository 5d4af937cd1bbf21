//! Command line pieces shared by the binaries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser};

use crate::ExitStatus;
use crate::config::{CONFIG_ENV_VAR, Config, ConfigError, DEFAULT_CONFIG_PATH};

/// Parses the command line, or prints clap's message and returns the exit
/// code to end with. Usage errors get the fatal status, not clap's 2.
pub fn parse_args<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitStatus::Fatal.into()
        } else {
            ExitStatus::Normal.into()
        }
    })
}

/// The `--config` flag every tool accepts.
#[derive(Debug, Clone, Args)]
pub struct ConfigArg {
    /// Path to cookied.conf
    #[arg(long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl ConfigArg {
    /// Loads the config file the flag points at.
    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::load(&self.config)
    }
}
