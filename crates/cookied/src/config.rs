//! The `cookied.conf` file and the settings each program derives from it.
//!
//! The format predates this code base and existing files must keep
//! working, so it stays minimal:
//!
//! ```text
//! # cookied.conf
//! SOCKET_PATH       /run/cookied/cookied.sock
//! DB_CONN_STRING    /var/lib/cookied/sessions.db
//! PRIVATE_KEY_PATH  /etc/cookied/signer.key
//! CERT_PATH         /etc/cookied/signer.crt
//! ```
//!
//! One `KEY value` pair per line. The value is the first word after the
//! key; anything after it is ignored. Unknown keys are ignored too, so a
//! single file can serve every program.
//!
//! The daemon, the signer, and the verifier each need a different subset
//! of keys. [`Config`] holds whatever the file said; the `*_settings`
//! methods check that the keys a program needs are present and hand back
//! a typed settings struct.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cookied_store::StoreCredentials;
use cookied_transport::TransportConfig;

/// Where the programs look when neither `--config` nor `COOKIED_CONFIG`
/// is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cookied.conf";

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "COOKIED_CONFIG";

const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line had a key but no value.
    #[error("config line {line}: key {key} has no value")]
    MissingValue { line: usize, key: String },

    /// A value could not be interpreted for its key.
    #[error("config key {key}: invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// A key the program needs was not set.
    #[error("config key {0} is required")]
    MissingKey(&'static str),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// The raw contents of a config file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub socket_path: Option<PathBuf>,
    pub db_conn_string: Option<String>,
    pub db_user: Option<String>,
    pub db_pass: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub cert_path: Option<PathBuf>,
    pub socket_timeout: Option<Duration>,
    pub store_timeout: Option<Duration>,
}

impl Config {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file can't be read, otherwise anything
    /// [`Config::parse`] reports.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses config text. Later lines override earlier ones.
    ///
    /// # Errors
    /// - [`ConfigError::MissingValue`] for a line with a key and no value
    /// - [`ConfigError::InvalidValue`] for a timeout that isn't a positive
    ///   whole number of seconds
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut words = line.split_whitespace();
            let (Some(key), Some(value)) = (words.next(), words.next()) else {
                return Err(ConfigError::MissingValue {
                    line: index + 1,
                    key: line.to_string(),
                });
            };

            match key {
                "SOCKET_PATH" => config.socket_path = Some(PathBuf::from(value)),
                "DB_CONN_STRING" => config.db_conn_string = Some(value.to_string()),
                "DB_USER" => config.db_user = Some(value.to_string()),
                "DB_PASS" => config.db_pass = Some(value.to_string()),
                "PRIVATE_KEY_PATH" => config.private_key_path = Some(PathBuf::from(value)),
                "CERT_PATH" => config.cert_path = Some(PathBuf::from(value)),
                "SOCKET_TIMEOUT_SECS" => {
                    config.socket_timeout = Some(parse_secs("SOCKET_TIMEOUT_SECS", value)?);
                }
                "STORE_TIMEOUT_SECS" => {
                    config.store_timeout = Some(parse_secs("STORE_TIMEOUT_SECS", value)?);
                }
                other => tracing::debug!(key = other, "ignoring unknown config key"),
            }
        }

        Ok(config)
    }

    /// Settings for the daemon: socket path and store.
    pub fn daemon_settings(&self) -> Result<DaemonSettings, ConfigError> {
        Ok(DaemonSettings {
            socket_path: require(&self.socket_path, "SOCKET_PATH")?.clone(),
            store: self.store_credentials()?,
            transport: TransportConfig::with_timeout(self.socket_timeout()),
        })
    }

    /// Settings for the cookie signer: store and private key.
    pub fn signer_settings(&self) -> Result<SignerSettings, ConfigError> {
        Ok(SignerSettings {
            store: self.store_credentials()?,
            private_key_path: require(&self.private_key_path, "PRIVATE_KEY_PATH")?.clone(),
        })
    }

    /// Settings for the cookie verifier: certificate and daemon socket.
    pub fn verifier_settings(&self) -> Result<VerifierSettings, ConfigError> {
        Ok(VerifierSettings {
            cert_path: require(&self.cert_path, "CERT_PATH")?.clone(),
            socket_path: require(&self.socket_path, "SOCKET_PATH")?.clone(),
            timeout: self.socket_timeout(),
        })
    }

    fn store_credentials(&self) -> Result<StoreCredentials, ConfigError> {
        let mut creds = StoreCredentials::new(require(&self.db_conn_string, "DB_CONN_STRING")?);
        creds.user = self.db_user.clone();
        creds.password = self.db_pass.clone();
        creds.timeout = self
            .store_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Ok(creds)
    }

    fn socket_timeout(&self) -> Duration {
        self.socket_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

fn require<'a, T>(value: &'a Option<T>, key: &'static str) -> Result<&'a T, ConfigError> {
    value.as_ref().ok_or(ConfigError::MissingKey(key))
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// The human-readable dump `readconf` prints. The password is masked.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(value: Option<String>) -> String {
            value.unwrap_or_default()
        }
        let path = |p: &Option<PathBuf>| show(p.as_ref().map(|p| p.display().to_string()));

        writeln!(f, "Socket path: {}", path(&self.socket_path))?;
        writeln!(f, "Connection string: {}", show(self.db_conn_string.clone()))?;
        writeln!(f, "User: {}", show(self.db_user.clone()))?;
        writeln!(
            f,
            "Password: {}",
            show(self.db_pass.as_ref().map(|_| "****".to_string()))
        )?;
        writeln!(f, "Private key: {}", path(&self.private_key_path))?;
        writeln!(f, "Certificate: {}", path(&self.cert_path))?;
        writeln!(f, "Socket timeout: {}s", self.socket_timeout().as_secs())?;
        write!(
            f,
            "Store timeout: {}s",
            self.store_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .as_secs()
        )
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("socket_path", &self.socket_path)
            .field("db_conn_string", &self.db_conn_string)
            .field("db_user", &self.db_user)
            .field("db_pass", &self.db_pass.as_ref().map(|_| "****"))
            .field("private_key_path", &self.private_key_path)
            .field("cert_path", &self.cert_path)
            .field("socket_timeout", &self.socket_timeout)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Per-program settings
// ---------------------------------------------------------------------------

/// What the daemon needs to start.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub socket_path: PathBuf,
    pub store: StoreCredentials,
    pub transport: TransportConfig,
}

/// What `sign-cookie` needs.
#[derive(Debug, Clone)]
pub struct SignerSettings {
    pub store: StoreCredentials,
    pub private_key_path: PathBuf,
}

/// What `verify-cookie` needs.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub cert_path: PathBuf,
    pub socket_path: PathBuf,
    pub timeout: Duration,
}
