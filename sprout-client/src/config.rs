use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis { key: &'static str, value: String },
    #[error("unknown credential backend {0:?}, expected \"file\" or \"keyring\"")]
    UnknownBackend(String),
    #[error("no home directory found, set SPROUT_HOME")]
    NoHome,
}

/// Where the session and device token are kept between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialBackend {
    /// JSON file under the sprout home directory
    File,
    /// OS keychain
    Keyring,
}

impl std::str::FromStr for CredentialBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            _ => Err(ConfigError::UnknownBackend(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the API paths are appended to
    pub api_url: String,
    pub request_timeout: Duration,
    pub scan_timeout: Duration,
    pub connect_timeout: Duration,
    /// Sprout home directory, `~/.sprout` unless `SPROUT_HOME` is set
    pub home: PathBuf,
    pub credential_backend: CredentialBackend,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let home = match lookup("SPROUT_HOME") {
            Some(home) => PathBuf::from(home),
            None => dirs::home_dir().ok_or(ConfigError::NoHome)?.join(".sprout"),
        };

        Ok(Self {
            api_url: optional("SPROUT_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_owned(),
            request_timeout: millis(
                "SPROUT_REQUEST_TIMEOUT_MS",
                &optional("SPROUT_REQUEST_TIMEOUT_MS", "15000"),
            )?,
            scan_timeout: millis(
                "SPROUT_SCAN_TIMEOUT_MS",
                &optional("SPROUT_SCAN_TIMEOUT_MS", "10000"),
            )?,
            connect_timeout: millis(
                "SPROUT_CONNECT_TIMEOUT_MS",
                &optional("SPROUT_CONNECT_TIMEOUT_MS", "10000"),
            )?,
            home,
            credential_backend: optional("SPROUT_CREDENTIAL_BACKEND", default_backend())
                .parse()?,
        })
    }
}

fn default_backend() -> &'static str {
    if cfg!(feature = "keyring") {
        "keyring"
    } else {
        "file"
    }
}

fn millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidMillis {
            key,
            value: value.to_owned(),
        })
}
