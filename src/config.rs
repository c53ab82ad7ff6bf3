//! Application-level configuration loading for the hunt client.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QR_HUNT_CONFIG_PATH";
/// Environment variable overriding the backend base URL.
const API_URL_ENV: &str = "QR_HUNT_API_URL";
/// Environment variable enabling the debug passthrough flag.
const DEBUG_ENV: &str = "QR_HUNT_DEBUG";
/// Backend used when nothing else is configured.
const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Default location of the persisted player credential.
const DEFAULT_CREDENTIAL_PATH: &str = ".qr-hunt/credential.json";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the hunt backend.
    pub api_url: String,
    /// When set, scan submissions ask the backend to skip code validation.
    pub debug: bool,
    /// Location of the persisted player credential.
    pub credential_path: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk, then apply environment overrides.
    ///
    /// Missing or malformed files fall back to built-in defaults; the
    /// environment always has the last word.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Ok(api_url) = env::var(API_URL_ENV) {
            if !api_url.is_empty() {
                config.api_url = api_url;
            }
        }
        if let Ok(debug) = env::var(DEBUG_ENV) {
            config.debug = matches!(debug.as_str(), "1" | "true");
        }

        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            debug: false,
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    api_url: Option<String>,
    debug: Option<bool>,
    credential_path: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            api_url: raw.api_url.unwrap_or(defaults.api_url),
            debug: raw.debug.unwrap_or(defaults.debug),
            credential_path: raw.credential_path.unwrap_or(defaults.credential_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
