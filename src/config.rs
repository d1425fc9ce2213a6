//! Configuration management for spotme.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files. Everything is read once at startup into a [`Config`] that is passed
//! explicitly to every component; nothing reads the environment afterwards.
//!
//! Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. `.env` file in the current working directory
//! 4. Application defaults (where applicable)

use std::{env, path::PathBuf, time::Duration};

use reqwest::Url;

use crate::error::ConfigError;

/// Permissions requested from the user.
pub const SPOTIFY_SCOPE: &str = "user-read-private user-read-email user-top-read";

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5173/callback";
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_VERIFIER_LENGTH: usize = 128;
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 120;

/// Loads environment variables from `.env` files.
///
/// The file in the local data directory (`spotme/.env`) is tried first, then
/// a `.env` in the working directory. Variables that are already set in the
/// process environment are never overridden. Missing files are not an error.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/spotme/.env`
/// - macOS: `~/Library/Application Support/spotme/.env`
/// - Windows: `%LOCALAPPDATA%/spotme/.env`
///
/// # Errors
///
/// Returns an error string if the data directory cannot be created or an
/// existing `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let mut path = default_data_dir();
    async_fs::create_dir_all(&path)
        .await
        .map_err(|e| e.to_string())?;
    path.push(".env");

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    }

    match dotenv::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Runtime configuration, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    /// Base of the accounts service, hosting `/authorize` and `/api/token`.
    pub accounts_url: String,
    /// Base of the Web API, e.g. `https://api.spotify.com/v1`.
    pub api_url: String,
    pub enable_cache: bool,
    pub verifier_length: usize,
    pub callback_timeout: Duration,
    pub data_dir: PathBuf,
}

impl Config {
    /// Configuration with defaults for everything but the client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: SPOTIFY_SCOPE.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            enable_cache: true,
            verifier_length: DEFAULT_VERIFIER_LENGTH,
            callback_timeout: Duration::from_secs(DEFAULT_CALLBACK_TIMEOUT_SECS),
            data_dir: default_data_dir(),
        }
    }

    /// Builds the configuration from the process environment.
    ///
    /// Fails fast when `SPOTIFY_CLIENT_ID` is absent or empty, before any
    /// network activity happens.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = env::var("SPOTIFY_CLIENT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SPOTIFY_CLIENT_ID"))?;

        let mut config = Self::new(client_id.trim());

        if let Some(uri) = var("SPOTIFY_REDIRECT_URI") {
            config.redirect_uri = uri;
        }
        if let Some(url) = var("SPOTIFY_ACCOUNTS_URL") {
            config.accounts_url = url;
        }
        if let Some(url) = var("SPOTIFY_API_URL") {
            config.api_url = url;
        }
        if let Some(flag) = var("SPOTME_ENABLE_CACHE") {
            config.enable_cache = parse_bool("SPOTME_ENABLE_CACHE", &flag)?;
        }
        if let Some(length) = var("SPOTME_VERIFIER_LENGTH") {
            config.verifier_length =
                length
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        name: "SPOTME_VERIFIER_LENGTH",
                        reason: e.to_string(),
                    })?;
        }
        if let Some(secs) = var("SPOTME_CALLBACK_TIMEOUT") {
            let secs: u64 = secs
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    name: "SPOTME_CALLBACK_TIMEOUT",
                    reason: e.to_string(),
                })?;
            config.callback_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = var("SPOTME_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Configuration for commands that only touch local state, such as `logout`.
    ///
    /// Only `SPOTME_DATA_DIR` is read. The client id stays empty and is never
    /// validated, so a missing `SPOTIFY_CLIENT_ID` does not lock the user out
    /// of clearing cached tokens.
    pub fn local_from_env() -> Self {
        let mut config = Self::new(String::new());
        if let Some(dir) = var("SPOTME_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config
    }

    /// Checks the cross-field constraints of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("SPOTIFY_CLIENT_ID"));
        }
        // RFC 7636 section 4.1
        if !(43..=128).contains(&self.verifier_length) {
            return Err(ConfigError::Invalid {
                name: "SPOTME_VERIFIER_LENGTH",
                reason: format!("{} is outside 43..=128", self.verifier_length),
            });
        }
        self.callback_addr().map(|_| ())
    }

    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = url.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_cache(mut self, enable_cache: bool) -> Self {
        self.enable_cache = enable_cache;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url.trim_end_matches('/'))
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }

    /// Builds a Web API URL from a path such as `/me`.
    pub fn api_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    /// The `host:port` the callback listener binds, taken from the redirect URI.
    pub fn callback_addr(&self) -> Result<String, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            name: "SPOTIFY_REDIRECT_URI",
            reason,
        };

        let url = Url::parse(&self.redirect_uri).map_err(|e| invalid(e.to_string()))?;
        let host = match url.host_str() {
            Some("localhost") => "127.0.0.1",
            Some(host) => host,
            None => return Err(invalid("redirect URI has no host".to_string())),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("redirect URI has no port".to_string()))?;

        Ok(format!("{host}:{port}"))
    }

    /// Path component of the redirect URI the listener serves, e.g. `/callback`.
    pub fn callback_path(&self) -> String {
        Url::parse(&self.redirect_uri)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| "/callback".to_string())
    }

    /// File backing the durable store (holds the PKCE verifier between steps).
    pub fn durable_store_path(&self) -> PathBuf {
        self.data_dir.join("state/durable.json")
    }

    /// File backing the session cache (tokens and fetched documents).
    pub fn session_store_path(&self) -> PathBuf {
        self.data_dir.join("cache/session.json")
    }
}

/// `<local data dir>/spotme`, or `./spotme` when the platform has none.
pub fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotme");
    path
}

/// Whether `SPOTME_DEBUG` is set to anything but an empty string.
pub fn debug_enabled() -> bool {
    env::var("SPOTME_DEBUG").is_ok_and(|v| !v.is_empty())
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("`{other}` is not a boolean"),
        }),
    }
}
