//! # Configuration
//!
//! Layered settings for the CLI and the HTTP server.
//!
//! ## Precedence (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config <file>`, else `denseedia.toml` if present
//! 3. Environment: `DENSEEDIA_DATABASE`, `DENSEEDIA_API_KEY`,
//!    `DENSEEDIA_RATE_LIMIT`, `DENSEEDIA_CORS_ORIGINS`, `DENSEEDIA_LOG_FORMAT`
//! 4. Command-line flags (applied by the CLI)
//!
//! ## Example
//!
//! ```toml
//! database = "notes.redb"
//! log_format = "json"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! rate_limit = 50
//! cors_origins = ["http://localhost:5173"]
//! ```

use denseedia_core::DenseError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "denseedia.toml";

/// Default database file.
pub const DEFAULT_DATABASE: &str = "denseedia.redb";

/// Default global rate limit, in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Largest accepted config file (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SETTINGS
// =============================================================================

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = DenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(DenseError::InvalidInput(format!(
                "unknown log format '{}' (expected text or json)",
                other
            ))),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer key required on every route but `/health`. Unset disables auth.
    pub api_key: Option<String>,
    /// Requests per second across all clients; 0 disables limiting.
    pub rate_limit: u32,
    /// Allowed CORS origins. Empty means localhost only, `["*"]` means any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            cors_origins: Vec::new(),
        }
    }
}

/// Complete application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    pub log_format: LogFormat,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            log_format: LogFormat::Text,
            server: ServerConfig::default(),
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the implicit `denseedia.toml` is
    /// skipped when missing.
    pub fn load(path: Option<&Path>) -> Result<Self, DenseError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    Self::from_file(implicit)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DenseError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            DenseError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(DenseError::InvalidInput(format!(
                "Config file '{}' exceeds {} bytes",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            DenseError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loading config file");
        Self::from_toml_str(&text)
    }

    /// Parse TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, DenseError> {
        toml::from_str(text).map_err(|e| DenseError::InvalidInput(format!("Invalid config: {}", e)))
    }

    /// Overlay `DENSEEDIA_*` variables read through `lookup`.
    ///
    /// Empty values are ignored, except that an empty `DENSEEDIA_API_KEY`
    /// clears a key set by the file.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), DenseError> {
        if let Some(db) = lookup("DENSEEDIA_DATABASE").filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(db);
        }
        if let Some(key) = lookup("DENSEEDIA_API_KEY") {
            self.server.api_key = Some(key).filter(|k| !k.is_empty());
        }
        if let Some(rate) = lookup("DENSEEDIA_RATE_LIMIT").filter(|v| !v.is_empty()) {
            self.server.rate_limit = rate.trim().parse().map_err(|_| {
                DenseError::InvalidInput(format!(
                    "DENSEEDIA_RATE_LIMIT must be a non-negative integer, got '{}'",
                    rate
                ))
            })?;
        }
        if let Some(origins) = lookup("DENSEEDIA_CORS_ORIGINS").filter(|v| !v.is_empty()) {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(format) = lookup("DENSEEDIA_LOG_FORMAT").filter(|v| !v.is_empty()) {
            self.log_format = format.parse()?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
