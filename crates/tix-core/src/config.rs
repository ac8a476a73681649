//! Configuration for tix
//!
//! Stored as TOML, by default in `<config dir>/tix/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::query::{DETAIL_PREVIEW_LIMIT, RECENT_COMMENTS_LIMIT};

const CONFIG_ENV: &str = "TIX_CONFIG";
const DATABASE_ENV: &str = "TIX_DATABASE";
const PORT_ENV: &str = "TIX_API_PORT";

/// tix configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Address the API server binds to
    pub bind_address: String,

    /// Port the API server listens on
    pub port: u16,

    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,

    /// Query view settings
    #[serde(default)]
    pub queries: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            log_filter: "info".to_string(),
            queries: QueryConfig::default(),
        }
    }
}

/// Settings for the composed query views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Entries returned by the recent-comments views when no limit is given
    pub recent_comments_limit: usize,

    /// Tasks and comments included in a ticket detail view
    pub detail_preview_limit: usize,

    /// Accept a numeric index (0 = LOW .. 3 = SEVERE) as a severity filter
    pub legacy_severity_index: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            recent_comments_limit: RECENT_COMMENTS_LIMIT,
            detail_preview_limit: DETAIL_PREVIEW_LIMIT,
            legacy_severity_index: false,
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("tix").join("tix.db"))
        .unwrap_or_else(|| PathBuf::from("tix.db"))
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tix").join("config.toml"))
    }

    /// Pick the config file: an explicit path, then `$TIX_CONFIG`, then the
    /// default location.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| {
                std::env::var(CONFIG_ENV)
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
            })
            .or_else(Self::default_path)
    }

    /// Locate, load and apply environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> crate::Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load config from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `TIX_DATABASE` replaces the database path, `TIX_API_PORT` the port.
    pub fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(path) = std::env::var(DATABASE_ENV)
            && !path.is_empty()
        {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var(PORT_ENV)
            && !port.is_empty()
        {
            self.port = port
                .parse()
                .map_err(|_| crate::Error::Config(format!("{PORT_ENV}: invalid port '{port}'")))?;
        }
        Ok(())
    }

    /// Generate a default config file with comments
    pub fn default_with_comments() -> String {
        format!(
            r#"# tix configuration

# SQLite database file (overridden by $TIX_DATABASE)
database_path = "{}"

# API server address and port (port overridden by $TIX_API_PORT)
bind_address = "127.0.0.1"
port = 3000

# Tracing filter used when RUST_LOG is unset
log_filter = "info"

[queries]
# Entries in the recent-comments views when no limit is given
recent_comments_limit = 10

# Tasks and comments shown in a ticket detail view
detail_preview_limit = 5

# Accept severity=0..3 as an index into LOW, MEDIUM, HIGH, SEVERE
legacy_severity_index = false
"#,
            default_database_path().display()
        )
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
