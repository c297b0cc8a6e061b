//! Client configuration.
//!
//! Defaults are overlaid by an optional TOML file
//! (`<config_dir>/deck-notes/config.toml`); the CLI applies its own flags on
//! top of the result.

use deck_notes_core::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "deck-notes";
const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Settings shared by the API client and the generator.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the notes backend.
    pub base_url: String,

    /// Per-request timeout. Expansion calls an LLM and can be slow.
    pub request_timeout: Duration,

    /// Ask the backend to pull in external encyclopedia context.
    pub use_wikipedia: bool,

    /// Default number of search hits requested.
    pub search_top_k: usize,

    /// How long a completed batch stays in `Completed` before going idle.
    pub idle_reset_delay: Duration,

    /// Where the session file lives; `None` uses the platform config dir.
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            use_wikipedia: true,
            search_top_k: 5,
            idle_reset_delay: Duration::from_millis(600),
            session_path: None,
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    use_wikipedia: Option<bool>,
    search_top_k: Option<usize>,
    idle_reset_delay_ms: Option<u64>,
    session_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse configuration from TOML text, overlaying the defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        let mut config = Self::default();
        if let Some(url) = file.base_url {
            config.base_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = file.use_wikipedia {
            config.use_wikipedia = flag;
        }
        if let Some(k) = file.search_top_k {
            config.search_top_k = k;
        }
        if let Some(ms) = file.idle_reset_delay_ms {
            config.idle_reset_delay = Duration::from_millis(ms);
        }
        if file.session_path.is_some() {
            config.session_path = file.session_path;
        }
        Ok(config)
    }

    /// Override the backend URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the idle-reset delay.
    pub fn with_idle_reset_delay(mut self, delay: Duration) -> Self {
        self.idle_reset_delay = delay;
        self
    }

    /// Resolved session file path.
    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.session_path {
            return path.clone();
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(SESSION_FILE))
            .unwrap_or_else(|| PathBuf::from(format!(".{}-{}", APP_DIR, SESSION_FILE)))
    }

    /// Absolute URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
