//! Log setup for the command-line tool.
//!
//! A log config is a small TOML file:
//!
//! ```toml
//! filter = "info,ledger_quotes::quotes=debug"
//! format = "json"
//! ```
//!
//! `RUST_LOG`, when set, replaces `filter`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable naming a log config file.
pub const LOG_CONFIG_ENV: &str = "LEDGER_QUOTES_LOG_CFG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read log config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse log config: {}", path.display()))
    }

    /// Load from `explicit`, else from `$LEDGER_QUOTES_LOG_CFG`. A missing
    /// file means defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(LOG_CONFIG_ENV).map(PathBuf::from));
        match path {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Install the global subscriber. Output goes to stderr.
pub fn init(config: &LogConfig) {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .json(),
            )
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init(),
    }
}
