use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::checkpoint::JsonCheckpointStore;
use crate::duration::{
    deserialize_duration, deserialize_duration_opt, serialize_duration, serialize_duration_opt,
};
use crate::quotes::{
    HelperCommand, QuoteSources, RetryPolicy, ALPHAVANTAGE_MIN_DELAY, DEFAULT_HELPER_PROGRAM,
    DEFAULT_HELPER_TIMEOUT, DEFAULT_MAX_RETRIES,
};

pub const CONFIG_FILE_NAME: &str = "ledger-quotes.toml";

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_true() -> bool {
    true
}

fn default_helper_program() -> String {
    DEFAULT_HELPER_PROGRAM.to_string()
}

fn default_helper_timeout() -> Duration {
    DEFAULT_HELPER_TIMEOUT
}

fn default_sources() -> BTreeMap<String, SourceConfig> {
    BTreeMap::from([(
        "alphavantage".to_string(),
        SourceConfig {
            min_delay: Some(ALPHAVANTAGE_MIN_DELAY),
        },
    )])
}

/// How to launch the quote helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    #[serde(default = "default_helper_program")]
    pub command: String,

    /// Leading arguments, e.g. the helper script when `command` is an interpreter.
    pub args: Vec<String>,

    /// Upper bound on a single lookup. A helper that runs longer is killed.
    #[serde(
        default = "default_helper_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            command: default_helper_program(),
            args: Vec::new(),
            timeout: default_helper_timeout(),
        }
    }
}

/// Per-quote-source settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Minimum time between requests. Unset means the source is not throttled.
    #[serde(
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_delay: Option<Duration>,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Checkpoint store. If relative, resolved from the config file location.
    pub state_file: Option<PathBuf>,

    /// Attempts per symbol for throttled sources.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Run the rate limiter before the first attempt, not only before retries.
    #[serde(default = "default_true")]
    pub delay_first_attempt: bool,

    #[serde(default)]
    pub helper: HelperConfig,

    /// Keyed by quote source name. Replaces the built-in table when present.
    #[serde(default = "default_sources")]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: None,
            max_retries: default_max_retries(),
            delay_first_attempt: true,
            helper: HelperConfig::default(),
            sources: default_sources(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1 in {}", path.display());
        }

        Ok(config)
    }

    pub fn resolve_state_file(&self, config_dir: &Path) -> PathBuf {
        match &self.state_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => JsonCheckpointStore::default_path(),
        }
    }

    pub fn quote_sources(&self) -> QuoteSources {
        let mut sources = QuoteSources::empty();
        for (name, source) in &self.sources {
            if let Some(delay) = source.min_delay {
                sources.set_delay(name.clone(), delay);
            }
        }
        sources
    }
}

/// Loaded configuration with resolved paths and runtime types.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub state_file: PathBuf,
    pub retry: RetryPolicy,
    pub helper: HelperCommand,
    pub sources: QuoteSources,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./ledger-quotes.toml` if it exists in current directory
/// 2. `~/.config/ledger-quotes/ledger-quotes.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("ledger-quotes").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            state_file: config.resolve_state_file(config_dir),
            retry: RetryPolicy::new(config.max_retries)
                .with_delay_first_attempt(config.delay_first_attempt),
            helper: HelperCommand {
                program: config.helper.command.clone(),
                args: config.helper.args.clone(),
                timeout: config.helper.timeout,
            },
            sources: config.quote_sources(),
        }
    }

    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            Ok(Self::from_config(Config::default(), &cwd))
        }
    }
}
