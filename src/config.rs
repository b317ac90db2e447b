use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AutotagError, Result};
use crate::retry::{DEFAULT_DELAY_SECONDS, DEFAULT_MAX_RETRIES};

/// Recognition command used unless configured otherwise.
pub const DEFAULT_RECOGNIZER_COMMAND: &str = "songrec";

/// Timeout for cover art downloads unless configured otherwise.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 20;

/// Configuration defaults that can be saved to a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modify: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognizer_command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_timeout_seconds: Option<u64>,
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// The values used when neither the saved file nor the command line says otherwise
    pub fn builtin() -> Self {
        Config {
            delay_seconds: Some(DEFAULT_DELAY_SECONDS),
            max_retries: Some(DEFAULT_MAX_RETRIES),
            modify: Some(true),
            trace: Some(false),
            recognizer_command: Some(DEFAULT_RECOGNIZER_COMMAND.to_string()),
            http_timeout_seconds: Some(DEFAULT_HTTP_TIMEOUT_SECONDS),
        }
    }

    /// Get the config file path (~/.state/autotag/defaults.toml)
    pub fn get_config_path() -> std::result::Result<PathBuf, io::Error> {
        let home = std::env::var("HOME")
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set"))?;

        let config_dir = Path::new(&home).join(".state").join("autotag");
        Ok(config_dir.join("defaults.toml"))
    }

    /// Load config from the default location. A missing file is an empty config.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(config_path)?;
        toml::from_str(&content)
            .map_err(|e| AutotagError::Config(format!("{}: {}", config_path.display(), e)))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| AutotagError::Config(e.to_string()))?;
        fs::write(config_path, toml_string)?;

        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.delay_seconds.is_some() {
            self.delay_seconds = other.delay_seconds;
        }
        if other.max_retries.is_some() {
            self.max_retries = other.max_retries;
        }
        if other.modify.is_some() {
            self.modify = other.modify;
        }
        if other.trace.is_some() {
            self.trace = other.trace;
        }
        if other.recognizer_command.is_some() {
            self.recognizer_command = other.recognizer_command.clone();
        }
        if other.http_timeout_seconds.is_some() {
            self.http_timeout_seconds = other.http_timeout_seconds;
        }
    }

    /// Print the config in a human-readable format
    pub fn print(&self, title: &str) {
        println!("{}:", title);

        if let Some(delay) = self.delay_seconds {
            println!("  Retry delay:        {} seconds", delay);
        }
        if let Some(retries) = self.max_retries {
            println!("  Max attempts:       {}", retries);
        }
        if let Some(modify) = self.modify {
            println!("  Modify files:       {}", if modify { "yes" } else { "no (dry run)" });
        }
        if let Some(trace) = self.trace {
            println!("  Trace logging:      {}", if trace { "enabled" } else { "disabled" });
        }
        if let Some(command) = &self.recognizer_command {
            println!("  Recognizer:         {}", command);
        }
        if let Some(timeout) = self.http_timeout_seconds {
            println!("  HTTP timeout:       {} seconds", timeout);
        }
    }
}

/// Resolved runtime settings for one batch run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory to scan
    pub input: PathBuf,
    /// Rename and retag files (false = report only)
    pub modify: bool,
    /// Pause between recognition attempts
    pub delay: Duration,
    /// Recognition attempts per file
    pub max_retries: u32,
    /// Trace-level diagnostics
    pub trace: bool,
    /// Allow directories reserved for the self-test fixtures
    pub test_mode: bool,
    /// Show the progress bar
    pub show_progress: bool,
    pub recognizer_command: String,
    pub http_timeout: Duration,
}

impl Settings {
    /// Resolve settings from built-in defaults overlaid with `config`
    pub fn from_config(input: PathBuf, config: &Config) -> Self {
        let mut effective = Config::builtin();
        effective.merge(config);

        Settings {
            input,
            modify: effective.modify.unwrap_or(true),
            delay: Duration::from_secs(effective.delay_seconds.unwrap_or(DEFAULT_DELAY_SECONDS)),
            max_retries: effective.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            trace: effective.trace.unwrap_or(false),
            test_mode: false,
            show_progress: true,
            recognizer_command: effective
                .recognizer_command
                .unwrap_or_else(|| DEFAULT_RECOGNIZER_COMMAND.to_string()),
            http_timeout: Duration::from_secs(
                effective.http_timeout_seconds.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
            ),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(PathBuf::from("."), &Config::new())
    }
}
