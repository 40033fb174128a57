//! Sink configuration.
//!
//! [`SinkConfig`] is what the sink runs with. [`Config`] is the on-disk form,
//! loaded from `~/.flutter-log/config.toml`; a missing file means defaults.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Decides whether a line reaches the log at all.
pub type Filter = Box<dyn Fn(&str) -> bool>;

/// Default command used to open the log window.
pub const DEFAULT_OPEN_COMMAND: &str = "botright 30vnew";

/// Map a `debug-level` setting to a tracing level.
pub fn level_filter(debug_level: u8) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Settings the sink is set up with. Never changes once applied.
pub struct SinkConfig {
    pub enabled: bool,
    /// Lines for which this returns `false` are dropped.
    pub filter: Option<Filter>,
    /// Raise lines passed to `log_error` as notifications.
    pub notify_errors: bool,
    pub focus_on_open: bool,
    /// Mirror the log into a file on disk.
    pub create_file: bool,
    /// Truncate that file on setup instead of appending to it.
    pub overwrite: bool,
    pub open_command: String,
    pub debug_level: u8,
}

impl SinkConfig {
    /// The tracing level this config asks for.
    pub fn level_filter(&self) -> LevelFilter {
        level_filter(self.debug_level)
    }

    /// Whether `line` passes the configured filter.
    pub fn accepts(&self, line: &str) -> bool {
        self.filter.as_ref().is_none_or(|f| f(line))
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: None,
            notify_errors: false,
            focus_on_open: true,
            create_file: false,
            overwrite: false,
            open_command: DEFAULT_OPEN_COMMAND.to_string(),
            debug_level: 0,
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("enabled", &self.enabled)
            .field("filter", &self.filter.as_ref().map(|_| ".."))
            .field("notify_errors", &self.notify_errors)
            .field("focus_on_open", &self.focus_on_open)
            .field("create_file", &self.create_file)
            .field("overwrite", &self.overwrite)
            .field("open_command", &self.open_command)
            .field("debug_level", &self.debug_level)
            .finish()
    }
}

/// flutter-log configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub enabled: bool,
    /// Regex a line must match to be logged.
    pub filter: Option<String>,
    pub notify_errors: bool,
    pub focus_on_open: bool,
    pub create_file: bool,
    pub overwrite: bool,
    pub open_command: String,
    pub debug_level: u8,
    /// The `flutter` executable. Looked up on `PATH` when unset.
    pub flutter_path: Option<PathBuf>,
    /// Give up on the version probe after this many seconds.
    pub probe_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let sink = SinkConfig::default();
        Self {
            enabled: sink.enabled,
            filter: None,
            notify_errors: sink.notify_errors,
            focus_on_open: sink.focus_on_open,
            create_file: true,
            overwrite: sink.overwrite,
            open_command: sink.open_command,
            debug_level: sink.debug_level,
            flutter_path: None,
            probe_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load config from `~/.flutter-log/config.toml`.
    ///
    /// Falls back to defaults when the home directory or the file is missing.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from `path`, or defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.flutter-log/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".flutter-log").join("config.toml"))
    }

    /// Build the sink settings, compiling the filter.
    pub fn sink_config(&self) -> Result<SinkConfig, String> {
        let filter = match &self.filter {
            Some(pattern) => {
                let re = Regex::new(pattern)
                    .map_err(|e| format!("invalid filter `{pattern}`: {e}"))?;
                Some(Box::new(move |line: &str| re.is_match(line)) as Filter)
            }
            None => None,
        };

        Ok(SinkConfig {
            enabled: self.enabled,
            filter,
            notify_errors: self.notify_errors,
            focus_on_open: self.focus_on_open,
            create_file: self.create_file,
            overwrite: self.overwrite,
            open_command: self.open_command.clone(),
            debug_level: self.debug_level,
        })
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }
}
