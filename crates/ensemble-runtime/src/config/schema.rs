//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure (`ensemble.toml`).
///
/// ```toml
/// [logging]
/// level = "debug"
/// format = "compact"
///
/// [plugins]
/// disabled = ["metadata-editor"]
///
/// [plugins.config.transcoder]
/// bitrate = 320
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnsembleConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugin loading settings.
    #[serde(default)]
    pub plugins: PluginSettings,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging output.
    Debug,
    /// Informational output (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Returns the lowercase level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log event format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line compact output (default).
    #[default]
    Compact,
    /// Standard multi-field output.
    Full,
    /// Multi-line human-friendly output.
    Pretty,
    /// Newline-delimited JSON. Requires the `json-log` feature.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output (default).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// A log file; see `LoggingConfig::file_path`.
    File,
}

/// Logging configuration (`[logging]` section).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level.
    pub level: LogLevel,

    /// Event format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Log file path, used when `output = "file"`.
    pub file_path: Option<PathBuf>,

    /// Per-module level overrides, e.g. `ensemble_core = "debug"`.
    pub filters: HashMap<String, LogLevel>,

    /// Include thread IDs in log output.
    pub thread_ids: bool,

    /// Include source file and line number in log output.
    pub file_location: bool,
}

// =============================================================================
// Plugins
// =============================================================================

/// Plugin loading configuration (`[plugins]` section).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PluginSettings {
    /// Names of plugins the load driver skips.
    pub disabled: Vec<String>,

    /// Per-plugin configuration sections (`[plugins.config.<name>]`),
    /// delivered to each plugin's `prepare` hook.
    pub config: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EnsembleConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert!(config.plugins.disabled.is_empty());
        assert!(config.plugins.config.is_empty());
    }

    #[test]
    fn level_names_round_trip() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{level}\""));
            let back: LogLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(back, level);
        }
    }
}
