//! Logging initialization built on the tracing ecosystem.
//!
//! The runtime configures a global [`tracing_subscriber`] from
//! [`LoggingConfig`]. Output destination, format, and per-module filter
//! directives all come from configuration; the `RUST_LOG` environment
//! variable overrides the configured base level when set.
//!
//! # Feature Flags
//!
//! - `json-log`: enables the JSON output format
//!
//! # Example
//!
//! ```rust,ignore
//! use ensemble_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .level(tracing::Level::DEBUG)
//!     .directive("ensemble_core=trace")
//!     .try_init()?;
//! ```

use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::schema::{LogFormat, LogOutput, LoggingConfig};

/// Initializes global logging from a [`LoggingConfig`] section.
///
/// Failure to install the subscriber is reported on stderr rather than
/// propagated; a host that cannot log is still expected to run.
pub fn init_from_config(config: &LoggingConfig) {
    if let Err(e) = LoggingBuilder::from_config(config).try_init() {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
}

/// Builder for the global tracing subscriber.
pub struct LoggingBuilder {
    /// Extra filter directives, e.g. `"ensemble_core=debug"`.
    directives: Vec<String>,
    /// Base level when `RUST_LOG` is not set.
    level: Option<tracing::Level>,
    /// Event formatting style.
    format: LogFormat,
    /// Where formatted events are written.
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    with_file: bool,
    with_line_number: bool,
    /// Destination when `output` is [`LogOutput::File`].
    file_path: Option<PathBuf>,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder with compact stdout output at the default level.
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            level: None,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
            file_path: None,
        }
    }

    /// Creates a builder from a configuration section.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new();
        builder.level = Some(config.level.to_tracing_level());
        builder.format = config.format;
        builder.output = config.output;
        builder.with_thread_ids = config.thread_ids;
        builder.with_file = config.file_location;
        builder.with_line_number = config.file_location;
        builder.file_path = config.file_path.clone();
        for (module, level) in &config.filters {
            builder.directives.push(format!("{module}={}", level.as_str()));
        }
        builder
    }

    /// Sets the base log level.
    pub fn level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive such as `"figment=warn"`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Sets the event format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the output destination.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the log file path used with [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Controls whether the event's module target is printed.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Controls whether thread ids are printed.
    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Controls whether source file and line number are printed.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self.with_line_number = enabled;
        self
    }

    /// Builds the `EnvFilter` from `RUST_LOG`, the configured level, and
    /// any extra directives.
    fn build_filter(
        &self,
    ) -> Result<EnvFilter, Box<dyn std::error::Error + Send + Sync>> {
        let mut filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                let level = self.level.unwrap_or(tracing::Level::INFO);
                EnvFilter::new(level.to_string().to_lowercase())
            }
        };
        for directive in &self.directives {
            filter = filter.add_directive(directive.parse()?);
        }
        Ok(filter)
    }

    /// Installs the global subscriber.
    ///
    /// Fails if a global subscriber is already set or a filter directive
    /// does not parse.
    pub fn try_init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = self.build_filter()?;

        macro_rules! configure_layer {
            ($layer:expr) => {
                $layer
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids)
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
            };
        }

        macro_rules! init_with_writer {
            ($writer:expr) => {{
                let layer = configure_layer!(fmt::layer().with_writer($writer));
                match self.format {
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(filter)
                        .with(layer.compact())
                        .try_init()?,
                    LogFormat::Full => tracing_subscriber::registry()
                        .with(filter)
                        .with(layer)
                        .try_init()?,
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(filter)
                        .with(layer.pretty())
                        .try_init()?,
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => tracing_subscriber::registry()
                        .with(filter)
                        .with(layer.json())
                        .try_init()?,
                    #[cfg(not(feature = "json-log"))]
                    LogFormat::Json => {
                        eprintln!(
                            "Warning: JSON log format requires the json-log feature, using full format"
                        );
                        tracing_subscriber::registry()
                            .with(filter)
                            .with(layer)
                            .try_init()?
                    }
                }
            }};
        }

        match self.output {
            LogOutput::Stdout => init_with_writer!(std::io::stdout),
            LogOutput::Stderr => init_with_writer!(std::io::stderr),
            LogOutput::File => {
                let path = self
                    .file_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("ensemble.log"));
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                match path.file_name() {
                    Some(file_name) => {
                        let appender = tracing_appender::rolling::never(dir, file_name);
                        init_with_writer!(appender)
                    }
                    None => {
                        eprintln!(
                            "Warning: invalid log file path {:?}, using stdout",
                            path
                        );
                        init_with_writer!(std::io::stdout)
                    }
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn builder_defaults_to_compact_stdout() {
        let builder = LoggingBuilder::new();
        assert_eq!(builder.format, LogFormat::Compact);
        assert_eq!(builder.output, LogOutput::Stdout);
        assert!(builder.with_target);
        assert!(builder.directives.is_empty());
    }

    #[test]
    fn from_config_maps_every_field() {
        let mut config = LoggingConfig::default();
        config.level = LogLevel::Debug;
        config.format = LogFormat::Pretty;
        config.output = LogOutput::Stderr;
        config.thread_ids = true;
        config.file_location = true;
        config.filters.insert("figment".to_string(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, Some(tracing::Level::DEBUG));
        assert_eq!(builder.format, LogFormat::Pretty);
        assert_eq!(builder.output, LogOutput::Stderr);
        assert!(builder.with_thread_ids);
        assert!(builder.with_file);
        assert!(builder.with_line_number);
        assert_eq!(builder.directives, vec!["figment=warn".to_string()]);
    }

    #[test]
    fn filter_accepts_module_directives() {
        let builder = LoggingBuilder::new()
            .level(tracing::Level::INFO)
            .directive("ensemble_core=trace");
        assert!(builder.build_filter().is_ok());
    }

    #[test]
    fn malformed_directive_is_an_error() {
        let builder = LoggingBuilder::new().directive("not a directive!!");
        assert!(builder.build_filter().is_err());
    }
}
