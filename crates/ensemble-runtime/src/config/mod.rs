//! Configuration system for the Ensemble runtime.
//!
//! This module provides a layered configuration system built on
//! [figment](https://docs.rs/figment):
//!
//! - **Schema**: typed configuration structures ([`EnsembleConfig`])
//! - **Loader**: multi-source loading with priority ([`ConfigLoader`])
//! - **Validation**: cross-field checks after extraction
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ensemble_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_current_dir()
//!     .with_env()
//!     .load()?;
//!
//! println!("Log level: {}", config.logging.level);
//! ```
//!
//! # Configuration File Example
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "compact"
//! output = "stdout"
//!
//! [plugins]
//! disabled = ["metadata-editor"]
//!
//! [plugins.config.transcoder]
//! bitrate = 256
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    EnsembleConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PluginSettings,
};
pub use validation::validate_config;
