//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use ensemble_core::PluginError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A plugin engine operation failed.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
