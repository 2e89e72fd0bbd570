//! # Ensemble Runtime
//!
//! Host-side runtime for the Ensemble plugin engine: configuration
//! loading, logging setup, the link-time plugin catalog, and the
//! [`Runtime`] type that assembles them around an
//! [`ensemble_core::PluginManager`].
//!
//! # Modules
//!
//! - [`runtime`]: runtime assembly and lifecycle
//! - [`catalog`]: link-time plugin registration via distributed slices
//! - [`config`]: layered figment-based configuration
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: runtime error type
//!
//! # Feature Flags
//!
//! | Feature       | Default | Effect                          |
//! |---------------|---------|---------------------------------|
//! | `toml-config` | no      | TOML configuration file support |
//! | `yaml-config` | no      | YAML configuration file support |
//! | `json-log`    | no      | JSON log output format          |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ensemble_runtime::prelude::*;
//!
//! let runtime = Runtime::new();
//! runtime.load_plugins();
//! // ... host runs ...
//! runtime.shutdown();
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use catalog::{BuildContext, BuildFn, LoadReport, PLUGINS, PluginCatalog, PluginDef};
pub use config::{ConfigError, ConfigLoader, ConfigResult, EnsembleConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{Runtime, RuntimeBuilder};

/// Re-exported so plugin crates can log through the host's subscriber
/// without declaring their own tracing dependency.
pub use tracing;

// Used by the register_plugin! expansion. Not part of the public API.
#[doc(hidden)]
pub use linkme as __linkme;

/// Common imports for plugin authors and hosts.
pub mod prelude {
    pub use crate::catalog::{BuildContext, PluginCatalog};
    pub use crate::register_plugin;
    pub use crate::runtime::Runtime;
    pub use ensemble_core::{
        BoxError, HostObserver, Listeners, Plugin, PluginCell, PluginManager, PluginResult,
        PrepareContext,
    };
    pub use tracing::{debug, error, info, trace, warn};
}
