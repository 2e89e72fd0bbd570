//! Runtime assembly and lifecycle.
//!
//! [`Runtime`] wires the pieces together: it loads configuration,
//! initializes logging, constructs the [`PluginManager`], and drives the
//! link-time [`PluginCatalog`] through registration and activation.
//!
//! # Lifecycle
//!
//! ```text
//! Runtime::new / builder().build()
//!     |- ConfigLoader::load          (files, env, overrides)
//!     |- logging::init_from_config
//!     |- PluginManager::new          (per-plugin config sections)
//!     '- PluginCatalog::linked       (distributed slice)
//!
//! runtime.load_plugins()             register + activate each entry
//! ... host runs ...
//! runtime.shutdown()                 reverse-order shutdown_all
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ensemble_runtime::runtime::Runtime;
//!
//! let runtime = Runtime::new();
//! let report = runtime.load_plugins();
//! if !report.is_clean() {
//!     eprintln!("{} plugin(s) failed to load", report.failures.len());
//! }
//! // ... hand runtime.manager() to the host shell ...
//! runtime.shutdown();
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use ensemble_core::{HostObserver, PluginManager};

use crate::catalog::{LoadReport, PluginCatalog};
use crate::config::{ConfigLoader, EnsembleConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// The assembled plugin host runtime.
pub struct Runtime {
    config: EnsembleConfig,
    manager: Arc<PluginManager>,
    catalog: PluginCatalog,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a runtime from configuration found in the default locations.
    ///
    /// Configuration errors are reported on stderr and replaced with
    /// defaults so the host still comes up.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: failed to load configuration: {e}, using defaults");
            EnsembleConfig::default()
        });
        Self::from_config(config)
    }

    /// Creates a runtime from an already-loaded configuration.
    pub fn from_config(config: EnsembleConfig) -> Self {
        logging::init_from_config(&config.logging);

        let manager = Arc::new(PluginManager::new(config.plugins.config.clone()));
        let catalog = PluginCatalog::linked();

        info!(
            catalog = catalog.len(),
            disabled = config.plugins.disabled.len(),
            "Runtime initialized"
        );

        Self {
            config,
            manager,
            catalog,
        }
    }

    /// Starts building a customized runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// The plugin manager backing this runtime.
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// The effective configuration.
    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Registers and activates every catalog entry not disabled by
    /// configuration.
    pub fn load_plugins(&self) -> LoadReport {
        let disabled: HashSet<String> = self.config.plugins.disabled.iter().cloned().collect();
        let report = self.catalog.load(&self.manager, &disabled);

        if !report.is_clean() {
            warn!(
                failed = report.failures.len(),
                "Some plugins failed to load"
            );
        }
        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            "Plugin load pass complete"
        );
        report
    }

    /// Shuts down every plugin in reverse registration order.
    pub fn shutdown(&self) {
        self.manager.shutdown_all();
    }
}

/// Builder for a [`Runtime`] with explicit configuration, catalog, or
/// observer.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::builder()
///     .config_file("./ensemble.toml")
///     .observer(Arc::new(ShellObserver::default()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    config: Option<EnsembleConfig>,
    config_path: Option<PathBuf>,
    catalog: Option<PluginCatalog>,
    observer: Option<Arc<dyn HostObserver>>,
}

impl RuntimeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit configuration, skipping file and env loading.
    pub fn config(mut self, config: EnsembleConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads configuration from a specific file.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Replaces the link-time catalog, e.g. with a hand-assembled one.
    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Installs a host observer before any plugin loads.
    pub fn observer(mut self, observer: Arc<dyn HostObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Resolves configuration and assembles the runtime.
    pub fn build(self) -> RuntimeResult<Runtime> {
        let config = if let Some(config) = self.config {
            config
        } else if let Some(path) = self.config_path {
            ConfigLoader::new().file(path).load()?
        } else {
            ConfigLoader::new().load()?
        };

        let mut runtime = Runtime::from_config(config);
        if let Some(catalog) = self.catalog {
            runtime.catalog = catalog;
        }
        if let Some(observer) = self.observer {
            runtime.manager.set_observer(observer);
        }
        Ok(runtime)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use ensemble_core::{Plugin, PluginCell, PluginResult};

    use crate::catalog::{BuildContext, PluginDef};
    use crate::config::ConfigError;
    use crate::error::RuntimeError;

    struct Beacon;

    impl Plugin for Beacon {
        fn name(&self) -> &'static str {
            "beacon"
        }
    }

    fn build_beacon(_ctx: &BuildContext<'_>) -> PluginResult<PluginCell> {
        PluginCell::new(Beacon)
    }

    static BEACON: PluginDef = PluginDef {
        name: "beacon",
        build: build_beacon,
    };

    #[derive(Default)]
    struct Shell {
        ready: Mutex<Vec<String>>,
        completed: AtomicBool,
    }

    impl HostObserver for Shell {
        fn plugin_ready(&self, name: &str) {
            self.ready.lock().unwrap().push(name.to_string());
        }

        fn shutdown_complete(&self) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn from_config_starts_with_an_empty_manager() {
        let runtime = Runtime::from_config(EnsembleConfig::default());
        assert_eq!(runtime.manager().plugin_count(), 0);
    }

    #[test]
    fn builder_accepts_an_explicit_config() {
        let mut config = EnsembleConfig::default();
        config.plugins.disabled.push("beacon".to_string());

        let runtime = Runtime::builder().config(config).build().unwrap();
        assert_eq!(runtime.config().plugins.disabled, vec!["beacon"]);
    }

    #[test]
    fn builder_rejects_a_missing_config_file() {
        let result = Runtime::builder()
            .config_file("/nonexistent/ensemble.toml")
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::FileNotFound(_)))
        ));
    }

    #[test]
    fn load_plugins_drives_the_catalog_and_observer() {
        let observer = Arc::new(Shell::default());
        let runtime = Runtime::builder()
            .config(EnsembleConfig::default())
            .catalog(PluginCatalog::empty().with(&BEACON))
            .observer(observer.clone())
            .build()
            .unwrap();

        let report = runtime.load_plugins();

        assert_eq!(report.loaded, 1);
        assert!(runtime.manager().is_available("beacon"));
        assert_eq!(*observer.ready.lock().unwrap(), vec!["beacon"]);
    }

    #[test]
    fn disabled_plugins_never_load() {
        let mut config = EnsembleConfig::default();
        config.plugins.disabled.push("beacon".to_string());

        let runtime = Runtime::builder()
            .config(config)
            .catalog(PluginCatalog::empty().with(&BEACON))
            .build()
            .unwrap();

        let report = runtime.load_plugins();

        assert_eq!(report.loaded, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(runtime.manager().plugin_count(), 0);
    }

    #[test]
    fn shutdown_empties_the_manager_and_notifies() {
        let observer = Arc::new(Shell::default());
        let runtime = Runtime::builder()
            .config(EnsembleConfig::default())
            .catalog(PluginCatalog::empty().with(&BEACON))
            .observer(observer.clone())
            .build()
            .unwrap();

        runtime.load_plugins();
        runtime.shutdown();

        assert_eq!(runtime.manager().plugin_count(), 0);
        assert!(observer.completed.load(Ordering::SeqCst));
    }
}
