//! Link-time plugin catalog.
//!
//! Plugins announce themselves with [`register_plugin!`], which places a
//! [`PluginDef`] into a [linkme](https://docs.rs/linkme) distributed slice.
//! Any crate linked into the final binary contributes entries without a
//! central registration list; the runtime collects them through
//! [`PluginCatalog::linked`] and drives registration and activation in one
//! pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use ensemble_runtime::register_plugin;
//! use ensemble_core::{Plugin, PluginCell};
//!
//! struct Transcoder;
//!
//! impl Plugin for Transcoder {
//!     fn name(&self) -> &'static str {
//!         "transcoder"
//!     }
//! }
//!
//! register_plugin!(TRANSCODER, "transcoder", |_ctx| {
//!     PluginCell::new(Transcoder)
//! });
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use linkme::distributed_slice;
use tracing::{error, info, warn};

use ensemble_core::{PluginCell, PluginError, PluginManager, PluginResult};

/// Distributed slice collecting every [`PluginDef`] linked into the binary.
///
/// Populate it with [`register_plugin!`]; iterate it through
/// [`PluginCatalog::linked`].
#[distributed_slice]
pub static PLUGINS: [PluginDef];

/// Context handed to plugin build functions.
///
/// Grants access to the manager so a plugin can keep a weak back-reference
/// to its host, for example via `Arc::downgrade(ctx.manager())`.
pub struct BuildContext<'a> {
    manager: &'a Arc<PluginManager>,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(manager: &'a Arc<PluginManager>) -> Self {
        Self { manager }
    }

    /// The manager the plugin is being built for.
    pub fn manager(&self) -> &Arc<PluginManager> {
        self.manager
    }
}

/// Constructor signature for catalog entries.
pub type BuildFn = fn(&BuildContext<'_>) -> PluginResult<PluginCell>;

/// A linkable plugin definition: a stable name plus a constructor.
pub struct PluginDef {
    /// Name the plugin will register under. Must match what the built
    /// instance reports from `Plugin::name`.
    pub name: &'static str,
    /// Builds a fresh cell for registration.
    pub build: BuildFn,
}

/// Registers a plugin definition in the link-time catalog.
///
/// Takes the static's identifier, the plugin name, and a build function
/// of type [`BuildFn`].
#[macro_export]
macro_rules! register_plugin {
    ($ident:ident, $name:expr, $build:expr) => {
        #[$crate::__linkme::distributed_slice($crate::catalog::PLUGINS)]
        #[linkme(crate = $crate::__linkme)]
        static $ident: $crate::catalog::PluginDef = $crate::catalog::PluginDef {
            name: $name,
            build: $build,
        };
    };
}

/// An ordered collection of plugin definitions ready to load.
///
/// Usually built from the distributed slice with [`PluginCatalog::linked`];
/// tests and embedders can assemble one by hand with
/// [`PluginCatalog::empty`] and [`PluginCatalog::with`].
pub struct PluginCatalog {
    defs: Vec<&'static PluginDef>,
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::linked()
    }
}

impl PluginCatalog {
    /// Collects every definition linked into the binary.
    pub fn linked() -> Self {
        Self {
            defs: PLUGINS.iter().collect(),
        }
    }

    /// An empty catalog.
    pub fn empty() -> Self {
        Self { defs: Vec::new() }
    }

    /// Appends a definition.
    pub fn with(mut self, def: &'static PluginDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Number of definitions in the catalog.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the catalog holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Names of all definitions, in catalog order.
    pub fn names(&self) -> Vec<&'static str> {
        self.defs.iter().map(|def| def.name).collect()
    }

    /// Builds, registers, and activates every non-disabled definition.
    ///
    /// A failing entry is recorded in the report and does not stop the
    /// remaining entries from loading.
    pub fn load(&self, manager: &Arc<PluginManager>, disabled: &HashSet<String>) -> LoadReport {
        let mut report = LoadReport::default();
        for def in &self.defs {
            if disabled.contains(def.name) {
                info!(plugin = def.name, "Plugin disabled by configuration, skipping");
                report.skipped += 1;
                continue;
            }
            match Self::load_one(def, manager) {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    error!(plugin = def.name, error = %e, "Failed to load plugin");
                    report.failures.push((def.name, e));
                }
            }
        }
        report
    }

    fn load_one(def: &PluginDef, manager: &Arc<PluginManager>) -> PluginResult<()> {
        let ctx = BuildContext::new(manager);
        let cell = (def.build)(&ctx)?;
        let name = cell.descriptor().name;
        if name != def.name {
            warn!(
                catalog_name = def.name,
                instance_name = name,
                "Plugin name differs between catalog entry and built instance"
            );
        }
        manager.register(cell)?;
        manager.activate(name)?;
        Ok(())
    }
}

/// Outcome of a [`PluginCatalog::load`] pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Definitions built, registered, and activated.
    pub loaded: usize,
    /// Definitions skipped because configuration disabled them.
    pub skipped: usize,
    /// Definitions that failed, with the error each produced.
    pub failures: Vec<(&'static str, PluginError)>,
}

impl LoadReport {
    /// True when no definition failed to load.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::{Listeners, Plugin};

    struct Beacon;

    impl Plugin for Beacon {
        fn name(&self) -> &'static str {
            "beacon"
        }
    }

    fn build_beacon(_ctx: &BuildContext<'_>) -> PluginResult<PluginCell> {
        PluginCell::new(Beacon)
    }

    struct Misbound;

    impl Plugin for Misbound {
        fn name(&self) -> &'static str {
            "misbound"
        }

        fn listeners(bindings: &mut Listeners<Self>) {
            bindings.on_available("ghost", |_plugin| {});
        }
    }

    fn build_misbound(_ctx: &BuildContext<'_>) -> PluginResult<PluginCell> {
        PluginCell::new(Misbound)
    }

    static BEACON: PluginDef = PluginDef {
        name: "beacon",
        build: build_beacon,
    };

    static MISBOUND: PluginDef = PluginDef {
        name: "misbound",
        build: build_misbound,
    };

    #[test]
    fn load_registers_and_activates_entries() {
        let manager = Arc::new(PluginManager::default());
        let catalog = PluginCatalog::empty().with(&BEACON);

        let report = catalog.load(&manager, &HashSet::new());

        assert_eq!(report.loaded, 1);
        assert!(report.is_clean());
        assert!(manager.is_available("beacon"));
    }

    #[test]
    fn disabled_entries_are_skipped_entirely() {
        let manager = Arc::new(PluginManager::default());
        let catalog = PluginCatalog::empty().with(&BEACON);
        let disabled: HashSet<String> = ["beacon".to_string()].into();

        let report = catalog.load(&manager, &disabled);

        assert_eq!(report.loaded, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(manager.plugin_count(), 0);
    }

    #[test]
    fn one_failing_entry_does_not_block_the_rest() {
        let manager = Arc::new(PluginManager::default());
        let catalog = PluginCatalog::empty().with(&MISBOUND).with(&BEACON);

        let report = catalog.load(&manager, &HashSet::new());

        assert_eq!(report.loaded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "misbound");
        assert!(matches!(
            report.failures[0].1,
            PluginError::UndeclaredTarget { .. }
        ));
        assert!(manager.is_available("beacon"));
    }

    #[test]
    fn duplicate_catalog_entries_fail_on_second_registration() {
        let manager = Arc::new(PluginManager::default());
        let catalog = PluginCatalog::empty().with(&BEACON).with(&BEACON);

        let report = catalog.load(&manager, &HashSet::new());

        assert_eq!(report.loaded, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].1, PluginError::Duplicate(_)));
    }

    #[test]
    fn names_reflect_catalog_order() {
        let catalog = PluginCatalog::empty().with(&MISBOUND).with(&BEACON);
        assert_eq!(catalog.names(), vec!["misbound", "beacon"]);
    }
}
