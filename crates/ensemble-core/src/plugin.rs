//! Plugin contract and the type-erased cell the manager stores.
//!
//! A plugin is an independently loaded unit of the application. It declares
//! a unique name, the names of the plugins it depends on, and listener
//! bindings for the lifecycle events of those dependencies. The engine never
//! inspects plugin internals; everything it needs is declared up front
//! through the [`Plugin`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! struct StatusBar {
//!     line: String,
//! }
//!
//! impl Plugin for StatusBar {
//!     fn name(&self) -> &'static str {
//!         "status-bar"
//!     }
//!
//!     fn optional(&self) -> &'static [&'static str] {
//!         &["transcoder"]
//!     }
//!
//!     fn listeners(bindings: &mut Listeners<Self>) {
//!         bindings.on_available("transcoder", |bar| {
//!             bar.line = "transcoder online".into();
//!         });
//!     }
//! }
//! ```

use std::any::Any;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{BoxError, PluginResult};
use crate::listener::{ListenerTable, Listeners};

// =============================================================================
// Prepare context
// =============================================================================

/// Context passed to a plugin's [`prepare`](Plugin::prepare) hook.
///
/// Carries the plugin's own configuration section. When the host has no
/// section for this plugin the context holds an empty JSON object.
#[derive(Clone, Debug)]
pub struct PrepareContext {
    config: Arc<Value>,
}

impl PrepareContext {
    pub(crate) fn new(config: Arc<Value>) -> Self {
        Self { config }
    }

    /// Deserializes the plugin's configuration section into `T`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// #[derive(Deserialize)]
    /// struct TranscoderConfig {
    ///     bitrate: u32,
    /// }
    ///
    /// let config: TranscoderConfig = ctx.get_config()?;
    /// ```
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(self.config.as_ref())
    }

    /// Raw JSON view of the configuration section.
    pub fn raw_config(&self) -> &Value {
        &self.config
    }
}

// =============================================================================
// Plugin trait
// =============================================================================

/// Contract every plugin implements.
///
/// Only [`name`](Plugin::name) and (usually) [`prepare`](Plugin::prepare)
/// need to be written out; dependency lists default to empty and the
/// lifecycle hooks default to no-ops.
///
/// Dependency declarations are *names*, not references. A declared
/// dependency does not have to be registered, and registration order is
/// irrelevant: notifications for plugins that became available earlier are
/// caught up at activation time.
pub trait Plugin: Any + Send {
    /// Unique plugin name. Used as the key in every engine lookup.
    fn name(&self) -> &'static str;

    /// Hard dependencies this plugin wants lifecycle notifications for.
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Soft dependencies. Notification semantics are identical to
    /// [`requires`](Plugin::requires); the split only documents intent.
    fn optional(&self) -> &'static [&'static str] {
        &[]
    }

    /// Declares listener bindings for this plugin type.
    ///
    /// Called once while the plugin is erased into a [`PluginCell`].
    /// Declaring a binding never invokes it; delivery is driven entirely by
    /// the manager.
    fn listeners(bindings: &mut Listeners<Self>)
    where
        Self: Sized,
    {
        let _ = bindings;
    }

    /// One-time initialisation, run by `activate` before the plugin is
    /// marked available.
    ///
    /// On error the plugin stays registered in the `Constructed` state and
    /// activation may be retried.
    fn prepare(&mut self, ctx: &PrepareContext) -> Result<(), BoxError> {
        let _ = ctx;
        Ok(())
    }

    /// Teardown hook, run by `shutdown` after dependents have been notified.
    fn teardown(&mut self) {}
}

impl dyn Plugin {
    /// Borrows the instance as a concrete plugin type.
    pub fn downcast_ref<P: Plugin>(&self) -> Option<&P> {
        let any: &dyn Any = self;
        any.downcast_ref()
    }

    /// Mutably borrows the instance as a concrete plugin type.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// manager.with_plugin("transcoder", |plugin| {
    ///     if let Some(transcoder) = plugin.downcast_mut::<Transcoder>() {
    ///         transcoder.enqueue("song.flac");
    ///     }
    /// });
    /// ```
    pub fn downcast_mut<P: Plugin>(&mut self) -> Option<&mut P> {
        let any: &mut dyn Any = self;
        any.downcast_mut()
    }
}

// =============================================================================
// Plugin state
// =============================================================================

/// Lifecycle state of a registered plugin.
///
/// ```text
/// register()              activate()               shutdown()
///     │                       │                        │
///     ▼                       ▼                        ▼
/// Constructed ──────────► Ready ──────────► ShuttingDown ──► Destroyed
///              prepare()         dependents            teardown(),
///              succeeded         notified              entry removed
/// ```
///
/// State is owned exclusively by the manager; plugins never mutate their
/// own state. `Destroyed` is transient: the entry is removed immediately
/// after, so queries observe `None` rather than `Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Registered, dependency edges recorded, `prepare` not yet run.
    Constructed,
    /// `prepare` returned successfully; the plugin is available and its
    /// listener bindings are live.
    Ready,
    /// Shutdown notifications have been delivered; teardown is in progress.
    ShuttingDown,
    /// Torn down and about to be removed from the registry.
    Destroyed,
}

// =============================================================================
// Descriptor
// =============================================================================

/// Static identity of a plugin, read off the instance at erasure time.
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Unique plugin name.
    pub name: &'static str,
    /// Hard dependencies, in declaration order.
    pub requires: &'static [&'static str],
    /// Soft dependencies, in declaration order.
    pub optional: &'static [&'static str],
}

impl PluginDescriptor {
    /// Reads the descriptor off a live instance.
    pub fn of(plugin: &dyn Plugin) -> Self {
        Self {
            name: plugin.name(),
            requires: plugin.requires(),
            optional: plugin.optional(),
        }
    }

    /// Whether `target` appears in `requires` or `optional`.
    pub fn declares(&self, target: &str) -> bool {
        self.requires
            .iter()
            .chain(self.optional)
            .any(|dep| *dep == target)
    }

    /// `requires ∪ optional` in declaration order, de-duplicated, with
    /// `requires` first.
    pub fn dependencies(&self) -> Vec<&'static str> {
        let mut deps = Vec::with_capacity(self.requires.len() + self.optional.len());
        for dep in self.requires.iter().chain(self.optional) {
            if !deps.contains(dep) {
                deps.push(*dep);
            }
        }
        deps
    }
}

// =============================================================================
// Plugin cell
// =============================================================================

/// A validated, type-erased plugin ready for registration: the boxed
/// instance, its descriptor, and its compiled listener table.
///
/// Building the cell is the fail-fast point of the engine. Listener targets
/// are validated against the declared dependency lists here, on the
/// construction path, so a misbound plugin never reaches a manager.
pub struct PluginCell {
    pub(crate) descriptor: PluginDescriptor,
    pub(crate) instance: Box<dyn Plugin>,
    pub(crate) listeners: ListenerTable,
}

impl PluginCell {
    /// Erases `plugin`, collecting and validating its listener bindings.
    ///
    /// # Errors
    ///
    /// [`PluginError::UndeclaredTarget`](crate::error::PluginError) if a
    /// binding names a plugin outside `requires ∪ optional`.
    pub fn new<P: Plugin>(plugin: P) -> PluginResult<Self> {
        let descriptor = PluginDescriptor::of(&plugin);
        let mut bindings = Listeners::new();
        P::listeners(&mut bindings);
        let listeners = ListenerTable::compile(bindings, &descriptor)?;
        Ok(Self {
            descriptor,
            instance: Box::new(plugin),
            listeners,
        })
    }

    /// Descriptor captured at erasure time.
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

impl std::fmt::Debug for PluginCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCell")
            .field("descriptor", &self.descriptor)
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;

    struct Bare;

    impl Plugin for Bare {
        fn name(&self) -> &'static str {
            "bare"
        }
    }

    struct Bound;

    impl Plugin for Bound {
        fn name(&self) -> &'static str {
            "bound"
        }

        fn requires(&self) -> &'static [&'static str] {
            &["alpha"]
        }

        fn optional(&self) -> &'static [&'static str] {
            &["beta", "alpha"]
        }
    }

    #[test]
    fn descriptor_reads_declarations() {
        let descriptor = PluginDescriptor::of(&Bound);
        assert_eq!(descriptor.name, "bound");
        assert!(descriptor.declares("alpha"));
        assert!(descriptor.declares("beta"));
        assert!(!descriptor.declares("gamma"));
    }

    #[test]
    fn dependencies_are_deduplicated_in_declaration_order() {
        let descriptor = PluginDescriptor::of(&Bound);
        assert_eq!(descriptor.dependencies(), vec!["alpha", "beta"]);
    }

    #[test]
    fn cell_defaults_to_empty_bindings() {
        let cell = PluginCell::new(Bare).unwrap();
        assert_eq!(cell.descriptor().name, "bare");
        assert!(cell.listeners.is_empty());
    }

    #[test]
    fn downcast_round_trip() {
        let mut boxed: Box<dyn Plugin> = Box::new(Bare);
        assert!(boxed.downcast_ref::<Bare>().is_some());
        assert!(boxed.downcast_mut::<Bound>().is_none());
    }

    #[test]
    fn misbound_cell_is_rejected() {
        struct Misbound;

        impl Plugin for Misbound {
            fn name(&self) -> &'static str {
                "misbound"
            }

            fn listeners(bindings: &mut Listeners<Self>) {
                bindings.on_available("ghost", |_plugin| {});
            }
        }

        let err = PluginCell::new(Misbound).unwrap_err();
        assert!(matches!(
            err,
            PluginError::UndeclaredTarget { plugin, target }
                if plugin == "misbound" && target == "ghost"
        ));
    }

    #[test]
    fn prepare_defaults_to_ok() {
        let ctx = PrepareContext::new(std::sync::Arc::new(serde_json::json!({})));
        let mut plugin = Bare;
        assert!(plugin.prepare(&ctx).is_ok());
    }

    #[test]
    fn get_config_deserializes_section() {
        #[derive(serde::Deserialize)]
        struct Section {
            bitrate: u32,
        }

        let ctx = PrepareContext::new(std::sync::Arc::new(serde_json::json!({
            "bitrate": 320
        })));
        let section: Section = ctx.get_config().unwrap();
        assert_eq!(section.bitrate, 320);
    }
}
