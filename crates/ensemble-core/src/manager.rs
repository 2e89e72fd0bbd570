//! Plugin lifecycle management and dependency-ordered notification.
//!
//! [`PluginManager`] owns the plugin registry, the availability state of
//! every plugin, and the dependency graph. It drives the full lifecycle:
//!
//! 1. [`register`](PluginManager::register) stores a validated cell and
//!    records its dependency edges. Nothing runs yet.
//! 2. [`activate`](PluginManager::activate) runs the plugin's `prepare`
//!    hook, marks it available, and delivers availability notifications in
//!    three passes: forward broadcast to available dependents, host
//!    observer, then a catch-up pass over the plugin's own dependencies
//!    that became available earlier.
//! 3. [`shutdown`](PluginManager::shutdown) notifies available dependents
//!    while the plugin can still be used, runs its `teardown` hook, and
//!    removes it from the registry and the graph.
//!
//! The catch-up pass is what makes registration and activation order
//! irrelevant: whichever side of a dependency edge activates last, the
//! notification is delivered exactly once. Dependency cycles need no
//! special handling for the same reason; there is no topological ordering
//! anywhere in the engine.
//!
//! Notification targets are snapshotted before any callback runs, and no
//! engine lock is held while plugin code executes, so callbacks are free to
//! register, activate, or look up other plugins. A callback that re-enters
//! the lifecycle of the plugin currently being serviced is rejected (or the
//! notification dropped) with a warning instead of deadlocking.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = PluginManager::default();
//! manager.install(StatusBar::new())?;
//! manager.install(Transcoder::new())?;
//! manager.activate("status-bar")?;
//! manager.activate("transcoder")?;
//!
//! manager.with_plugin("transcoder", |plugin| {
//!     if let Some(transcoder) = plugin.downcast_mut::<Transcoder>() {
//!         transcoder.enqueue("song.flac");
//!     }
//! });
//!
//! manager.shutdown_all();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{PluginError, PluginResult};
use crate::graph::DependencyGraph;
use crate::listener::{ListenerTable, Phase};
use crate::plugin::{Plugin, PluginCell, PluginDescriptor, PluginState, PrepareContext};

// =============================================================================
// Host observer
// =============================================================================

/// Host-application hooks for raw lifecycle events.
///
/// The host registers at most one observer to drive concerns that sit
/// outside the plugin set, such as reflecting readiness in a status line.
/// Observer hooks fire for every plugin, independently of any plugin's own
/// listener bindings.
pub trait HostObserver: Send + Sync {
    /// A plugin finished `prepare` and became available.
    fn plugin_ready(&self, name: &str) {
        let _ = name;
    }

    /// [`shutdown_all`](PluginManager::shutdown_all) finished tearing down
    /// every plugin.
    fn shutdown_complete(&self) {}
}

// =============================================================================
// Registry entries
// =============================================================================

/// Instance plus listener table, locked together so a notification gets
/// `&mut` access to both at once.
struct CellInner {
    instance: Box<dyn Plugin>,
    listeners: ListenerTable,
}

impl CellInner {
    fn notify(&mut self, phase: Phase, target: &'static str) {
        let CellInner {
            instance,
            listeners,
        } = self;
        listeners.notify(instance.as_mut(), phase, target);
    }
}

struct PluginEntry {
    descriptor: PluginDescriptor,
    state: PluginState,
    cell: Arc<Mutex<CellInner>>,
}

/// Snapshot of one dependent taken before a notification pass.
type DependentRef = (&'static str, Arc<Mutex<CellInner>>);

// =============================================================================
// Manager
// =============================================================================

/// Central owner of the plugin registry, availability state, and dependency
/// graph.
///
/// All methods take `&self`; interior state sits behind [`RwLock`]s so the
/// manager can be shared as `Arc<PluginManager>` between the host shell and
/// plugins that hold a `Weak` handle back to it. Callbacks always run with
/// no engine lock held.
pub struct PluginManager {
    /// Registration order is preserved; `shutdown_all` walks it in reverse.
    plugins: RwLock<Vec<PluginEntry>>,
    graph: RwLock<DependencyGraph>,
    /// Per-plugin configuration sections, delivered through
    /// [`PrepareContext`].
    plugin_configs: HashMap<String, Value>,
    observer: RwLock<Option<Arc<dyn HostObserver>>>,
}

impl PluginManager {
    /// Creates a manager with per-plugin configuration sections, keyed by
    /// plugin name.
    pub fn new(plugin_configs: HashMap<String, Value>) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            graph: RwLock::new(DependencyGraph::new()),
            plugin_configs,
            observer: RwLock::new(None),
        }
    }

    /// Installs the host observer, replacing any previous one.
    pub fn set_observer(&self, observer: Arc<dyn HostObserver>) {
        *self.observer.write() = Some(observer);
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers a validated plugin cell.
    ///
    /// The plugin is stored in the `Constructed` state and its dependency
    /// edges are recorded; `prepare` does not run until
    /// [`activate`](Self::activate). Declared dependencies do not need to
    /// be registered, now or ever.
    ///
    /// # Errors
    ///
    /// [`PluginError::Duplicate`] if a plugin with the same name is already
    /// registered.
    pub fn register(&self, cell: PluginCell) -> PluginResult<()> {
        let PluginCell {
            descriptor,
            instance,
            listeners,
        } = cell;
        {
            let mut plugins = self.plugins.write();
            if plugins.iter().any(|e| e.descriptor.name == descriptor.name) {
                return Err(PluginError::Duplicate(descriptor.name.to_string()));
            }
            self.graph.write().insert(&descriptor);
            plugins.push(PluginEntry {
                descriptor,
                state: PluginState::Constructed,
                cell: Arc::new(Mutex::new(CellInner {
                    instance,
                    listeners,
                })),
            });
        }
        info!(plugin = %descriptor.name, "Plugin registered");
        Ok(())
    }

    /// Builds a cell from `plugin` and registers it.
    ///
    /// # Errors
    ///
    /// Everything [`PluginCell::new`] and [`register`](Self::register) can
    /// return; a validation failure leaves the registry untouched.
    pub fn install<P: Plugin>(&self, plugin: P) -> PluginResult<()> {
        self.register(PluginCell::new(plugin)?)
    }

    // ─── Activation ──────────────────────────────────────────────────────────

    /// Activates a registered plugin: runs `prepare`, marks the plugin
    /// available, then delivers availability notifications.
    ///
    /// Notification order: forward broadcast to already-available
    /// dependents, host observer, then the catch-up pass over this plugin's
    /// own already-available dependencies. Targets are snapshotted before
    /// the first callback runs.
    ///
    /// # Errors
    ///
    /// - [`PluginError::UnknownPlugin`] if `name` was never registered.
    /// - [`PluginError::ActivationOrder`] if the plugin is not
    ///   `Constructed`, or its lifecycle is re-entered from one of its own
    ///   callbacks.
    /// - [`PluginError::Prepare`] if the hook fails; the plugin stays
    ///   `Constructed` and activation may be retried.
    pub fn activate(&self, name: &str) -> PluginResult<()> {
        // Resolve the entry and claim its cell. The registry lock is not
        // held while prepare runs.
        let (static_name, cell, config) = {
            let plugins = self.plugins.read();
            let entry = plugins
                .iter()
                .find(|e| e.descriptor.name == name)
                .ok_or_else(|| PluginError::UnknownPlugin(name.to_string()))?;
            if entry.state != PluginState::Constructed {
                return Err(PluginError::ActivationOrder {
                    plugin: name.to_string(),
                    state: entry.state,
                });
            }
            (
                entry.descriptor.name,
                Arc::clone(&entry.cell),
                self.config_for(entry.descriptor.name),
            )
        };

        {
            let Some(mut inner) = cell.try_lock() else {
                return Err(PluginError::ActivationOrder {
                    plugin: name.to_string(),
                    state: PluginState::Constructed,
                });
            };
            let ctx = PrepareContext::new(config);
            inner
                .instance
                .prepare(&ctx)
                .map_err(|source| PluginError::Prepare {
                    plugin: name.to_string(),
                    source,
                })?;
        }

        // Mark available and snapshot both notification passes under one
        // write lock. The entry is re-checked: prepare may have re-entered
        // the manager.
        let (dependents, catch_up) = {
            let mut plugins = self.plugins.write();
            let Some(idx) = plugins.iter().position(|e| e.descriptor.name == static_name) else {
                return Err(PluginError::UnknownPlugin(name.to_string()));
            };
            if plugins[idx].state != PluginState::Constructed {
                return Err(PluginError::ActivationOrder {
                    plugin: name.to_string(),
                    state: plugins[idx].state,
                });
            }
            plugins[idx].state = PluginState::Ready;

            let graph = self.graph.read();
            let dependents = Self::available_dependents(&plugins, &graph, static_name);
            let catch_up: Vec<&'static str> = graph
                .dependencies_of(static_name)
                .union()
                .into_iter()
                .filter(|dep| {
                    plugins
                        .iter()
                        .any(|e| e.descriptor.name == *dep && e.state == PluginState::Ready)
                })
                .collect();
            (dependents, catch_up)
        };

        info!(plugin = %static_name, "Plugin ready");

        // Forward broadcast: available dependents hear about this plugin.
        for (dependent, dep_cell) in dependents {
            match dep_cell.try_lock() {
                Some(mut inner) => inner.notify(Phase::Available, static_name),
                None => warn!(
                    plugin = %dependent,
                    target = %static_name,
                    "Dependent is busy in another lifecycle call - notification dropped"
                ),
            }
        }

        if let Some(observer) = self.observer.read().clone() {
            observer.plugin_ready(static_name);
        }

        // Catch-up: this plugin hears about dependencies that were already
        // available before it arrived.
        if !catch_up.is_empty() {
            match cell.try_lock() {
                Some(mut inner) => {
                    for target in catch_up {
                        inner.notify(Phase::Available, target);
                    }
                }
                None => warn!(
                    plugin = %static_name,
                    "Plugin is busy in another lifecycle call - catch-up dropped"
                ),
            }
        }

        Ok(())
    }

    // ─── Shutdown ────────────────────────────────────────────────────────────

    /// Shuts down one plugin.
    ///
    /// Available dependents receive the shutdown notification first, while
    /// the departing plugin is still available to them. Its `teardown` hook
    /// runs afterwards, and finally the plugin is removed from the registry
    /// and its own dependency edges from the graph. Edges other plugins
    /// declared on it stay recorded.
    ///
    /// Shutting down a name that is not registered is a no-op.
    pub fn shutdown(&self, name: &str) {
        let (static_name, cell, dependents) = {
            let plugins = self.plugins.read();
            let Some(entry) = plugins.iter().find(|e| e.descriptor.name == name) else {
                debug!(plugin = %name, "Shutdown of unregistered plugin ignored");
                return;
            };
            let graph = self.graph.read();
            let dependents = Self::available_dependents(&plugins, &graph, entry.descriptor.name);
            (entry.descriptor.name, Arc::clone(&entry.cell), dependents)
        };

        for (dependent, dep_cell) in dependents {
            match dep_cell.try_lock() {
                Some(mut inner) => inner.notify(Phase::Shutdown, static_name),
                None => warn!(
                    plugin = %dependent,
                    target = %static_name,
                    "Dependent is busy in another lifecycle call - notification dropped"
                ),
            }
        }

        {
            let mut plugins = self.plugins.write();
            let Some(entry) = plugins.iter_mut().find(|e| e.descriptor.name == static_name)
            else {
                // A shutdown callback already removed this plugin.
                return;
            };
            entry.state = PluginState::ShuttingDown;
        }

        match cell.try_lock() {
            Some(mut inner) => inner.instance.teardown(),
            None => warn!(
                plugin = %static_name,
                "Plugin is busy in another lifecycle call - teardown hook skipped"
            ),
        }

        {
            let mut plugins = self.plugins.write();
            if let Some(idx) = plugins.iter().position(|e| e.descriptor.name == static_name) {
                plugins[idx].state = PluginState::Destroyed;
                plugins.remove(idx);
            }
            self.graph.write().remove(static_name);
        }
        info!(plugin = %static_name, "Plugin shut down");
    }

    /// Shuts down every plugin in reverse registration order, then fires
    /// the observer's completion hook.
    pub fn shutdown_all(&self) {
        let names: Vec<&'static str> = {
            let plugins = self.plugins.read();
            plugins.iter().rev().map(|e| e.descriptor.name).collect()
        };
        for name in names {
            self.shutdown(name);
        }
        if let Some(observer) = self.observer.read().clone() {
            observer.shutdown_complete();
        }
        info!("All plugins shut down");
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Runs `f` with mutable access to the named plugin instance.
    ///
    /// Returns `None` when the plugin is not registered, or when its cell
    /// is locked by a lifecycle call already on the stack (re-entrant
    /// lookups of the plugin currently being notified are rejected with a
    /// warning rather than deadlocking).
    pub fn with_plugin<R>(&self, name: &str, f: impl FnOnce(&mut dyn Plugin) -> R) -> Option<R> {
        let cell = {
            let plugins = self.plugins.read();
            let entry = plugins.iter().find(|e| e.descriptor.name == name)?;
            Arc::clone(&entry.cell)
        };
        let Some(mut inner) = cell.try_lock() else {
            warn!(plugin = %name, "Plugin is busy in another lifecycle call - lookup skipped");
            return None;
        };
        Some(f(inner.instance.as_mut()))
    }

    /// True when `name` is registered and `Ready`. Unregistered names are
    /// simply not available.
    pub fn is_available(&self, name: &str) -> bool {
        self.state(name) == Some(PluginState::Ready)
    }

    /// Lifecycle state of a registered plugin, `None` when unregistered.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.plugins
            .read()
            .iter()
            .find(|e| e.descriptor.name == name)
            .map(|e| e.state)
    }

    /// Names of all registered plugins, in registration order.
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.read().iter().map(|e| e.descriptor.name).collect()
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.read().len()
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    /// Snapshots the available dependents of `name`: hard dependents first,
    /// then soft, declaration order preserved, registered-but-unavailable
    /// plugins filtered out.
    fn available_dependents(
        plugins: &[PluginEntry],
        graph: &DependencyGraph,
        name: &'static str,
    ) -> Vec<DependentRef> {
        graph
            .dependents_of(name)
            .union()
            .into_iter()
            .filter_map(|dependent| {
                plugins
                    .iter()
                    .find(|e| e.descriptor.name == dependent && e.state == PluginState::Ready)
                    .map(|e| (dependent, Arc::clone(&e.cell)))
            })
            .collect()
    }

    fn config_for(&self, name: &str) -> Arc<Value> {
        Arc::new(
            self.plugin_configs
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::default())),
        )
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}
