//! Listener bindings and the per-plugin listener table.
//!
//! A plugin declares which dependency lifecycle events it wants to observe
//! by populating a [`Listeners`] builder from
//! [`Plugin::listeners`](crate::plugin::Plugin::listeners). The builder is
//! compiled into a [`ListenerTable`] when the plugin is erased into a
//! [`PluginCell`](crate::plugin::PluginCell); compilation checks every named
//! target against the plugin's declared dependency lists and fails with
//! [`PluginError::UndeclaredTarget`] otherwise.
//!
//! Delivery rules:
//!
//! - bindings fire in declaration order,
//! - for one event, bindings naming the target fire before wildcard
//!   bindings,
//! - wildcard bindings observe availability only and receive the name of
//!   the dependency the event is about.

use std::collections::HashMap;
use std::marker::PhantomData;

use tracing::trace;

use crate::error::{PluginError, PluginResult};
use crate::plugin::{Plugin, PluginDescriptor};

// =============================================================================
// Binding keys
// =============================================================================

/// Lifecycle phase a binding observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The target finished `prepare` and became available.
    Available,
    /// The target is about to be torn down and removed.
    Shutdown,
}

/// What a binding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A single dependency, by name.
    Named(&'static str),
    /// Every declared dependency. Availability phase only.
    Wildcard,
}

// =============================================================================
// Builder
// =============================================================================

/// Type-erased listener callback. Receives the owning instance and the name
/// of the dependency the notification is about.
pub(crate) type ListenerFn = Box<dyn FnMut(&mut dyn Plugin, &str) + Send>;

struct RawBinding {
    target: Target,
    phase: Phase,
    callback: ListenerFn,
}

/// Typed binding builder handed to
/// [`Plugin::listeners`](crate::plugin::Plugin::listeners).
///
/// Each method records one binding; nothing is invoked at declaration time.
pub struct Listeners<P> {
    bindings: Vec<RawBinding>,
    _owner: PhantomData<fn(P)>,
}

impl<P: Plugin> Listeners<P> {
    pub(crate) fn new() -> Self {
        Self {
            bindings: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// Fires when `target` becomes available.
    ///
    /// `target` must appear in the plugin's `requires` or `optional` list.
    pub fn on_available(
        &mut self,
        target: &'static str,
        mut callback: impl FnMut(&mut P) + Send + 'static,
    ) {
        self.push(
            Target::Named(target),
            Phase::Available,
            Box::new(move |plugin, _| {
                if let Some(plugin) = plugin.downcast_mut::<P>() {
                    callback(plugin);
                }
            }),
        );
    }

    /// Fires once per declared dependency as each becomes available. The
    /// callback receives the dependency's name.
    pub fn on_any_available(&mut self, mut callback: impl FnMut(&mut P, &str) + Send + 'static) {
        self.push(
            Target::Wildcard,
            Phase::Available,
            Box::new(move |plugin, name| {
                if let Some(plugin) = plugin.downcast_mut::<P>() {
                    callback(plugin, name);
                }
            }),
        );
    }

    /// Fires just before `target` is torn down.
    ///
    /// `target` must appear in the plugin's `requires` or `optional` list.
    pub fn on_shutdown(
        &mut self,
        target: &'static str,
        mut callback: impl FnMut(&mut P) + Send + 'static,
    ) {
        self.push(
            Target::Named(target),
            Phase::Shutdown,
            Box::new(move |plugin, _| {
                if let Some(plugin) = plugin.downcast_mut::<P>() {
                    callback(plugin);
                }
            }),
        );
    }

    fn push(&mut self, target: Target, phase: Phase, callback: ListenerFn) {
        self.bindings.push(RawBinding {
            target,
            phase,
            callback,
        });
    }
}

// =============================================================================
// Compiled table
// =============================================================================

/// Compiled listener table of one plugin instance: `(target, phase)` to the
/// bindings declared for it, in declaration order.
pub struct ListenerTable {
    bindings: HashMap<(Target, Phase), Vec<ListenerFn>>,
}

impl ListenerTable {
    /// Compiles raw bindings, enforcing that every named target is declared
    /// in the owner's dependency lists. Wildcard bindings are exempt; their
    /// scope *is* the declared list.
    pub(crate) fn compile<P: Plugin>(
        raw: Listeners<P>,
        descriptor: &PluginDescriptor,
    ) -> PluginResult<Self> {
        let mut bindings: HashMap<(Target, Phase), Vec<ListenerFn>> = HashMap::new();
        for binding in raw.bindings {
            if let Target::Named(target) = binding.target
                && !descriptor.declares(target)
            {
                return Err(PluginError::UndeclaredTarget {
                    plugin: descriptor.name.to_string(),
                    target: target.to_string(),
                });
            }
            bindings
                .entry((binding.target, binding.phase))
                .or_default()
                .push(binding.callback);
        }
        Ok(Self { bindings })
    }

    /// Total number of compiled bindings.
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    /// True when the table holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Delivers one lifecycle notification to `instance`: bindings naming
    /// `target` first, then (for availability) wildcard bindings.
    pub(crate) fn notify(&mut self, instance: &mut dyn Plugin, phase: Phase, target: &'static str) {
        trace!(
            plugin = %instance.name(),
            target,
            ?phase,
            "Delivering lifecycle notification"
        );
        if let Some(callbacks) = self.bindings.get_mut(&(Target::Named(target), phase)) {
            for callback in callbacks.iter_mut() {
                callback(instance, target);
            }
        }
        if phase == Phase::Available
            && let Some(callbacks) = self.bindings.get_mut(&(Target::Wildcard, phase))
        {
            for callback in callbacks.iter_mut() {
                callback(instance, target);
            }
        }
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerTable")
            .field("binding_count", &self.len())
            .finish()
    }
}
