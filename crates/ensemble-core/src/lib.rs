//! # Ensemble Core
//!
//! Plugin dependency-resolution and lifecycle engine.
//!
//! This layer provides:
//! - The [`Plugin`] contract: name, dependency declarations, listener
//!   bindings, and the `prepare`/`teardown` hooks
//! - [`PluginManager`], which owns the registry, availability state, and
//!   dependency graph and drives all lifecycle notifications
//! - [`Listeners`], the typed binding builder compiled into each plugin's
//!   listener table
//! - [`HostObserver`], the host application's view of raw lifecycle events
//!
//! The engine is deliberately order-free: plugins may be registered and
//! activated in any order, dependency declarations may point at plugins
//! that never arrive, and cycles are serviced like any other edge. A
//! catch-up pass at activation time guarantees that every availability
//! notification is delivered exactly once, whichever side of the edge
//! activated last.

pub mod error;
pub mod graph;
pub mod listener;
pub mod manager;
pub mod plugin;

pub use error::{BoxError, PluginError, PluginResult};
pub use graph::{DependencyGraph, Edges};
pub use listener::{Listeners, Phase, Target};
pub use manager::{HostObserver, PluginManager};
pub use plugin::{Plugin, PluginCell, PluginDescriptor, PluginState, PrepareContext};
