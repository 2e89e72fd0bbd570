//! # Ensemble
//!
//! A plugin dependency-resolution and lifecycle engine. Plugins declare
//! which other plugins they depend on and bind listeners to those names;
//! the manager resolves the declarations into a dependency graph and
//! broadcasts availability and shutdown through it, in whatever order the
//! plugins happen to come up. No topological sort, no startup ordering
//! contract, and dependency cycles are handled by construction.
//!
//! # Architecture
//!
//! ```text
//! +------------------------------ host binary ------------------------------+
//! |                                                                         |
//! |  Runtime          configuration, logging, link-time plugin catalog      |
//! |     |                                                                   |
//! |     v                                                                   |
//! |  PluginManager    registration, activation, lifecycle broadcast         |
//! |     |       |                                                           |
//! |     v       v                                                           |
//! |  plugins    DependencyGraph   (dependents <-> dependencies)             |
//! |                                                                         |
//! +-------------------------------------------------------------------------+
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ensemble::prelude::*;
//!
//! struct StatusBar {
//!     message: String,
//! }
//!
//! impl Plugin for StatusBar {
//!     fn name(&self) -> &'static str {
//!         "status-bar"
//!     }
//! }
//!
//! struct MenuBar {
//!     status_online: bool,
//! }
//!
//! impl Plugin for MenuBar {
//!     fn name(&self) -> &'static str {
//!         "menu-bar"
//!     }
//!
//!     fn requires(&self) -> &'static [&'static str] {
//!         &["status-bar"]
//!     }
//!
//!     fn listeners(bindings: &mut Listeners<Self>) {
//!         bindings.on_available("status-bar", |menu| menu.status_online = true);
//!         bindings.on_shutdown("status-bar", |menu| menu.status_online = false);
//!     }
//! }
//!
//! register_plugin!(STATUS_BAR, "status-bar", |_ctx| {
//!     PluginCell::new(StatusBar { message: String::new() })
//! });
//! register_plugin!(MENU_BAR, "menu-bar", |_ctx| {
//!     PluginCell::new(MenuBar { status_online: false })
//! });
//!
//! fn main() {
//!     let runtime = Runtime::new();
//!     runtime.load_plugins();
//!     // menu-bar heard about status-bar regardless of activation order
//!     runtime.shutdown();
//! }
//! ```
//!
//! # Crates
//!
//! - [`core`](ensemble_core): the engine itself, free of any host concerns
//! - [`runtime`](ensemble_runtime): configuration, logging, and the
//!   link-time catalog around the engine

pub use ensemble_core as core;
pub use ensemble_runtime as runtime;

pub use ensemble_core::{
    BoxError, DependencyGraph, Edges, HostObserver, Listeners, Phase, Plugin, PluginCell,
    PluginDescriptor, PluginError, PluginManager, PluginResult, PluginState, PrepareContext,
    Target,
};
pub use ensemble_runtime::{
    BuildContext, ConfigLoader, EnsembleConfig, LoadReport, PluginCatalog, PluginDef, Runtime,
    RuntimeBuilder, RuntimeError, RuntimeResult, register_plugin, tracing,
};

/// Common imports for plugin authors and hosts.
pub mod prelude {
    pub use ensemble_runtime::prelude::*;
}
