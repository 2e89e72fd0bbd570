//! Error types for the plugin lifecycle engine.

use thiserror::Error;

use crate::plugin::PluginState;

/// Boxed error returned by plugin-authored hooks such as
/// [`Plugin::prepare`](crate::plugin::Plugin::prepare).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while validating, registering, or activating plugins.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A listener binding names a plugin that is absent from the owner's
    /// `requires` and `optional` lists.
    ///
    /// Raised while the listener table is compiled, before the plugin ever
    /// reaches a manager.
    #[error("plugin '{plugin}' listens for '{target}' without declaring it as a dependency")]
    UndeclaredTarget {
        /// Plugin that declared the binding.
        plugin: String,
        /// Undeclared listener target.
        target: String,
    },

    /// A plugin with the same name is already registered.
    #[error("plugin '{0}' is already registered")]
    Duplicate(String),

    /// The named plugin was never registered.
    #[error("plugin '{0}' is not registered")]
    UnknownPlugin(String),

    /// `activate` was called on a plugin that is not in the `Constructed`
    /// state, or re-entered while a lifecycle call for the same plugin is
    /// still on the stack.
    #[error("plugin '{plugin}' cannot be activated from state {state:?}")]
    ActivationOrder {
        /// Plugin whose activation was rejected.
        plugin: String,
        /// State the plugin was found in.
        state: PluginState,
    },

    /// The plugin's own `prepare` hook failed.
    ///
    /// The plugin stays registered in the `Constructed` state and may be
    /// activated again.
    #[error("plugin '{plugin}' failed to prepare: {source}")]
    Prepare {
        /// Plugin whose hook failed.
        plugin: String,
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },
}

/// Result type for plugin engine operations.
pub type PluginResult<T> = Result<T, PluginError>;
