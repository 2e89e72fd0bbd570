//! Dependency bookkeeping for the plugin registry.
//!
//! The graph keeps two views over the declared dependency edges:
//!
//! | view | question it answers |
//! |------|---------------------|
//! | dependents | "who declared plugin *q* as a dependency?" |
//! | dependencies | "what did plugin *p* declare?" |
//!
//! The two views are exact inverses at all times. Edges are inserted and
//! removed pairwise, and a removal only strips the edges the departing
//! plugin itself declared; edges recorded *about* it by plugins that are
//! still registered survive, so a later re-registration picks them up
//! again.
//!
//! Cycles are allowed. The engine never orders plugins topologically, so
//! mutually dependent plugins are serviced like any others.

use std::collections::HashMap;

use tracing::warn;

use crate::plugin::PluginDescriptor;

/// Edges of one graph node, grouped by declaration kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edges {
    /// Hard edges, in declaration order.
    pub requires: Vec<&'static str>,
    /// Soft edges, in declaration order.
    pub optional: Vec<&'static str>,
}

impl Edges {
    /// `requires ∪ optional`, hard edges first, declaration order within
    /// each kind.
    pub fn union(&self) -> Vec<&'static str> {
        let mut union = Vec::with_capacity(self.requires.len() + self.optional.len());
        union.extend_from_slice(&self.requires);
        for name in &self.optional {
            if !union.contains(name) {
                union.push(name);
            }
        }
        union
    }

    /// True when the node has no edges of either kind.
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.optional.is_empty()
    }

    fn contains(&self, name: &str) -> bool {
        self.requires.iter().chain(&self.optional).any(|n| *n == name)
    }

    fn remove(&mut self, name: &str) {
        self.requires.retain(|n| *n != name);
        self.optional.retain(|n| *n != name);
    }
}

/// Forward and inverse dependency views over the registered plugin set.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    dependents: HashMap<&'static str, Edges>,
    dependencies: HashMap<&'static str, Edges>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every edge the arriving plugin declared.
    ///
    /// Self-edges and repeated declarations of the same dependency are
    /// skipped with a warning; a name listed under both `requires` and
    /// `optional` produces a single hard edge.
    pub fn insert(&mut self, descriptor: &PluginDescriptor) {
        let name = descriptor.name;
        let hard = descriptor.requires.iter().map(|dep| (*dep, true));
        let soft = descriptor.optional.iter().map(|dep| (*dep, false));
        for (dep, required) in hard.chain(soft) {
            if dep == name {
                warn!(plugin = %name, "Plugin declares itself as a dependency - ignored");
                continue;
            }
            let declared = self.dependencies.entry(name).or_default();
            if declared.contains(dep) {
                warn!(
                    plugin = %name,
                    dependency = %dep,
                    "Duplicate dependency declaration - ignored"
                );
                continue;
            }
            let dependents = self.dependents.entry(dep).or_default();
            if required {
                declared.requires.push(dep);
                dependents.requires.push(name);
            } else {
                declared.optional.push(dep);
                dependents.optional.push(name);
            }
        }
    }

    /// Removes the edges `name` itself declared.
    ///
    /// Edges other plugins declared *on* `name` are left in place; those
    /// plugins are still registered and their declarations still stand.
    pub fn remove(&mut self, name: &str) {
        let Some(declared) = self.dependencies.remove(name) else {
            return;
        };
        for dep in declared.union() {
            if let Some(dependents) = self.dependents.get_mut(dep) {
                dependents.remove(name);
                if dependents.is_empty() {
                    self.dependents.remove(dep);
                }
            }
        }
    }

    /// Plugins that declared `name` as a dependency. Empty when nobody did.
    pub fn dependents_of(&self, name: &str) -> Edges {
        self.dependents.get(name).cloned().unwrap_or_default()
    }

    /// Dependencies `name` declared. Empty when it declared none.
    pub fn dependencies_of(&self, name: &str) -> Edges {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }

    /// True when no edges are recorded at all.
    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty() && self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(
        name: &'static str,
        requires: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> PluginDescriptor {
        PluginDescriptor {
            name,
            requires,
            optional,
        }
    }

    /// Checks that every edge in one view has its mirror in the other.
    fn views_are_inverse(graph: &DependencyGraph) -> bool {
        let mirrored = |owner: &str, dep: &str, required: bool| {
            let edges = graph.dependents_of(dep);
            let list = if required { &edges.requires } else { &edges.optional };
            list.iter().any(|n| *n == owner)
        };
        graph.dependencies.iter().all(|(owner, edges)| {
            edges.requires.iter().all(|dep| mirrored(owner, dep, true))
                && edges.optional.iter().all(|dep| mirrored(owner, dep, false))
        }) && graph.dependents.iter().all(|(dep, edges)| {
            edges.requires.iter().all(|owner| {
                graph.dependencies_of(owner).requires.iter().any(|n| n == dep)
            }) && edges.optional.iter().all(|owner| {
                graph.dependencies_of(owner).optional.iter().any(|n| n == dep)
            })
        })
    }

    #[test]
    fn insert_records_both_views() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("panel", &["core"], &["theme"]));

        assert_eq!(graph.dependencies_of("panel").requires, vec!["core"]);
        assert_eq!(graph.dependencies_of("panel").optional, vec!["theme"]);
        assert_eq!(graph.dependents_of("core").requires, vec!["panel"]);
        assert_eq!(graph.dependents_of("theme").optional, vec!["panel"]);
        assert!(views_are_inverse(&graph));
    }

    #[test]
    fn dependents_accumulate_in_registration_order() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("a", &["core"], &[]));
        graph.insert(&descriptor("b", &["core"], &[]));
        graph.insert(&descriptor("c", &[], &["core"]));

        let edges = graph.dependents_of("core");
        assert_eq!(edges.requires, vec!["a", "b"]);
        assert_eq!(edges.optional, vec!["c"]);
        assert_eq!(edges.union(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_declarations_collapse_to_one_edge() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("panel", &["core", "core"], &["core"]));

        assert_eq!(graph.dependencies_of("panel").requires, vec!["core"]);
        assert!(graph.dependencies_of("panel").optional.is_empty());
        assert_eq!(graph.dependents_of("core").requires, vec!["panel"]);
        assert!(views_are_inverse(&graph));
    }

    #[test]
    fn self_edges_are_ignored() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("panel", &["panel"], &["panel"]));

        assert!(graph.is_empty());
    }

    #[test]
    fn removal_strips_own_edges_only() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("panel", &["core"], &[]));
        graph.insert(&descriptor("editor", &["core"], &["panel"]));

        graph.remove("panel");

        // panel's own declaration on core is gone
        assert_eq!(graph.dependents_of("core").requires, vec!["editor"]);
        assert!(graph.dependencies_of("panel").is_empty());
        // editor's declaration on panel survives its departure
        assert_eq!(graph.dependents_of("panel").optional, vec!["editor"]);
        assert!(views_are_inverse(&graph));
    }

    #[test]
    fn removal_of_unknown_name_is_a_noop() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("panel", &["core"], &[]));
        graph.remove("ghost");
        assert_eq!(graph.dependents_of("core").requires, vec!["panel"]);
    }

    #[test]
    fn cycles_are_recorded_without_complaint() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("alpha", &["beta"], &[]));
        graph.insert(&descriptor("beta", &["alpha"], &[]));

        assert_eq!(graph.dependents_of("alpha").requires, vec!["beta"]);
        assert_eq!(graph.dependents_of("beta").requires, vec!["alpha"]);
        assert!(views_are_inverse(&graph));
    }

    #[test]
    fn removing_every_plugin_empties_both_views() {
        let mut graph = DependencyGraph::new();
        graph.insert(&descriptor("core", &[], &[]));
        graph.insert(&descriptor("panel", &["core"], &["theme"]));
        graph.insert(&descriptor("editor", &["panel"], &[]));

        // reverse registration order, the way a full teardown walks it
        for name in ["editor", "panel", "core"] {
            graph.remove(name);
        }

        assert!(graph.is_empty());
        assert!(graph.dependents_of("theme").is_empty());
    }
}
