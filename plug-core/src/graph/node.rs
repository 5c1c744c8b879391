//! Graph Nodes
//!
//! Identifiers for nodes and plugs, and the node record that groups plugs
//! under a common name.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Unique identifier for a node in a plug graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a plug.
///
/// Plug IDs are unique across every graph in the process, so an ID alone is
/// enough to tell whether a plug belongs to a given graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlugId(u64);

impl PlugId {
    /// Generate a new unique plug ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for PlugId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named group of plugs.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,

    /// Plugs owned by this node, keyed by plug name.
    plugs: IndexMap<String, PlugId>,
}

impl Node {
    /// Create an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            plugs: IndexMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a plug by name.
    pub fn plug(&self, name: &str) -> Option<PlugId> {
        self.plugs.get(name).copied()
    }

    /// Plugs in creation order.
    pub fn plugs(&self) -> impl Iterator<Item = PlugId> + '_ {
        self.plugs.values().copied()
    }

    pub fn plug_count(&self) -> usize {
        self.plugs.len()
    }

    /// Register a plug under `name`. Returns `false` if the name is taken.
    pub(crate) fn add_plug(&mut self, name: &str, id: PlugId) -> bool {
        if self.plugs.contains_key(name) {
            return false;
        }
        self.plugs.insert(name.to_owned(), id);
        true
    }

    /// Forget a plug, preserving the order of the remaining ones.
    pub(crate) fn remove_plug(&mut self, id: PlugId) {
        self.plugs.retain(|_, plug| *plug != id);
    }
}
