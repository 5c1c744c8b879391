//! Plug Graph
//!
//! The graph owns every node and plug and records how they are wired.
//!
//! # Overview
//!
//! - Nodes group plugs under a name. Plug names are unique within a node.
//! - Connections run from an output plug to an input plug. An input has at
//!   most one connection; an output may feed any number of inputs.
//! - Affects relations run from an input plug to an output plug of the same
//!   node, declaring that the output is computed from the input.
//!
//! Edges are stored as [`PlugId`]s in a graph-owned table. Plugs hold only a
//! weak link back to the graph, so dropping the last [`PlugGraph`] handle
//! frees the table even while plug handles are still alive.
//!
//! # Dirty Propagation
//!
//! When a plug's value is written, the graph walks every edge downstream of
//! it and sets the dirty flag of each plug it reaches. The walk finishes
//! before the write returns, so a later read of any downstream plug on the
//! same thread sees the flag and recomputes.

mod node;
mod table;

pub use node::{Node, NodeId, PlugId};

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{ConnectionRule, PlugError, Result};
use crate::plug::{Direction, PlugBase, PlugFlags, PlugValue, TypedPlug, ValuePlug};
use table::{PlugEntry, PlugTable};

pub(crate) struct GraphShared {
    table: RwLock<PlugTable>,
}

/// Handle to a graph of nodes and plugs.
///
/// Cloning the handle shares the same graph.
#[derive(Clone)]
pub struct PlugGraph {
    shared: Arc<GraphShared>,
}

impl PlugGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(GraphShared {
                table: RwLock::new(PlugTable::new()),
            }),
        }
    }

    pub(crate) fn from_weak(weak: &Weak<GraphShared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// Whether two handles refer to the same graph.
    pub fn ptr_eq(&self, other: &PlugGraph) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add an empty node. Node names are unique within the graph.
    pub fn add_node(&self, name: &str) -> Result<NodeId> {
        let mut table = self.shared.table.write();
        if table.node_by_name(name).is_some() {
            return Err(PlugError::DuplicateNode { name: name.to_owned() });
        }
        let id = table.add_node(Node::new(name));
        debug!(node = name, "added node");
        Ok(id)
    }

    /// Destroy a node and all of its plugs.
    ///
    /// Destruction is not undoable. Handles to the removed plugs stay valid
    /// but are detached: they no longer propagate or accept connections.
    pub fn remove_node(&self, node_id: NodeId) -> Result<()> {
        let node = self
            .shared
            .table
            .write()
            .remove_node(node_id)
            .ok_or(PlugError::UnknownNode(node_id))?;
        debug!(node = node.name(), "removed node");
        Ok(())
    }

    pub fn node_name(&self, node_id: NodeId) -> Option<String> {
        self.shared
            .table
            .read()
            .node(node_id)
            .map(|node| node.name().to_owned())
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.shared.table.read().node_by_name(name).map(Node::id)
    }

    /// Plugs of a node in creation order.
    pub fn node_plugs(&self, node_id: NodeId) -> Vec<PlugId> {
        self.shared
            .table
            .read()
            .node(node_id)
            .map(|node| node.plugs().collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.shared.table.read().node_count()
    }

    // ------------------------------------------------------------------
    // Plugs
    // ------------------------------------------------------------------

    /// Create a typed plug on `node`.
    ///
    /// The plug's value starts out equal to `default_value` and the plug
    /// starts clean.
    pub fn add_plug<V: PlugValue>(
        &self,
        node_id: NodeId,
        name: &str,
        direction: Direction,
        default_value: V,
        flags: PlugFlags,
    ) -> Result<TypedPlug<V>> {
        let mut table = self.shared.table.write();
        let node = table
            .node_mut(node_id)
            .ok_or(PlugError::UnknownNode(node_id))?;

        let base = PlugBase::new(
            node_id,
            node.name(),
            name,
            direction,
            flags,
            Arc::downgrade(&self.shared),
        );
        let plug = TypedPlug::new(base, default_value);

        if !node.add_plug(name, plug.id()) {
            return Err(PlugError::DuplicatePlug {
                node: node.name().to_owned(),
                name: name.to_owned(),
            });
        }
        table.add_plug(PlugEntry::new(Arc::new(plug.clone()), node_id));

        debug!(plug = plug.full_name(), ?direction, "added plug");
        Ok(plug)
    }

    /// Destroy a single plug, severing its connections.
    pub fn remove_plug(&self, plug_id: PlugId) -> Result<()> {
        let entry = self
            .shared
            .table
            .write()
            .remove_plug(plug_id)
            .ok_or(PlugError::UnknownPlug(plug_id))?;
        debug!(plug = entry.plug.full_name(), "removed plug");
        Ok(())
    }

    /// Look up a plug by ID.
    pub fn plug(&self, plug_id: PlugId) -> Option<Arc<dyn ValuePlug>> {
        self.shared.table.read().plug(plug_id).cloned()
    }

    /// Look up a plug by ID, returning it only if its value type is `V`.
    pub fn typed_plug<V: PlugValue>(&self, plug_id: PlugId) -> Option<TypedPlug<V>> {
        let plug = self.plug(plug_id)?;
        plug.as_any().downcast_ref::<TypedPlug<V>>().cloned()
    }

    /// Look up a plug by node and plug name.
    pub fn find_plug(&self, node_id: NodeId, name: &str) -> Option<PlugId> {
        self.shared.table.read().node(node_id)?.plug(name)
    }

    /// The node that owns a plug.
    pub fn node_of(&self, plug_id: PlugId) -> Option<NodeId> {
        self.shared.table.read().entry(plug_id).map(|entry| entry.node)
    }

    pub fn contains(&self, plug_id: PlugId) -> bool {
        self.shared.table.read().contains(plug_id)
    }

    pub fn plug_count(&self) -> usize {
        self.shared.table.read().plug_count()
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// The base connection rules, independent of value types.
    ///
    /// Checks, in order: graph membership, self connection, directions,
    /// the destination's flags, and cycles.
    pub fn accepts_input_base(
        &self,
        input: &dyn ValuePlug,
        candidate: &dyn ValuePlug,
    ) -> std::result::Result<(), ConnectionRule> {
        let table = self.shared.table.read();

        if !table.contains(input.id()) || !table.contains(candidate.id()) {
            return Err(ConnectionRule::ForeignPlug);
        }
        if input.id() == candidate.id() {
            return Err(ConnectionRule::SelfConnection);
        }
        if input.direction() != Direction::Input {
            return Err(ConnectionRule::DestinationNotInput);
        }
        if candidate.direction() != Direction::Output {
            return Err(ConnectionRule::SourceNotOutput);
        }
        if !input.flags().contains(PlugFlags::ACCEPTS_INPUTS) {
            return Err(ConnectionRule::InputsNotAccepted);
        }
        if input.flags().contains(PlugFlags::READ_ONLY) {
            return Err(ConnectionRule::ReadOnly);
        }
        if table.reaches(input.id(), candidate.id()) {
            return Err(ConnectionRule::Cycle);
        }

        Ok(())
    }

    /// Connect `candidate` (an output) to `input`.
    ///
    /// Any existing connection to `input` is replaced. On success `input`
    /// and everything downstream of it is marked dirty, so the next read
    /// pulls the new upstream value.
    pub fn connect(&self, input: &dyn ValuePlug, candidate: &dyn ValuePlug) -> Result<()> {
        if let Err(rule) = self.accepts_input_base(input, candidate) {
            return Err(PlugError::IllegalConnection {
                input: input.full_name().to_owned(),
                candidate: candidate.full_name().to_owned(),
                rule,
            });
        }
        if !input.accepts_input(candidate) {
            return Err(PlugError::TypeMismatch {
                input: input.full_name().to_owned(),
                input_type: input.type_tag().name(),
                candidate: candidate.full_name().to_owned(),
                candidate_type: candidate.type_tag().name(),
            });
        }

        self.shared
            .table
            .write()
            .set_input(input.id(), candidate.id());
        debug!(
            input = input.full_name(),
            source = candidate.full_name(),
            "connected"
        );

        input.base().set_dirty(true);
        self.dirty_downstream(input.id());
        Ok(())
    }

    /// Remove the connection feeding `input`, if any.
    ///
    /// The plug keeps its last value.
    pub fn disconnect(&self, input: &dyn ValuePlug) -> Result<bool> {
        let mut table = self.shared.table.write();
        if !table.contains(input.id()) {
            return Err(PlugError::UnknownPlug(input.id()));
        }
        let removed = table.clear_input(input.id()).is_some();
        if removed {
            debug!(input = input.full_name(), "disconnected");
        }
        Ok(removed)
    }

    /// The output feeding `plug_id`, if connected.
    pub fn input(&self, plug_id: PlugId) -> Option<PlugId> {
        self.shared.table.read().input(plug_id)
    }

    /// The inputs fed by `plug_id`.
    pub fn outputs(&self, plug_id: PlugId) -> Vec<PlugId> {
        self.shared.table.read().outputs(plug_id)
    }

    /// Declare that `output` is computed from `input`.
    ///
    /// Both plugs must belong to the same node.
    pub fn declare_affects(&self, input: &dyn ValuePlug, output: &dyn ValuePlug) -> Result<()> {
        let illegal = |reason| PlugError::IllegalAffects {
            input: input.full_name().to_owned(),
            output: output.full_name().to_owned(),
            reason,
        };

        let mut table = self.shared.table.write();
        let input_node = table
            .entry(input.id())
            .ok_or(PlugError::UnknownPlug(input.id()))?
            .node;
        let output_node = table
            .entry(output.id())
            .ok_or(PlugError::UnknownPlug(output.id()))?
            .node;

        if input_node != output_node {
            return Err(illegal("plugs belong to different nodes"));
        }
        if input.direction() != Direction::Input {
            return Err(illegal("the affecting plug must be an input"));
        }
        if output.direction() != Direction::Output {
            return Err(illegal("the affected plug must be an output"));
        }
        if table.reaches(output.id(), input.id()) {
            return Err(illegal("relation would create a cycle"));
        }

        if table.add_affects(input.id(), output.id()) {
            trace!(
                input = input.full_name(),
                output = output.full_name(),
                "declared affects"
            );
        }
        Ok(())
    }

    /// The outputs computed from `input`.
    pub fn affects(&self, input: PlugId) -> Vec<PlugId> {
        self.shared.table.read().affects(input)
    }

    /// Every plug downstream of `plug_id`, in breadth-first order.
    pub fn downstream(&self, plug_id: PlugId) -> Vec<PlugId> {
        self.shared.table.read().downstream(plug_id)
    }

    // ------------------------------------------------------------------
    // Dirty propagation
    // ------------------------------------------------------------------

    /// React to a value write on `plug_id` by dirtying its dependents.
    pub(crate) fn value_changed(&self, plug_id: PlugId) {
        self.dirty_downstream(plug_id);
    }

    /// Set the dirty flag of every plug downstream of `plug_id`.
    pub(crate) fn dirty_downstream(&self, plug_id: PlugId) {
        // Collect under the lock, flag after releasing it.
        let dependents: Vec<Arc<dyn ValuePlug>> = {
            let table = self.shared.table.read();
            table
                .downstream(plug_id)
                .into_iter()
                .filter_map(|id| table.plug(id).cloned())
                .collect()
        };

        for plug in dependents {
            trace!(plug = plug.full_name(), "marked dirty");
            plug.base().set_dirty(true);
        }
    }
}

impl Default for PlugGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PlugGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.shared.table.read();
        f.debug_struct("PlugGraph")
            .field("node_count", &table.node_count())
            .field("plug_count", &table.plug_count())
            .finish()
    }
}
