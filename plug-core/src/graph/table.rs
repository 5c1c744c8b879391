//! Plug Table
//!
//! The table owns every plug in a graph and records the edges between them.
//! There are two kinds of edge:
//!
//! - Connections: from an output plug to the input plugs it feeds.
//! - Affects relations: from an input plug to the outputs of the same node
//!   whose values are computed from it.
//!
//! Both kinds point "downstream", so a breadth-first walk over them visits
//! every plug whose value may depend on the starting plug. The walk is used
//! both for dirty propagation and for cycle detection.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::node::{Node, NodeId, PlugId};
use crate::plug::ValuePlug;

/// A plug plus its edges.
pub(crate) struct PlugEntry {
    pub(crate) plug: Arc<dyn ValuePlug>,
    pub(crate) node: NodeId,

    /// Upstream output feeding this plug (inputs only).
    input: Option<PlugId>,

    /// Inputs fed by this plug (outputs only).
    outputs: SmallVec<[PlugId; 4]>,

    /// Outputs of the same node computed from this plug (inputs only).
    affects: SmallVec<[PlugId; 2]>,

    /// Inputs of the same node this plug is computed from (outputs only).
    affected_by: SmallVec<[PlugId; 2]>,
}

impl PlugEntry {
    pub(crate) fn new(plug: Arc<dyn ValuePlug>, node: NodeId) -> Self {
        Self {
            plug,
            node,
            input: None,
            outputs: SmallVec::new(),
            affects: SmallVec::new(),
            affected_by: SmallVec::new(),
        }
    }

    fn downstream(&self) -> impl Iterator<Item = PlugId> + '_ {
        self.outputs.iter().chain(self.affects.iter()).copied()
    }
}

/// Node and plug storage for a single graph.
#[derive(Default)]
pub(crate) struct PlugTable {
    nodes: IndexMap<NodeId, Node>,
    plugs: IndexMap<PlugId, PlugEntry>,
}

impl PlugTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node together with all of its plugs.
    pub(crate) fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        for plug_id in node.plugs() {
            self.detach(plug_id);
        }
        Some(node)
    }

    pub(crate) fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    pub(crate) fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|node| node.name() == name)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn add_plug(&mut self, entry: PlugEntry) {
        self.plugs.insert(entry.plug.id(), entry);
    }

    /// Remove a plug and every edge touching it.
    pub(crate) fn remove_plug(&mut self, plug_id: PlugId) -> Option<PlugEntry> {
        let node_id = self.plugs.get(&plug_id)?.node;
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.remove_plug(plug_id);
        }
        self.detach(plug_id)
    }

    fn detach(&mut self, plug_id: PlugId) -> Option<PlugEntry> {
        let entry = self.plugs.shift_remove(&plug_id)?;

        if let Some(source) = entry.input {
            if let Some(source) = self.plugs.get_mut(&source) {
                source.outputs.retain(|id| *id != plug_id);
            }
        }
        for dest in &entry.outputs {
            if let Some(dest) = self.plugs.get_mut(dest) {
                dest.input = None;
            }
        }
        for output in &entry.affects {
            if let Some(output) = self.plugs.get_mut(output) {
                output.affected_by.retain(|id| *id != plug_id);
            }
        }
        for input in &entry.affected_by {
            if let Some(input) = self.plugs.get_mut(input) {
                input.affects.retain(|id| *id != plug_id);
            }
        }

        Some(entry)
    }

    pub(crate) fn entry(&self, plug_id: PlugId) -> Option<&PlugEntry> {
        self.plugs.get(&plug_id)
    }

    pub(crate) fn plug(&self, plug_id: PlugId) -> Option<&Arc<dyn ValuePlug>> {
        self.plugs.get(&plug_id).map(|entry| &entry.plug)
    }

    pub(crate) fn contains(&self, plug_id: PlugId) -> bool {
        self.plugs.contains_key(&plug_id)
    }

    pub(crate) fn plug_count(&self) -> usize {
        self.plugs.len()
    }

    pub(crate) fn input(&self, plug_id: PlugId) -> Option<PlugId> {
        self.plugs.get(&plug_id).and_then(|entry| entry.input)
    }

    pub(crate) fn outputs(&self, plug_id: PlugId) -> Vec<PlugId> {
        self.plugs
            .get(&plug_id)
            .map(|entry| entry.outputs.to_vec())
            .unwrap_or_default()
    }

    /// Connect `source` to `dest`, returning the input it replaced.
    pub(crate) fn set_input(&mut self, dest: PlugId, source: PlugId) -> Option<PlugId> {
        let previous = self.clear_input(dest);
        if let Some(entry) = self.plugs.get_mut(&dest) {
            entry.input = Some(source);
        }
        if let Some(entry) = self.plugs.get_mut(&source) {
            entry.outputs.push(dest);
        }
        previous
    }

    /// Disconnect `dest` from its input, returning the former source.
    pub(crate) fn clear_input(&mut self, dest: PlugId) -> Option<PlugId> {
        let source = self.plugs.get_mut(&dest)?.input.take()?;
        if let Some(entry) = self.plugs.get_mut(&source) {
            entry.outputs.retain(|id| *id != dest);
        }
        Some(source)
    }

    /// Record that `input` affects `output`. Returns `false` if the relation
    /// already existed.
    pub(crate) fn add_affects(&mut self, input: PlugId, output: PlugId) -> bool {
        let Some(entry) = self.plugs.get_mut(&input) else {
            return false;
        };
        if entry.affects.contains(&output) {
            return false;
        }
        entry.affects.push(output);
        if let Some(entry) = self.plugs.get_mut(&output) {
            entry.affected_by.push(input);
        }
        true
    }

    pub(crate) fn affects(&self, input: PlugId) -> Vec<PlugId> {
        self.plugs
            .get(&input)
            .map(|entry| entry.affects.to_vec())
            .unwrap_or_default()
    }

    /// Every plug reachable downstream of `start`, in breadth-first order.
    /// `start` itself is not included.
    pub(crate) fn downstream(&self, start: PlugId) -> Vec<PlugId> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        visited.insert(start);
        if let Some(entry) = self.plugs.get(&start) {
            queue.extend(entry.downstream());
        }

        while let Some(plug_id) = queue.pop_front() {
            if !visited.insert(plug_id) {
                continue;
            }
            if let Some(entry) = self.plugs.get(&plug_id) {
                result.push(plug_id);
                queue.extend(entry.downstream());
            }
        }

        result
    }

    /// Whether `to` is reachable downstream of `from`.
    pub(crate) fn reaches(&self, from: PlugId, to: PlugId) -> bool {
        from == to || self.downstream(from).contains(&to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PlugGraph;
    use crate::plug::{Direction, PlugFlags};

    /// Build a table holding `count` detached plugs on one node.
    fn table_with_plugs(count: usize) -> (PlugTable, Vec<PlugId>) {
        let graph = PlugGraph::new();
        let node = graph.add_node("n").unwrap();
        let mut table = PlugTable::new();
        let mut ids = Vec::new();
        for i in 0..count {
            let plug = graph
                .add_plug(node, &format!("p{i}"), Direction::Input, 0_i32, PlugFlags::DEFAULT)
                .unwrap();
            ids.push(plug.id());
            table.add_plug(PlugEntry::new(Arc::new(plug), node));
        }
        (table, ids)
    }

    #[test]
    fn set_input_replaces_previous_source() {
        let (mut table, ids) = table_with_plugs(3);
        let (a, b, dest) = (ids[0], ids[1], ids[2]);

        assert_eq!(table.set_input(dest, a), None);
        assert_eq!(table.outputs(a), vec![dest]);

        assert_eq!(table.set_input(dest, b), Some(a));
        assert!(table.outputs(a).is_empty());
        assert_eq!(table.outputs(b), vec![dest]);
        assert_eq!(table.input(dest), Some(b));

        assert_eq!(table.clear_input(dest), Some(b));
        assert_eq!(table.input(dest), None);
        assert_eq!(table.clear_input(dest), None);
    }

    #[test]
    fn downstream_follows_connections_and_affects() {
        // p0 -> p1 =affects=> p2 -> p3
        let (mut table, ids) = table_with_plugs(4);
        table.set_input(ids[1], ids[0]);
        assert!(table.add_affects(ids[1], ids[2]));
        assert!(!table.add_affects(ids[1], ids[2]));
        table.set_input(ids[3], ids[2]);

        assert_eq!(table.downstream(ids[0]), vec![ids[1], ids[2], ids[3]]);
        assert!(table.reaches(ids[0], ids[3]));
        assert!(!table.reaches(ids[3], ids[0]));
    }

    #[test]
    fn removing_a_plug_drops_its_edges() {
        let (mut table, ids) = table_with_plugs(3);
        table.set_input(ids[1], ids[0]);
        table.set_input(ids[2], ids[1]);

        assert!(table.remove_plug(ids[1]).is_some());
        assert!(table.outputs(ids[0]).is_empty());
        assert_eq!(table.input(ids[2]), None);
        assert_eq!(table.plug_count(), 2);
    }
}
