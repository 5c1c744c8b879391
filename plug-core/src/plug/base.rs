//! Plug Base
//!
//! State shared by every plug regardless of its value type: identity,
//! direction, flags, the dirty flag and the link to the owning graph.

use std::any::Any;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use crate::compute::ComputeEngine;
use crate::error::Result;
use crate::graph::{GraphShared, NodeId, PlugGraph, PlugId};

use super::type_tag::TypeTag;

/// Whether a plug consumes or produces a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Consumes a value, optionally from a connected output.
    Input,
    /// Produces a value for downstream inputs.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Bitset of plug behaviours.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlugFlags(u32);

impl PlugFlags {
    pub const NONE: PlugFlags = PlugFlags(0);
    /// Created at runtime rather than by the node's constructor.
    pub const DYNAMIC: PlugFlags = PlugFlags(1 << 0);
    /// The value is saved with the graph.
    pub const SERIALISABLE: PlugFlags = PlugFlags(1 << 1);
    /// Input plugs with this flag may be connected.
    pub const ACCEPTS_INPUTS: PlugFlags = PlugFlags(1 << 2);
    /// Neither client writes nor new connections are allowed.
    pub const READ_ONLY: PlugFlags = PlugFlags(1 << 3);

    pub const DEFAULT: PlugFlags = PlugFlags(Self::SERIALISABLE.0 | Self::ACCEPTS_INPUTS.0);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        PlugFlags(bits)
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: PlugFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn with(self, other: PlugFlags) -> PlugFlags {
        PlugFlags(self.0 | other.0)
    }

    pub const fn without(self, other: PlugFlags) -> PlugFlags {
        PlugFlags(self.0 & !other.0)
    }
}

impl Default for PlugFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for PlugFlags {
    type Output = PlugFlags;

    fn bitor(self, rhs: PlugFlags) -> PlugFlags {
        self.with(rhs)
    }
}

impl BitOrAssign for PlugFlags {
    fn bitor_assign(&mut self, rhs: PlugFlags) {
        *self = self.with(rhs);
    }
}

impl fmt::Debug for PlugFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(PlugFlags, &str); 4] = [
            (PlugFlags::DYNAMIC, "DYNAMIC"),
            (PlugFlags::SERIALISABLE, "SERIALISABLE"),
            (PlugFlags::ACCEPTS_INPUTS, "ACCEPTS_INPUTS"),
            (PlugFlags::READ_ONLY, "READ_ONLY"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("PlugFlags(NONE)")
        } else {
            write!(f, "PlugFlags({})", set.join(" | "))
        }
    }
}

/// Identity and bookkeeping common to all plugs.
pub struct PlugBase {
    id: PlugId,
    node: NodeId,
    name: String,
    full_name: String,
    direction: Direction,
    flags: PlugFlags,
    dirty: AtomicBool,
    graph: Weak<GraphShared>,
}

impl PlugBase {
    pub(crate) fn new(
        node: NodeId,
        node_name: &str,
        name: &str,
        direction: Direction,
        flags: PlugFlags,
        graph: Weak<GraphShared>,
    ) -> Self {
        Self {
            id: PlugId::new(),
            node,
            name: name.to_owned(),
            full_name: format!("{node_name}.{name}"),
            direction,
            flags,
            dirty: AtomicBool::new(false),
            graph,
        }
    }

    pub fn id(&self) -> PlugId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"<node>.<plug>"`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn flags(&self) -> PlugFlags {
        self.flags
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Set or clear the flag without touching any other plug.
    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// The owning graph, unless it has been dropped.
    pub fn graph(&self) -> Option<PlugGraph> {
        PlugGraph::from_weak(&self.graph)
    }
}

impl fmt::Debug for PlugBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlugBase")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("direction", &self.direction)
            .field("flags", &self.flags)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Type-erased view of a plug.
///
/// The graph stores plugs as `Arc<dyn ValuePlug>`; the action log and
/// compute engines address them through this trait without knowing the
/// value type.
pub trait ValuePlug: Any + Send + Sync + fmt::Debug {
    /// Shared identity and bookkeeping.
    fn base(&self) -> &PlugBase;

    /// Tag of the concrete value type.
    fn type_tag(&self) -> TypeTag;

    /// Whether `candidate` may become this plug's input.
    fn accepts_input(&self, candidate: &dyn ValuePlug) -> bool;

    /// Publish the upstream value (or, without a connection, the cached
    /// value) through the low-level setter, clearing the dirty flag.
    ///
    /// Only input plugs refresh this way; outputs fail with
    /// [`PlugError::WrongDirection`](crate::error::PlugError::WrongDirection).
    fn refresh_from_input(&self, engine: &dyn ComputeEngine) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> PlugId {
        self.base().id()
    }

    fn node(&self) -> NodeId {
        self.base().node()
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn full_name(&self) -> &str {
        self.base().full_name()
    }

    fn direction(&self) -> Direction {
        self.base().direction()
    }

    fn flags(&self) -> PlugFlags {
        self.base().flags()
    }

    fn is_dirty(&self) -> bool {
        self.base().is_dirty()
    }

    /// Mark this plug and everything downstream of it dirty.
    fn mark_dirty(&self) {
        self.base().set_dirty(true);
        if let Some(graph) = self.base().graph() {
            graph.dirty_downstream(self.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_operations() {
        let flags = PlugFlags::DEFAULT;
        assert!(flags.contains(PlugFlags::ACCEPTS_INPUTS));
        assert!(flags.contains(PlugFlags::SERIALISABLE));
        assert!(!flags.contains(PlugFlags::READ_ONLY));

        let locked = flags | PlugFlags::READ_ONLY;
        assert!(locked.contains(PlugFlags::READ_ONLY | PlugFlags::ACCEPTS_INPUTS));
        assert_eq!(locked.without(PlugFlags::READ_ONLY), flags);
        assert_eq!(PlugFlags::from_bits(flags.bits()), flags);
        assert!(PlugFlags::NONE.contains(PlugFlags::NONE));
    }

    #[test]
    fn flags_debug_lists_set_bits() {
        assert_eq!(format!("{:?}", PlugFlags::NONE), "PlugFlags(NONE)");
        assert_eq!(
            format!("{:?}", PlugFlags::DEFAULT),
            "PlugFlags(SERIALISABLE | ACCEPTS_INPUTS)"
        );
    }

    #[test]
    fn base_tracks_identity_and_dirtiness() {
        let base = PlugBase::new(
            NodeId::new(),
            "blur",
            "radius",
            Direction::Input,
            PlugFlags::DEFAULT,
            Weak::new(),
        );
        assert_eq!(base.full_name(), "blur.radius");
        assert!(!base.is_dirty());
        assert!(base.graph().is_none());

        base.set_dirty(true);
        assert!(base.is_dirty());
        base.set_dirty(false);
        assert!(!base.is_dirty());
    }
}
