//! Typed Plug
//!
//! A [`TypedPlug`] holds a value of one concrete type and ties together
//! three concerns:
//!
//! 1. Connections are only accepted from outputs of exactly the same value
//!    type.
//!
//! 2. Client writes go through the action log as a recorded
//!    forward/backward pair, so every edit can be undone.
//!
//! 3. Reads are lazy. A write dirties everything downstream; a dirty plug
//!    asks the compute engine for a fresh value only when it is read.
//!
//! # Writes
//!
//! [`TypedPlug::set_value`] never touches the value itself. It builds a
//! [`ValueChange`] holding the new value and the value at call time, and
//! hands it to the open transaction. The log runs the forward leg at once,
//! which lands in [`TypedPlug::set_value_internal`]: the single place that
//! overwrites the value, clears the dirty flag and notifies the graph.
//!
//! A write of the current value to a clean plug is dropped entirely. A dirty
//! plug is always written, because its cached value may be stale even when
//! it compares equal.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::action::{Transaction, ValueChange};
use crate::compute::ComputeEngine;
use crate::error::{PlugError, Result};
use crate::graph::PlugId;

use super::base::{Direction, PlugBase, PlugFlags, ValuePlug};
use super::type_tag::TypeTag;

/// Values that can be stored in a plug.
///
/// Implemented for every type meeting the bounds.
pub trait PlugValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> PlugValue for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Row-major 3x3 float matrix.
pub type M33f = [[f32; 3]; 3];

/// Row-major 4x4 float matrix.
pub type M44f = [[f32; 4]; 4];

pub type BoolPlug = TypedPlug<bool>;
pub type StringPlug = TypedPlug<String>;
pub type M33fPlug = TypedPlug<M33f>;
pub type M44fPlug = TypedPlug<M44f>;

struct Shared<V: PlugValue> {
    base: PlugBase,
    value: RwLock<V>,
    default_value: V,
}

/// A plug holding a value of type `V`.
///
/// This is a handle; clones refer to the same plug. Plugs are created with
/// [`PlugGraph::add_plug`](crate::graph::PlugGraph::add_plug).
pub struct TypedPlug<V: PlugValue> {
    shared: Arc<Shared<V>>,
}

impl<V: PlugValue> TypedPlug<V> {
    pub(crate) fn new(base: PlugBase, default_value: V) -> Self {
        Self {
            shared: Arc::new(Shared {
                base,
                value: RwLock::new(default_value.clone()),
                default_value,
            }),
        }
    }

    /// The value the plug was constructed with.
    pub fn default_value(&self) -> &V {
        &self.shared.default_value
    }

    /// The cached value, without recomputing if dirty.
    pub fn cached_value(&self) -> V {
        self.shared.value.read().clone()
    }

    /// Set the value as an undoable edit within `txn`.
    ///
    /// Does nothing when `value` equals the current value and the plug is
    /// clean. Otherwise records a change whose backward leg restores the
    /// value held at call time, and applies it immediately.
    pub fn set_value(&self, value: V, txn: &Transaction<'_>) -> Result<()> {
        if self.flags().contains(PlugFlags::READ_ONLY) {
            return Err(PlugError::ReadOnly {
                plug: self.full_name().to_owned(),
            });
        }

        let current = self.cached_value();
        if value == current && !self.is_dirty() {
            trace!(plug = self.full_name(), "value unchanged");
            return Ok(());
        }

        txn.enact(Box::new(ValueChange::new(self, value, current)))
    }

    /// Overwrite the value, clear the dirty flag and dirty every dependent.
    ///
    /// This bypasses the action log. It is the entry point for undo/redo
    /// replay and for compute engines publishing a fresh value; clients
    /// should use [`set_value`](Self::set_value).
    pub fn set_value_internal(&self, value: V) {
        trace!(plug = self.full_name(), ?value, "value set");
        *self.shared.value.write() = value;
        self.shared.base.set_dirty(false);

        if let Some(graph) = self.shared.base.graph() {
            graph.value_changed(self.id());
        }
    }

    /// The current value, recomputed through `engine` first if dirty.
    ///
    /// A compute failure is returned as is and the plug stays dirty.
    pub fn get_value(&self, engine: &dyn ComputeEngine) -> Result<V> {
        if self.is_dirty() {
            engine.compute_if_dirty(self)?;
        }
        Ok(self.cached_value())
    }

    /// Copy the upstream plug's value into this plug as an undoable edit.
    ///
    /// Only valid on a connected input plug. The upstream value is read with
    /// [`get_value`](Self::get_value), so it may recompute first.
    pub fn set_from_input(&self, txn: &Transaction<'_>, engine: &dyn ComputeEngine) -> Result<()> {
        let upstream = self.upstream()?;
        let value = upstream.get_value(engine)?;
        self.set_value(value, txn)
    }

    /// Restore the default value as an undoable edit.
    pub fn reset_to_default(&self, txn: &Transaction<'_>) -> Result<()> {
        self.set_value(self.shared.default_value.clone(), txn)
    }

    /// The output this plug is connected to, if any.
    pub fn input(&self) -> Option<PlugId> {
        self.shared.base.graph()?.input(self.id())
    }

    /// Whether both handles refer to the same plug.
    pub fn ptr_eq(&self, other: &TypedPlug<V>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// A non-owning handle to this plug.
    pub fn downgrade(&self) -> WeakPlug<V> {
        WeakPlug {
            id: self.id(),
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Resolve the connected upstream plug, checking preconditions.
    fn upstream(&self) -> Result<TypedPlug<V>> {
        if self.direction() != Direction::Input {
            return Err(PlugError::WrongDirection {
                plug: self.full_name().to_owned(),
                expected: Direction::Input,
            });
        }

        let graph = self.shared.base.graph().ok_or_else(|| PlugError::GraphDropped {
            plug: self.full_name().to_owned(),
        })?;
        let source_id = graph.input(self.id()).ok_or_else(|| PlugError::NotConnected {
            plug: self.full_name().to_owned(),
        })?;
        let source = graph
            .plug(source_id)
            .ok_or(PlugError::UnknownPlug(source_id))?;

        source
            .as_any()
            .downcast_ref::<TypedPlug<V>>()
            .cloned()
            .ok_or_else(|| PlugError::TypeMismatch {
                input: self.full_name().to_owned(),
                input_type: self.type_tag().name(),
                candidate: source.full_name().to_owned(),
                candidate_type: source.type_tag().name(),
            })
    }
}

impl<V: PlugValue> ValuePlug for TypedPlug<V> {
    fn base(&self) -> &PlugBase {
        &self.shared.base
    }

    fn type_tag(&self) -> TypeTag {
        TypeTag::of::<V>()
    }

    fn accepts_input(&self, candidate: &dyn ValuePlug) -> bool {
        let Some(graph) = self.shared.base.graph() else {
            return false;
        };
        if graph.accepts_input_base(self, candidate).is_err() {
            return false;
        }
        candidate.type_tag() == self.type_tag()
    }

    fn refresh_from_input(&self, engine: &dyn ComputeEngine) -> Result<()> {
        if self.direction() != Direction::Input {
            return Err(PlugError::WrongDirection {
                plug: self.full_name().to_owned(),
                expected: Direction::Input,
            });
        }
        let value = match self.input() {
            Some(_) => self.upstream()?.get_value(engine)?,
            None => self.cached_value(),
        };
        self.set_value_internal(value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<V: PlugValue> Clone for TypedPlug<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: PlugValue> fmt::Debug for TypedPlug<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPlug")
            .field("name", &self.full_name())
            .field("type", &self.type_tag())
            .field("direction", &self.direction())
            .field("dirty", &self.is_dirty())
            .field("value", &*self.shared.value.read())
            .finish()
    }
}

/// Non-owning handle to a [`TypedPlug`].
pub struct WeakPlug<V: PlugValue> {
    id: PlugId,
    shared: Weak<Shared<V>>,
}

impl<V: PlugValue> WeakPlug<V> {
    pub fn id(&self) -> PlugId {
        self.id
    }

    /// The plug, if it is still alive.
    pub fn upgrade(&self) -> Option<TypedPlug<V>> {
        self.shared.upgrade().map(|shared| TypedPlug { shared })
    }
}

impl<V: PlugValue> Clone for WeakPlug<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<V: PlugValue> fmt::Debug for WeakPlug<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPlug").field("id", &self.id).finish()
    }
}
