//! Plugs
//!
//! A plug is a named, directional value slot on a node. Input plugs consume
//! values, optionally from a connected output; output plugs produce them.
//!
//! # Layers
//!
//! - [`PlugBase`] and the [`ValuePlug`] trait: identity, direction, flags
//!   and the dirty flag, independent of the value type.
//! - [`TypedPlug`]: the stored value and default, exact-type connection
//!   checks, undoable writes and lazy reads.
//!
//! # States
//!
//! A plug is either clean (its value is authoritative) or dirty (its value
//! may be stale). Writes upstream make it dirty; a successful
//! [`TypedPlug::set_value_internal`] makes it clean again, whether it comes
//! from a client edit, undo/redo replay or a compute engine.

mod base;
mod type_tag;
mod typed;

pub use base::{Direction, PlugBase, PlugFlags, ValuePlug};
pub use type_tag::{register_type_name, type_name_of, TypeTag};
pub use typed::{
    BoolPlug, M33f, M33fPlug, M44f, M44fPlug, PlugValue, StringPlug, TypedPlug, WeakPlug,
};
