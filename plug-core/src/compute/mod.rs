//! Recomputation
//!
//! A dirty plug does not refresh itself. When it is read, it hands itself
//! to a [`ComputeEngine`], which works out a correct value and publishes it
//! with [`TypedPlug::set_value_internal`](crate::plug::TypedPlug::set_value_internal).
//!
//! # Why Lazy
//!
//! A write only flips dirty flags downstream. Nothing is recomputed until a
//! dirty plug is actually read, so plugs that are never observed never cost
//! a computation.
//!
//! [`NodeEngine`] is the reference engine: inputs pull from their upstream
//! connection, outputs run a compute function registered for them.

mod engine;

pub use engine::NodeEngine;

use crate::error::Result;
use crate::plug::ValuePlug;

/// Refreshes dirty plugs on demand.
pub trait ComputeEngine {
    /// If `plug` is dirty, produce a correct value and publish it through the
    /// plug's low-level setter. A clean plug is left alone.
    ///
    /// On error the plug must stay dirty so a later read retries.
    fn compute_if_dirty(&self, plug: &dyn ValuePlug) -> Result<()>;
}
