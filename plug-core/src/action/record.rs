//! Action Records
//!
//! An action is a reversible edit stored by value: the target plug plus the
//! value to apply going forward and the value to restore going backward.
//! Nothing is captured by closure, so replaying an action never depends on
//! state that changed after it was recorded.

use std::fmt;

use tracing::warn;

use crate::graph::PlugId;
use crate::plug::{PlugValue, TypedPlug, ValuePlug, WeakPlug};

/// A reversible edit held by the action log.
pub trait Action: Send + Sync + fmt::Debug {
    /// The plug this action writes to.
    fn target(&self) -> PlugId;

    /// Apply the edit.
    fn forward(&self);

    /// Revert the edit.
    fn backward(&self);
}

/// A recorded value write on a [`TypedPlug`].
pub struct ValueChange<V: PlugValue> {
    target: WeakPlug<V>,
    forward: V,
    backward: V,
}

impl<V: PlugValue> ValueChange<V> {
    /// Record a change of `plug` from `backward` to `forward`.
    pub fn new(plug: &TypedPlug<V>, forward: V, backward: V) -> Self {
        Self {
            target: plug.downgrade(),
            forward,
            backward,
        }
    }

    pub fn forward_value(&self) -> &V {
        &self.forward
    }

    pub fn backward_value(&self) -> &V {
        &self.backward
    }

    fn apply(&self, value: &V) {
        match self.target.upgrade() {
            Some(plug) => plug.set_value_internal(value.clone()),
            None => warn!(plug = ?self.target.id(), "skipping replay onto destroyed plug"),
        }
    }
}

impl<V: PlugValue> Action for ValueChange<V> {
    fn target(&self) -> PlugId {
        self.target.id()
    }

    fn forward(&self) {
        self.apply(&self.forward);
    }

    fn backward(&self) {
        self.apply(&self.backward);
    }
}

impl<V: PlugValue> fmt::Debug for ValueChange<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .target
            .upgrade()
            .map(|plug| plug.full_name().to_owned());
        f.debug_struct("ValueChange")
            .field("target", &name.as_deref().unwrap_or("<destroyed>"))
            .field("forward", &self.forward)
            .field("backward", &self.backward)
            .finish()
    }
}
