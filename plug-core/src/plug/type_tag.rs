//! Runtime Type Tags
//!
//! Every plug reports a [`TypeTag`] for its value type. Tags compare by
//! identity of the concrete type only, so connection checks are exact: no
//! conversions, no "is-a" relationships.
//!
//! Tags also carry a display name for diagnostics. The names of the
//! built-in plug types are pre-registered; other value types can register a
//! name with [`register_type_name`] and otherwise fall back to
//! [`std::any::type_name`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use parking_lot::RwLock;

use super::typed::{M33f, M44f};

static TYPE_NAMES: OnceLock<RwLock<HashMap<TypeId, &'static str>>> = OnceLock::new();

fn type_names() -> &'static RwLock<HashMap<TypeId, &'static str>> {
    TYPE_NAMES.get_or_init(|| {
        let mut names = HashMap::new();
        names.insert(TypeId::of::<bool>(), "BoolPlug");
        names.insert(TypeId::of::<String>(), "StringPlug");
        names.insert(TypeId::of::<M33f>(), "M33fPlug");
        names.insert(TypeId::of::<M44f>(), "M44fPlug");
        RwLock::new(names)
    })
}

/// Register a display name for plugs holding values of type `V`.
///
/// Returns the previously registered name, if any.
pub fn register_type_name<V: 'static>(name: &'static str) -> Option<&'static str> {
    type_names().write().insert(TypeId::of::<V>(), name)
}

/// The display name for plugs holding values of type `V`.
pub fn type_name_of<V: 'static>() -> &'static str {
    type_names()
        .read()
        .get(&TypeId::of::<V>())
        .copied()
        .unwrap_or_else(std::any::type_name::<V>)
}

/// Stable identifier of a plug's concrete value type.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// The tag for plugs holding values of type `V`.
    pub fn of<V: 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: type_name_of::<V>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
