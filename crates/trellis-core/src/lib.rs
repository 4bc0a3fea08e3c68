//! Core runtime primitives for the Trellis scene graph: property values and
//! stores, invalidation severities, error taxonomy, UI-thread affinity, and
//! the injected diagnostic registry.

mod error;
mod registry;
mod severity;
mod store;
mod thread_affinity;
mod value;

pub use error::SceneError;
pub use registry::{DiagnosticEntry, DiagnosticRegistry};
pub use severity::{InvalidationSpec, Severity};
pub use store::{PropertyReader, PropertyStore};
pub use thread_affinity::UiThreadGuard;
pub use value::{PropertyKey, PropertyValue, SetOptions};

use std::fmt;

/// Identity of a scene node within its owning tree.
///
/// Ids are allocated by the tree arena and are never reused within a tree's
/// lifetime, so a stale id reliably misses rather than aliasing a new node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualId(u64);

impl VisualId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
