//! Injected diagnostic registry of live scene nodes
//!
//! Debug tooling wants to resolve "node #42" into something readable without
//! reaching into the tree. The registry is owned by whoever hosts the
//! diagnostics (typically the window, or a process-wide debug service) and
//! is passed in explicitly; it is not global mutable state.

use rustc_hash::FxHashMap;

use crate::VisualId;

/// One registered node: a short type label plus an optional user-assigned
/// debug name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub type_label: &'static str,
    pub debug_name: Option<String>,
}

/// Arena of diagnostic entries keyed by node id.
#[derive(Debug, Default)]
pub struct DiagnosticRegistry {
    entries: FxHashMap<VisualId, DiagnosticEntry>,
}

impl DiagnosticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: VisualId, type_label: &'static str) {
        self.entries.insert(
            id,
            DiagnosticEntry {
                type_label,
                debug_name: None,
            },
        );
    }

    pub fn set_debug_name(&mut self, id: VisualId, name: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.debug_name = Some(name.into());
        }
    }

    pub fn unregister(&mut self, id: VisualId) {
        self.entries.remove(&id);
    }

    pub fn get(&self, id: VisualId) -> Option<&DiagnosticEntry> {
        self.entries.get(&id)
    }

    /// Human-readable label for log messages: `"Label(#id)"` or
    /// `"Type(#id)"` when no debug name was assigned.
    pub fn describe(&self, id: VisualId) -> String {
        match self.entries.get(&id) {
            Some(entry) => match &entry.debug_name {
                Some(name) => format!("{name}({id})"),
                None => format!("{}({id})", entry.type_label),
            },
            None => format!("unknown({id})"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
