//! Error taxonomy for the scene graph core

use crate::{Severity, VisualId};

/// Failures surfaced by scene-graph operations.
///
/// Contract violations abort the operation that triggered them and are
/// expected to be handled by the caller; `InvalidationStorm` is systemic and
/// unrecoverable for the window that reports it.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneError {
    /// The node is not present in the tree.
    NodeMissing { id: VisualId },
    /// Arrange was requested before a successful Measure populated the
    /// node's desired size.
    ArrangeBeforeMeasure { id: VisualId },
    /// Render was requested on a node that is not attached to a root.
    RenderBeforeAttach { id: VisualId },
    /// A mutating operation ran off the UI-affinity thread.
    WrongThread { operation: &'static str },
    /// Attaching the node would make it its own ancestor.
    ParentingCycle { id: VisualId, ancestor: VisualId },
    /// The node already has a parent; re-parenting requires explicit detach.
    AlreadyParented { id: VisualId, parent: VisualId },
    /// A widget's measure pass produced a negative, NaN, or infinite size.
    InvalidMeasureResult { id: VisualId },
    /// The property key is not declared for the node's class.
    UnknownProperty { id: VisualId, key: u32 },
    /// Two consecutive invalidation cycles processed an identical marker
    /// sequence: two nodes are continuously re-invalidating each other.
    InvalidationStorm { first: VisualId, severity: Severity },
}

impl SceneError {
    /// Stable diagnostic code for logs and host-side triage.
    pub fn code(&self) -> &'static str {
        match self {
            SceneError::NodeMissing { .. } => "SCENE_NODE_MISSING",
            SceneError::ArrangeBeforeMeasure { .. } => "SCENE_ARRANGE_BEFORE_MEASURE",
            SceneError::RenderBeforeAttach { .. } => "SCENE_RENDER_BEFORE_ATTACH",
            SceneError::WrongThread { .. } => "SCENE_WRONG_THREAD",
            SceneError::ParentingCycle { .. } => "SCENE_PARENTING_CYCLE",
            SceneError::AlreadyParented { .. } => "SCENE_ALREADY_PARENTED",
            SceneError::InvalidMeasureResult { .. } => "SCENE_INVALID_MEASURE_RESULT",
            SceneError::UnknownProperty { .. } => "SCENE_UNKNOWN_PROPERTY",
            SceneError::InvalidationStorm { .. } => "SCENE_INVALIDATION_STORM",
        }
    }

    /// True for the systemic loop case, which callers must not retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SceneError::InvalidationStorm { .. })
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::NodeMissing { id } => write!(f, "node {id} missing from tree"),
            SceneError::ArrangeBeforeMeasure { id } => {
                write!(f, "node {id} arranged before measured")
            }
            SceneError::RenderBeforeAttach { id } => {
                write!(f, "node {id} rendered before attach")
            }
            SceneError::WrongThread { operation } => {
                write!(f, "{operation} called off the UI thread")
            }
            SceneError::ParentingCycle { id, ancestor } => {
                write!(f, "attaching {id} under {ancestor} creates a cycle")
            }
            SceneError::AlreadyParented { id, parent } => {
                write!(f, "node {id} already parented to {parent}; detach first")
            }
            SceneError::InvalidMeasureResult { id } => {
                write!(f, "node {id} measure pass returned an invalid size")
            }
            SceneError::UnknownProperty { id, key } => {
                write!(f, "property key {key} is not declared for node {id}")
            }
            SceneError::InvalidationStorm { first, severity } => write!(
                f,
                "invalidation storm detected starting at {first} ({severity:?})"
            ),
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_distinct() {
        let id = VisualId::from_raw(1);
        let errors = [
            SceneError::NodeMissing { id },
            SceneError::ArrangeBeforeMeasure { id },
            SceneError::RenderBeforeAttach { id },
            SceneError::WrongThread { operation: "set" },
            SceneError::ParentingCycle { id, ancestor: id },
            SceneError::AlreadyParented { id, parent: id },
            SceneError::InvalidMeasureResult { id },
            SceneError::UnknownProperty { id, key: 1 },
            SceneError::InvalidationStorm {
                first: id,
                severity: Severity::Measure,
            },
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn only_the_storm_is_fatal() {
        let id = VisualId::from_raw(7);
        assert!(SceneError::InvalidationStorm {
            first: id,
            severity: Severity::Render,
        }
        .is_fatal());
        assert!(!SceneError::NodeMissing { id }.is_fatal());
    }
}
