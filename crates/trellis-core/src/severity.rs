//! Invalidation severity ordering and per-property invalidation specs

/// How much of a node's cached layout state a change invalidates.
///
/// Severities are totally ordered: `None < Render < Arrange < Measure`.
/// A higher severity subsumes every lower one: a node that re-measures
/// will re-arrange and re-render as part of the same recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// No re-validation required.
    #[default]
    None,
    /// The platform render node must be re-synchronized.
    Render,
    /// The node must be re-arranged (then re-rendered).
    Arrange,
    /// The node must be re-measured (then re-arranged and re-rendered).
    Measure,
}

impl Severity {
    /// Merges two requests for the same node, keeping the stronger one.
    pub fn merge(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// Returns true if a pending entry at `self` already covers a request
    /// at `requested`.
    pub fn covers(self, requested: Severity) -> bool {
        self >= requested
    }
}

/// Invalidation behavior a property declares for its owner and the owner's
/// parent.
///
/// `parent_severity` is the propagation requested when the owner has no
/// explicit size; explicitly sized nodes skip parent propagation entirely
/// (their slot in the parent cannot change).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct InvalidationSpec {
    pub self_severity: Severity,
    pub parent_severity: Severity,
}

impl InvalidationSpec {
    pub const NONE: InvalidationSpec = InvalidationSpec {
        self_severity: Severity::None,
        parent_severity: Severity::None,
    };

    /// Re-measure the owner; an intrinsically sized owner also forces the
    /// parent to re-measure, since the parent's layout of it may change.
    pub const MEASURE: InvalidationSpec = InvalidationSpec {
        self_severity: Severity::Measure,
        parent_severity: Severity::Measure,
    };

    /// Re-arrange the owner without disturbing the parent.
    pub const ARRANGE: InvalidationSpec = InvalidationSpec {
        self_severity: Severity::Arrange,
        parent_severity: Severity::None,
    };

    /// Re-render the owner without disturbing the parent.
    pub const RENDER: InvalidationSpec = InvalidationSpec {
        self_severity: Severity::Render,
        parent_severity: Severity::None,
    };

    pub const fn new(self_severity: Severity, parent_severity: Severity) -> Self {
        Self {
            self_severity,
            parent_severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_is_total() {
        assert!(Severity::None < Severity::Render);
        assert!(Severity::Render < Severity::Arrange);
        assert!(Severity::Arrange < Severity::Measure);
    }

    #[test]
    fn merge_keeps_the_stronger_request() {
        assert_eq!(
            Severity::Render.merge(Severity::Measure),
            Severity::Measure
        );
        assert_eq!(
            Severity::Arrange.merge(Severity::Render),
            Severity::Arrange
        );
    }

    #[test]
    fn covers_is_reflexive_and_downward() {
        assert!(Severity::Measure.covers(Severity::Render));
        assert!(Severity::Arrange.covers(Severity::Arrange));
        assert!(!Severity::Render.covers(Severity::Arrange));
    }
}
