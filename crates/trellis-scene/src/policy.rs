//! Per-node layout policy: the seam concrete widget types implement
//!
//! The engine owns margins, explicit-size clamping, alignment, caching, and
//! platform synchronization; the policy only answers "how big is my content"
//! and "where do my children go". Invalidation negotiation is part of the
//! same capability so a container can damp what its children request.

use std::rc::Rc;

use trellis_core::{SceneError, Severity, VisualId};
use trellis_geometry::{Rect, Size};

use crate::layout::{ArrangeScope, MeasureScope};

/// Node-specific behavior for the three passes plus invalidation policy.
///
/// All methods have defaults so a plain container needs no policy code.
pub trait VisualPolicy {
    /// Measures the node's content under a constraint already net of margin
    /// and explicit size overrides. Containers measure children through the
    /// scope. Must return a finite, non-negative size.
    fn measure_core(
        &self,
        scope: &mut dyn MeasureScope,
        constraint: Size,
    ) -> Result<Size, SceneError> {
        // Leaf default: occupy nothing, but still measure children so a
        // policy-less container keeps its subtree warm.
        let mut max = Size::ZERO;
        for child in scope.children() {
            let desired = scope.measure_child(child, constraint)?;
            max = max.max(desired);
        }
        Ok(max)
    }

    /// Places children inside the content rect. The default gives every
    /// child the full content box.
    fn arrange_core(&self, scope: &mut dyn ArrangeScope, content: Rect) -> Result<(), SceneError> {
        for child in scope.children() {
            scope.arrange_child(child, content)?;
        }
        Ok(())
    }

    /// Content hook run while this node's render pass synchronizes the
    /// platform node. No contract obligations toward the engine.
    fn render_core(&self, render_rect: Rect) {
        let _ = render_rect;
    }

    /// Severity this node requires of its parent when it is invalidated at
    /// `requested` and has no explicit size. An intrinsically sized node
    /// that re-measures changes what the parent sees, so the parent must
    /// re-measure too.
    fn parent_severity_for(&self, requested: Severity) -> Severity {
        match requested {
            Severity::Measure => Severity::Measure,
            _ => Severity::None,
        }
    }

    /// Lets a parent accept a lower severity for a specific child than the
    /// child proposed. The parent's answer wins.
    fn accept_child_severity(&self, child: VisualId, proposed: Severity) -> Severity {
        let _ = child;
        proposed
    }
}

/// Policy for plain nodes: no intrinsic content, children fill the box.
#[derive(Debug, Default)]
pub struct DefaultPolicy;

impl VisualPolicy for DefaultPolicy {}

/// Shared handle to a policy. Policies are immutable once installed, so a
/// plain `Rc` is enough.
pub(crate) type PolicyHandle = Rc<dyn VisualPolicy>;
