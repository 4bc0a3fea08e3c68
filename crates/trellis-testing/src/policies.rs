//! Small layout policies used by harness tests

use trellis_geometry::{Rect, Size};
use trellis_scene::{ArrangeScope, MeasureScope, SceneError, VisualPolicy};

/// Reports a fixed content size regardless of the constraint.
#[derive(Clone, Copy, Debug)]
pub struct FixedSizePolicy {
    pub size: Size,
}

impl FixedSizePolicy {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Size::new(width, height),
        }
    }
}

impl VisualPolicy for FixedSizePolicy {
    fn measure_core(
        &self,
        _scope: &mut dyn MeasureScope,
        _constraint: Size,
    ) -> Result<Size, SceneError> {
        Ok(self.size)
    }
}

/// Stacks children top to bottom at their desired heights, full width.
/// Handy when a test needs non-overlapping children.
#[derive(Clone, Copy, Debug, Default)]
pub struct VerticalStackPolicy;

impl VisualPolicy for VerticalStackPolicy {
    fn measure_core(
        &self,
        scope: &mut dyn MeasureScope,
        constraint: Size,
    ) -> Result<Size, SceneError> {
        let mut width: f32 = 0.0;
        let mut height: f32 = 0.0;
        for child in scope.children() {
            let child_constraint = Size::new(constraint.width, f32::INFINITY);
            let desired = scope.measure_child(child, child_constraint)?;
            width = width.max(desired.width);
            height += desired.height;
        }
        Ok(Size::new(width, height))
    }

    fn arrange_core(&self, scope: &mut dyn ArrangeScope, content: Rect) -> Result<(), SceneError> {
        let mut y = content.y;
        for child in scope.children() {
            let height = scope
                .desired_size(child)
                .map(|desired| desired.height)
                .unwrap_or(0.0);
            scope.arrange_child(child, Rect::new(content.x, y, content.width, height))?;
            y += height;
        }
        Ok(())
    }
}
