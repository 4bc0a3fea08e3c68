//! Measure, arrange, and render passes
//!
//! The engine owns the parts every node shares: margin deflation, explicit
//! size and min/max clamping, alignment within the arranged slot, cache
//! bookkeeping, platform synchronization, and spatial index upkeep. Node
//! policies only see the content box through the pass scopes.

use trellis_core::{SceneError, VisualId};
use trellis_geometry::{
    HorizontalAlignment, Point, Rect, Size, Transform, VerticalAlignment,
};

use crate::events::{EventBus, LifecycleEvent};
use crate::platform::CompositionParts;
use crate::spatial::SpatialIndex;
use crate::tree::SceneTree;

/// Child access during a node's measure pass.
pub trait MeasureScope {
    /// Direct children of the node being measured, in insertion order.
    fn children(&self) -> Vec<VisualId>;
    /// Measures a direct child under `constraint` and returns its desired
    /// size, margin included.
    fn measure_child(&mut self, child: VisualId, constraint: Size) -> Result<Size, SceneError>;
    /// Desired size cached by the child's last measure.
    fn desired_size(&self, child: VisualId) -> Option<Size>;
}

/// Child access during a node's arrange pass.
pub trait ArrangeScope {
    fn children(&self) -> Vec<VisualId>;
    fn desired_size(&self, child: VisualId) -> Option<Size>;
    /// Arranges a direct child into `final_rect`, expressed in the same
    /// coordinate space as the content rect the policy received.
    fn arrange_child(&mut self, child: VisualId, final_rect: Rect) -> Result<(), SceneError>;
}

/// Everything a pass touches besides the node itself.
pub(crate) struct LayoutCtx<'a> {
    pub tree: &'a mut SceneTree,
    pub spatial: &'a mut SpatialIndex,
    pub events: &'a EventBus,
    pub viewport: Rect,
}

struct NodeScope<'c, 'a> {
    ctx: &'c mut LayoutCtx<'a>,
    node: VisualId,
}

impl MeasureScope for NodeScope<'_, '_> {
    fn children(&self) -> Vec<VisualId> {
        self.ctx.tree.children(self.node).to_vec()
    }

    fn measure_child(&mut self, child: VisualId, constraint: Size) -> Result<Size, SceneError> {
        measure(self.ctx, child, constraint)
    }

    fn desired_size(&self, child: VisualId) -> Option<Size> {
        self.ctx.tree.get(child).ok().and_then(|v| v.desired_size())
    }
}

impl ArrangeScope for NodeScope<'_, '_> {
    fn children(&self) -> Vec<VisualId> {
        self.ctx.tree.children(self.node).to_vec()
    }

    fn desired_size(&self, child: VisualId) -> Option<Size> {
        self.ctx.tree.get(child).ok().and_then(|v| v.desired_size())
    }

    fn arrange_child(&mut self, child: VisualId, final_rect: Rect) -> Result<(), SceneError> {
        arrange(self.ctx, child, final_rect)
    }
}

/// Clamps a length into `[min, max]`, minimum winning when they conflict.
fn clamp_axis(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min).max(0.0)
}

/// Runs the measure pass on `node` under `constraint` and caches the
/// resulting desired size. The policy sees a content constraint net of
/// margin with explicit Width/Height and min/max bounds already applied;
/// its answer is clamped the same way on the way out, so an explicit size
/// always wins over whatever the content wanted.
pub(crate) fn measure(
    ctx: &mut LayoutCtx,
    node: VisualId,
    constraint: Size,
) -> Result<Size, SceneError> {
    let (policy, margin, explicit_w, explicit_h, min_w, max_w, min_h, max_h) = {
        let visual = ctx.tree.get_mut(node)?;
        // A fresh measure invalidates the downstream pass results, but the
        // last arrange input survives so the scheduler can replay arrange
        // without climbing to the root.
        visual.arranged_rect = None;
        visual.render_rect = None;
        visual.absolute_bounds = None;
        (
            visual.policy.clone(),
            visual.margin(),
            visual.explicit_width(),
            visual.explicit_height(),
            visual.min_width(),
            visual.max_width(),
            visual.min_height(),
            visual.max_height(),
        )
    };

    let inner = constraint.deflate(margin);
    let content_constraint = Size::new(
        clamp_axis(explicit_w.unwrap_or(inner.width), min_w, max_w),
        clamp_axis(explicit_h.unwrap_or(inner.height), min_h, max_h),
    );

    let content = {
        let mut scope = NodeScope { ctx, node };
        policy.measure_core(&mut scope, content_constraint)?
    };
    if !content.is_valid_measurement() {
        log::error!("node {node} returned invalid measure result {content:?}");
        return Err(SceneError::InvalidMeasureResult { id: node });
    }

    let clamped = Size::new(
        clamp_axis(explicit_w.unwrap_or(content.width), min_w, max_w),
        clamp_axis(explicit_h.unwrap_or(content.height), min_h, max_h),
    );
    let desired = clamped.inflate(margin);

    {
        let visual = ctx.tree.get_mut(node)?;
        visual.desired_size = Some(desired);
        visual.last_measure_constraint = Some(constraint);
    }
    ctx.events.emit(node, LifecycleEvent::Measured);
    Ok(desired)
}

#[derive(Clone, Copy)]
enum AxisFit {
    Stretch,
    Center,
    Near,
    Far,
}

impl From<HorizontalAlignment> for AxisFit {
    fn from(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Stretch => Self::Stretch,
            HorizontalAlignment::Center => Self::Center,
            HorizontalAlignment::Near => Self::Near,
            HorizontalAlignment::Far => Self::Far,
        }
    }
}

impl From<VerticalAlignment> for AxisFit {
    fn from(alignment: VerticalAlignment) -> Self {
        match alignment {
            VerticalAlignment::Stretch => Self::Stretch,
            VerticalAlignment::Center => Self::Center,
            VerticalAlignment::Near => Self::Near,
            VerticalAlignment::Far => Self::Far,
        }
    }
}

/// Resolves one axis of the content box within the margin-deflated slot.
/// Stretch fills the slot unless an explicit length pins the axis; a
/// stretched axis capped below the slot (explicit or MaxWidth/MaxHeight)
/// centers in the leftover.
fn arrange_axis(
    fit: AxisFit,
    slot_len: f32,
    desired_len: f32,
    explicit: Option<f32>,
    min: f32,
    max: f32,
) -> (f32, f32) {
    let base = match (explicit, fit) {
        (Some(len), _) => len,
        (None, AxisFit::Stretch) => slot_len,
        (None, _) => desired_len.min(slot_len),
    };
    let length = clamp_axis(base, min, max);
    let leftover = (slot_len - length).max(0.0);
    let offset = match fit {
        AxisFit::Near => 0.0,
        AxisFit::Far => leftover,
        AxisFit::Center | AxisFit::Stretch => leftover / 2.0,
    };
    (offset, length)
}

/// Runs the arrange pass on `node` for the slot `final_rect`.
///
/// The rect must be in the same coordinate space the parent's content rect
/// used, which makes every arranged rect root-relative once the root is
/// arranged at the viewport origin.
pub(crate) fn arrange(
    ctx: &mut LayoutCtx,
    node: VisualId,
    final_rect: Rect,
) -> Result<(), SceneError> {
    let (
        policy,
        margin,
        desired,
        explicit_w,
        explicit_h,
        min_w,
        max_w,
        min_h,
        max_h,
        h_align,
        v_align,
        rounding,
    ) = {
        let visual = ctx.tree.get(node)?;
        let desired = visual
            .desired_size()
            .ok_or(SceneError::ArrangeBeforeMeasure { id: node })?;
        (
            visual.policy.clone(),
            visual.margin(),
            desired,
            visual.explicit_width(),
            visual.explicit_height(),
            visual.min_width(),
            visual.max_width(),
            visual.min_height(),
            visual.max_height(),
            visual.h_align(),
            visual.v_align(),
            visual.uses_layout_rounding(),
        )
    };
    {
        let visual = ctx.tree.get_mut(node)?;
        visual.render_rect = None;
        visual.absolute_bounds = None;
    }

    let slot = final_rect.deflate(margin);
    let desired_content = desired.deflate(margin);
    let (dx, width) = arrange_axis(
        h_align.into(),
        slot.width,
        desired_content.width,
        explicit_w,
        min_w,
        max_w,
    );
    let (dy, height) = arrange_axis(
        v_align.into(),
        slot.height,
        desired_content.height,
        explicit_h,
        min_h,
        max_h,
    );
    let content = Rect::new(slot.x + dx, slot.y + dy, width, height);

    {
        let mut scope = NodeScope { ctx, node };
        policy.arrange_core(&mut scope, content)?;
    }

    let mut arranged = content.inflate(margin);
    if rounding {
        arranged = arranged.snap_to_grid();
    }
    {
        let visual = ctx.tree.get_mut(node)?;
        visual.arranged_rect = Some(arranged);
        visual.last_arrange_rect = Some(final_rect);
    }
    ctx.events.emit(node, LifecycleEvent::Arranged);
    Ok(())
}

/// Runs the render pass on `node` and its subtree: resolves the content
/// rect, composes the root-space transform, pushes composition parts to the
/// platform node, and refreshes the spatial index.
pub(crate) fn render(ctx: &mut LayoutCtx, node: VisualId) -> Result<(), SceneError> {
    if !ctx.tree.is_attached(node) {
        return Err(SceneError::RenderBeforeAttach { id: node });
    }

    // The parent's render rect anchors this node's placement. A parent
    // without one is hidden, and a hidden ancestor keeps the whole subtree
    // hidden no matter what the node's own visibility says.
    let (parent_world, parent_origin) = match ctx.tree.parent(node) {
        Some(parent) => {
            let parent_visual = ctx.tree.get(parent)?;
            match parent_visual.render_rect() {
                Some(rect) => (parent_visual.world_transform, rect.origin()),
                None => {
                    hide_subtree(ctx, node);
                    return Ok(());
                }
            }
        }
        None => (Transform::IDENTITY, Point::ZERO),
    };

    let (
        visible,
        arranged,
        margin,
        clips_children,
        clips_from_parent,
        opacity,
        z_order,
        hit_test_visible,
        local_transform,
        policy,
    ) = {
        let visual = ctx.tree.get(node)?;
        (
            visual.is_visible(),
            visual.arranged_rect(),
            visual.margin(),
            visual.clips_children(),
            visual.clips_from_parent(),
            visual.opacity(),
            visual.resolved_z_index(),
            visual.is_hit_test_visible(),
            visual.render_transform(),
            visual.policy.clone(),
        )
    };

    let content = arranged.map(|rect| rect.deflate(margin));
    let render_rect = match content {
        Some(rect) if visible && !rect.is_empty() => rect,
        _ => {
            hide_subtree(ctx, node);
            return Ok(());
        }
    };

    // Compose root-space placement: offset relative to the parent's content
    // origin, the node's own render transform, then the parent's transform.
    let rel = Point::new(render_rect.x - parent_origin.x, render_rect.y - parent_origin.y);
    let world = local_transform
        .then(&Transform::translation(rel.x, rel.y))
        .then(&parent_world);
    let bounds = world.apply_rect(Rect::from_size(render_rect.size()));

    {
        let visual = ctx.tree.get_mut(node)?;
        visual.render_rect = Some(render_rect);
        visual.world_transform = world;
        visual.absolute_bounds = Some(bounds);
    }

    {
        let visual = ctx.tree.get(node)?;
        if let Some(platform) = visual.platform_node() {
            let suspended = visual.suspended_parts();
            if !suspended.contains(CompositionParts::SIZE) {
                platform.set_size(render_rect.size());
            }
            if !suspended.contains(CompositionParts::OFFSET) {
                platform.set_offset(rel.x, rel.y);
            }
            if !suspended.contains(CompositionParts::VISIBILITY) {
                platform.set_visible(true);
            }
            if !suspended.contains(CompositionParts::CLIP) {
                let clip = clips_children.then(|| Rect::from_size(render_rect.size()));
                platform.set_clip(clip, clips_from_parent);
            }
            if !suspended.contains(CompositionParts::OPACITY) {
                platform.set_opacity(opacity);
            }
            if !suspended.contains(CompositionParts::Z_ORDER) {
                platform.set_z_order(z_order);
            }
            if !suspended.contains(CompositionParts::TRANSFORM) {
                platform.set_transform(local_transform);
            }
        }
    }

    if hit_test_visible && bounds.intersects(&ctx.viewport) {
        ctx.spatial.move_entry(node, bounds);
    } else {
        ctx.spatial.remove(node);
    }

    policy.render_core(render_rect);
    ctx.events.emit(node, LifecycleEvent::Rendered);

    for child in ctx.tree.children(node).to_vec() {
        render(ctx, child)?;
    }
    Ok(())
}

/// Hides a node and everything under it: platform visibility off, spatial
/// entries dropped, render caches cleared. Arrange state is untouched so a
/// later visibility flip only needs a render pass.
fn hide_subtree(ctx: &mut LayoutCtx, node: VisualId) {
    for id in ctx.tree.subtree(node) {
        ctx.spatial.remove(id);
        if let Ok(visual) = ctx.tree.get_mut(id) {
            visual.render_rect = None;
            visual.absolute_bounds = None;
            if !visual.suspended_parts().contains(CompositionParts::VISIBILITY) {
                if let Some(platform) = visual.platform_node() {
                    platform.set_visible(false);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use trellis_core::PropertyValue;
    use trellis_geometry::Thickness;

    use super::*;
    use crate::policy::{DefaultPolicy, VisualPolicy};
    use crate::properties::builtin;

    struct FixedContent(Size);

    impl VisualPolicy for FixedContent {
        fn measure_core(
            &self,
            _scope: &mut dyn MeasureScope,
            _constraint: Size,
        ) -> Result<Size, SceneError> {
            Ok(self.0)
        }
    }

    struct BrokenMeasure;

    impl VisualPolicy for BrokenMeasure {
        fn measure_core(
            &self,
            _scope: &mut dyn MeasureScope,
            _constraint: Size,
        ) -> Result<Size, SceneError> {
            Ok(Size::new(f32::NAN, 10.0))
        }
    }

    fn fixture() -> (SceneTree, SpatialIndex, EventBus) {
        (
            SceneTree::new(Rc::new(DefaultPolicy)),
            SpatialIndex::new(Rect::new(0.0, 0.0, 800.0, 600.0)),
            EventBus::new(),
        )
    }

    fn ctx<'a>(
        tree: &'a mut SceneTree,
        spatial: &'a mut SpatialIndex,
        events: &'a EventBus,
    ) -> LayoutCtx<'a> {
        LayoutCtx {
            tree,
            spatial,
            events,
            viewport: Rect::new(0.0, 0.0, 800.0, 600.0),
        }
    }

    #[test]
    fn explicit_width_overrides_content_width() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(FixedContent(Size::new(100.0, 20.0))), builtin::base_table());
        let root = tree.root();
        tree.attach(root, node).unwrap();
        tree.get_mut(node)
            .unwrap()
            .store_mut()
            .insert(builtin::keys().width, PropertyValue::Float(50.0));

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        let desired = measure(&mut ctx, node, Size::new(200.0, 200.0)).unwrap();
        assert_eq!(desired, Size::new(50.0, 20.0));
    }

    #[test]
    fn margin_is_added_to_desired_size() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(FixedContent(Size::new(30.0, 30.0))), builtin::base_table());
        let root = tree.root();
        tree.attach(root, node).unwrap();
        tree.get_mut(node)
            .unwrap()
            .store_mut()
            .insert(
                builtin::keys().margin,
                PropertyValue::Thickness(Thickness::uniform(5.0)),
            );

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        let desired = measure(&mut ctx, node, Size::new(200.0, 200.0)).unwrap();
        assert_eq!(desired, Size::new(40.0, 40.0));
    }

    #[test]
    fn invalid_measure_result_is_rejected() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(BrokenMeasure), builtin::base_table());
        let root = tree.root();
        tree.attach(root, node).unwrap();

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        let err = measure(&mut ctx, node, Size::INFINITE).unwrap_err();
        assert!(matches!(err, SceneError::InvalidMeasureResult { .. }));
    }

    #[test]
    fn arrange_requires_a_prior_measure() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(DefaultPolicy), builtin::base_table());
        let root = tree.root();
        tree.attach(root, node).unwrap();

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        let err = arrange(&mut ctx, node, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap_err();
        assert!(matches!(err, SceneError::ArrangeBeforeMeasure { .. }));
    }

    #[test]
    fn stretch_fills_the_slot_but_center_keeps_desired() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(FixedContent(Size::new(40.0, 40.0))), builtin::base_table());
        let root = tree.root();
        tree.attach(root, node).unwrap();
        let keys = builtin::keys();
        tree.get_mut(node).unwrap().store_mut().insert(
            keys.h_align,
            PropertyValue::HAlign(HorizontalAlignment::Center),
        );

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        measure(&mut ctx, node, Size::new(100.0, 100.0)).unwrap();
        arrange(&mut ctx, node, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();

        // Width centered at desired 40, height stretched to the slot.
        let arranged = tree.get(node).unwrap().arranged_rect().unwrap();
        assert_eq!(arranged, Rect::new(30.0, 0.0, 40.0, 100.0));
    }

    #[test]
    fn layout_rounding_snaps_the_arranged_rect() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(FixedContent(Size::new(10.3, 10.3))), builtin::base_table());
        let root = tree.root();
        tree.attach(root, node).unwrap();
        let keys = builtin::keys();
        {
            let store = tree.get_mut(node).unwrap().store_mut();
            store.insert(keys.use_layout_rounding, PropertyValue::Bool(true));
            store.insert(
                keys.h_align,
                PropertyValue::HAlign(HorizontalAlignment::Near),
            );
            store.insert(
                keys.v_align,
                PropertyValue::VAlign(VerticalAlignment::Near),
            );
        }

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        measure(&mut ctx, node, Size::new(100.0, 100.0)).unwrap();
        arrange(&mut ctx, node, Rect::new(0.2, 0.2, 100.0, 100.0)).unwrap();

        let arranged = tree.get(node).unwrap().arranged_rect().unwrap();
        assert_eq!(arranged.x, arranged.x.round());
        assert_eq!(arranged.y, arranged.y.round());
    }

    #[test]
    fn render_populates_bounds_and_spatial_index() {
        let (mut tree, mut spatial, events) = fixture();
        let root = tree.root();
        let node = tree.create(Rc::new(FixedContent(Size::new(40.0, 40.0))), builtin::base_table());
        tree.attach(root, node).unwrap();

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        measure(&mut ctx, root, viewport.size()).unwrap();
        arrange(&mut ctx, root, viewport).unwrap();
        render(&mut ctx, root).unwrap();

        let bounds = tree.get(node).unwrap().absolute_bounds().unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 800.0, 600.0));
        assert!(spatial.contains(node));
    }

    #[test]
    fn hidden_node_leaves_the_spatial_index() {
        let (mut tree, mut spatial, events) = fixture();
        let root = tree.root();
        let node = tree.create(Rc::new(FixedContent(Size::new(40.0, 40.0))), builtin::base_table());
        tree.attach(root, node).unwrap();

        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        {
            let mut ctx = ctx(&mut tree, &mut spatial, &events);
            measure(&mut ctx, root, viewport.size()).unwrap();
            arrange(&mut ctx, root, viewport).unwrap();
            render(&mut ctx, root).unwrap();
        }
        assert!(spatial.contains(node));

        tree.get_mut(node)
            .unwrap()
            .store_mut()
            .insert(builtin::keys().is_visible, PropertyValue::Bool(false));
        {
            let mut ctx = ctx(&mut tree, &mut spatial, &events);
            render(&mut ctx, node).unwrap();
        }
        assert!(!spatial.contains(node));
        assert!(tree.get(node).unwrap().render_rect().is_none());
    }

    #[test]
    fn hidden_parent_keeps_descendants_hidden() {
        let (mut tree, mut spatial, events) = fixture();
        let root = tree.root();
        let parent = tree.create(Rc::new(DefaultPolicy), builtin::base_table());
        let child = tree.create(Rc::new(FixedContent(Size::new(40.0, 40.0))), builtin::base_table());
        tree.attach(root, parent).unwrap();
        tree.attach(parent, child).unwrap();

        let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
        {
            let mut ctx = ctx(&mut tree, &mut spatial, &events);
            measure(&mut ctx, root, viewport.size()).unwrap();
            arrange(&mut ctx, root, viewport).unwrap();
            render(&mut ctx, root).unwrap();
        }
        assert!(spatial.contains(child));

        tree.get_mut(parent)
            .unwrap()
            .store_mut()
            .insert(builtin::keys().is_visible, PropertyValue::Bool(false));
        {
            let mut ctx = ctx(&mut tree, &mut spatial, &events);
            render(&mut ctx, parent).unwrap();
        }
        assert!(!spatial.contains(child));

        // Rendering the child alone must not resurrect it while its parent
        // stays hidden.
        {
            let mut ctx = ctx(&mut tree, &mut spatial, &events);
            render(&mut ctx, child).unwrap();
        }
        assert!(!spatial.contains(child));
        assert!(tree.get(child).unwrap().render_rect().is_none());
    }

    #[test]
    fn render_before_attach_fails() {
        let (mut tree, mut spatial, events) = fixture();
        let node = tree.create(Rc::new(DefaultPolicy), builtin::base_table());

        let mut ctx = ctx(&mut tree, &mut spatial, &events);
        let err = render(&mut ctx, node).unwrap_err();
        assert!(matches!(err, SceneError::RenderBeforeAttach { .. }));
    }
}
