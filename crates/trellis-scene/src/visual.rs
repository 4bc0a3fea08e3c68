//! Scene node state: property store, tree links, and cached layout results

use std::rc::Rc;

use trellis_core::{PropertyReader, PropertyStore, PropertyValue, VisualId};
use trellis_geometry::{
    HorizontalAlignment, Rect, Size, Thickness, Transform, VerticalAlignment,
};

use crate::platform::{CompositionParts, PlatformNode};
use crate::policy::PolicyHandle;
use crate::properties::{builtin, PropertyTable};

/// One element of the visual tree.
///
/// The three cached layout results are independently invalid until the
/// corresponding pass runs. `last_measure_constraint` / `last_arrange_rect`
/// let the scheduler re-run a pass on a single node without walking up to
/// the root; both are cleared on detach so a re-attached node is always
/// measured from scratch.
pub struct Visual {
    id: VisualId,
    pub(crate) parent: Option<VisualId>,
    pub(crate) children: Vec<VisualId>,
    /// True while reachable from the owning root (the arena-level stand-in
    /// for the root back-reference).
    pub(crate) attached: bool,
    store: PropertyStore,
    table: &'static PropertyTable,
    pub(crate) policy: PolicyHandle,
    pub(crate) platform: Option<Rc<dyn PlatformNode>>,
    pub(crate) suspended_parts: CompositionParts,

    pub(crate) desired_size: Option<Size>,
    pub(crate) arranged_rect: Option<Rect>,
    pub(crate) render_rect: Option<Rect>,
    /// Root-space bounding box of the render rect, for the spatial index.
    pub(crate) absolute_bounds: Option<Rect>,
    /// Root-space transform cached by the last render, so a mid-tree
    /// re-render can compose against the parent without a root walk.
    pub(crate) world_transform: Transform,
    pub(crate) last_measure_constraint: Option<Size>,
    pub(crate) last_arrange_rect: Option<Rect>,

    /// Distance from the root.
    pub(crate) level: u32,
    /// Pre-order index in paint order; recomputed after structural or
    /// z-order changes.
    pub(crate) view_order: u32,
    /// Position within the parent's child collection.
    pub(crate) sibling_index: u32,
}

impl Visual {
    pub(crate) fn new(id: VisualId, policy: PolicyHandle, table: &'static PropertyTable) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            attached: false,
            store: PropertyStore::new(),
            table,
            policy,
            platform: None,
            suspended_parts: CompositionParts::NONE,
            desired_size: None,
            arranged_rect: None,
            render_rect: None,
            absolute_bounds: None,
            world_transform: Transform::IDENTITY,
            last_measure_constraint: None,
            last_arrange_rect: None,
            level: 0,
            view_order: 0,
            sibling_index: 0,
        }
    }

    pub fn id(&self) -> VisualId {
        self.id
    }

    pub fn parent(&self) -> Option<VisualId> {
        self.parent
    }

    pub fn children(&self) -> &[VisualId] {
        &self.children
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn view_order(&self) -> u32 {
        self.view_order
    }

    pub fn table(&self) -> &'static PropertyTable {
        self.table
    }

    pub(crate) fn store(&self) -> &PropertyStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut PropertyStore {
        &mut self.store
    }

    /// Cross-thread read handle for this node's properties.
    pub fn property_reader(&self) -> PropertyReader {
        self.store.reader()
    }

    /// Stored value, or the most-derived default when absent.
    pub fn property(&self, key: trellis_core::PropertyKey) -> Option<PropertyValue> {
        self.store
            .get(key)
            .or_else(|| self.table.default_value(key))
    }

    pub fn desired_size(&self) -> Option<Size> {
        self.desired_size
    }

    pub fn arranged_rect(&self) -> Option<Rect> {
        self.arranged_rect
    }

    pub fn render_rect(&self) -> Option<Rect> {
        self.render_rect
    }

    pub fn absolute_bounds(&self) -> Option<Rect> {
        self.absolute_bounds
    }

    pub(crate) fn clear_layout_caches(&mut self) {
        self.desired_size = None;
        self.arranged_rect = None;
        self.render_rect = None;
        self.absolute_bounds = None;
        self.last_measure_constraint = None;
        self.last_arrange_rect = None;
    }

    // --- typed accessors over the built-in properties ---------------------

    fn float_property(&self, key: trellis_core::PropertyKey) -> f32 {
        self.property(key).and_then(|v| v.as_float()).unwrap_or(0.0)
    }

    fn bool_property(&self, key: trellis_core::PropertyKey) -> bool {
        self.property(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Explicit width, if set. NaN (the default) means auto.
    pub fn explicit_width(&self) -> Option<f32> {
        let keys = builtin::keys();
        if !self.store.contains(keys.width) {
            return None;
        }
        let value = self.float_property(keys.width);
        (!value.is_nan()).then_some(value)
    }

    /// Explicit height, if set.
    pub fn explicit_height(&self) -> Option<f32> {
        let keys = builtin::keys();
        if !self.store.contains(keys.height) {
            return None;
        }
        let value = self.float_property(keys.height);
        (!value.is_nan()).then_some(value)
    }

    /// True when both Width and Height are explicitly set. Min/Max bounds
    /// deliberately do not count: only a full explicit size pins the node's
    /// slot in the parent and lets parent propagation be skipped.
    pub fn is_size_set(&self) -> bool {
        self.explicit_width().is_some() && self.explicit_height().is_some()
    }

    pub fn min_width(&self) -> f32 {
        self.float_property(builtin::keys().min_width)
    }

    pub fn max_width(&self) -> f32 {
        let value = self.float_property(builtin::keys().max_width);
        if value.is_nan() {
            f32::INFINITY
        } else {
            value
        }
    }

    pub fn min_height(&self) -> f32 {
        self.float_property(builtin::keys().min_height)
    }

    pub fn max_height(&self) -> f32 {
        let value = self.float_property(builtin::keys().max_height);
        if value.is_nan() {
            f32::INFINITY
        } else {
            value
        }
    }

    pub fn margin(&self) -> Thickness {
        self.property(builtin::keys().margin)
            .and_then(|v| v.as_thickness())
            .unwrap_or(Thickness::ZERO)
    }

    pub fn h_align(&self) -> HorizontalAlignment {
        self.property(builtin::keys().h_align)
            .and_then(|v| v.as_h_align())
            .unwrap_or_default()
    }

    pub fn v_align(&self) -> VerticalAlignment {
        self.property(builtin::keys().v_align)
            .and_then(|v| v.as_v_align())
            .unwrap_or_default()
    }

    pub fn is_visible(&self) -> bool {
        self.property(builtin::keys().is_visible)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    pub fn opacity(&self) -> f32 {
        self.property(builtin::keys().opacity)
            .and_then(|v| v.as_float())
            .unwrap_or(1.0)
    }

    /// Explicit z-index override; absent means sibling insertion order.
    pub fn z_index_override(&self) -> Option<i32> {
        let keys = builtin::keys();
        if !self.store.contains(keys.z_index) {
            return None;
        }
        self.property(keys.z_index).and_then(|v| v.as_int())
    }

    /// Resolved z-index: explicit override, or the sibling insertion
    /// position by default.
    pub fn resolved_z_index(&self) -> i32 {
        self.z_index_override()
            .unwrap_or(self.sibling_index as i32)
    }

    pub fn clips_children(&self) -> bool {
        self.bool_property(builtin::keys().clip_children)
    }

    pub fn clips_from_parent(&self) -> bool {
        self.property(builtin::keys().clip_from_parent)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    pub fn is_hit_test_visible(&self) -> bool {
        self.property(builtin::keys().is_hit_test_visible)
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    pub fn is_focusable(&self) -> bool {
        self.bool_property(builtin::keys().is_focusable)
    }

    pub fn is_modal_scope(&self) -> bool {
        self.bool_property(builtin::keys().is_modal_scope)
    }

    pub fn uses_layout_rounding(&self) -> bool {
        self.bool_property(builtin::keys().use_layout_rounding)
    }

    pub fn render_transform(&self) -> Transform {
        self.property(builtin::keys().render_transform)
            .and_then(|v| v.as_transform())
            .unwrap_or(Transform::IDENTITY)
    }

    // --- platform binding --------------------------------------------------

    pub fn platform_node(&self) -> Option<&Rc<dyn PlatformNode>> {
        self.platform.as_ref()
    }

    pub fn suspended_parts(&self) -> CompositionParts {
        self.suspended_parts
    }
}
