//! Platform render-node binding
//!
//! The render pass pushes logical state onto an opaque per-node platform
//! object (a compositor surface, a native layer, ...). The push is one-way:
//! the engine never reads platform state back. A parent widget can take over
//! synchronization of individual parts via the suspend mask, for example an
//! owning container animating a child's offset itself.

use trellis_geometry::{Rect, Size, Transform};

/// Bitmask of the individually suspendable composition parts.
///
/// A suspended part is skipped by the render pass until resumed; scale rides
/// the transform part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CompositionParts(u8);

impl CompositionParts {
    pub const NONE: CompositionParts = CompositionParts(0);
    pub const SIZE: CompositionParts = CompositionParts(1 << 0);
    pub const OFFSET: CompositionParts = CompositionParts(1 << 1);
    pub const VISIBILITY: CompositionParts = CompositionParts(1 << 2);
    pub const CLIP: CompositionParts = CompositionParts(1 << 3);
    pub const OPACITY: CompositionParts = CompositionParts(1 << 4);
    pub const Z_ORDER: CompositionParts = CompositionParts(1 << 5);
    pub const TRANSFORM: CompositionParts = CompositionParts(1 << 6);

    pub const fn union(self, other: CompositionParts) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: CompositionParts) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn contains(self, part: CompositionParts) -> bool {
        self.0 & part.0 == part.0
    }
}

/// One platform render node, bound to a scene node once attached.
///
/// All setters are pure side-effecting pushes. Implementations use interior
/// mutability; the engine only ever holds a shared reference.
pub trait PlatformNode {
    fn set_size(&self, size: Size);
    /// Offset of the node's render rect relative to its parent's content box.
    fn set_offset(&self, x: f32, y: f32);
    fn set_visible(&self, visible: bool);
    /// Clip applied to this node's children (local coordinates), plus
    /// whether this node still honors its parent's clip.
    fn set_clip(&self, clip: Option<Rect>, inherit_parent_clip: bool);
    fn set_opacity(&self, opacity: f32);
    fn set_z_order(&self, z_order: i32);
    fn set_transform(&self, transform: Transform);
}
