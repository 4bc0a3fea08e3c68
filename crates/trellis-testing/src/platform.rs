//! A platform node that records every composition push for assertions

use std::cell::RefCell;

use trellis_geometry::{Rect, Size, Transform};
use trellis_scene::PlatformNode;

/// One push from the render pass to the platform layer.
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformCall {
    Size(Size),
    Offset(f32, f32),
    Visible(bool),
    Clip(Option<Rect>, bool),
    Opacity(f32),
    ZOrder(i32),
    Transform(Transform),
}

/// Records the calls the render pass makes, in order.
#[derive(Default)]
pub struct RecordingPlatformNode {
    calls: RefCell<Vec<PlatformCall>>,
}

impl RecordingPlatformNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Last visibility pushed, if any.
    pub fn last_visible(&self) -> Option<bool> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            PlatformCall::Visible(visible) => Some(*visible),
            _ => None,
        })
    }

    /// Last size pushed, if any.
    pub fn last_size(&self) -> Option<Size> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            PlatformCall::Size(size) => Some(*size),
            _ => None,
        })
    }

    pub fn last_offset(&self) -> Option<(f32, f32)> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            PlatformCall::Offset(x, y) => Some((*x, *y)),
            _ => None,
        })
    }

    fn record(&self, call: PlatformCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl PlatformNode for RecordingPlatformNode {
    fn set_size(&self, size: Size) {
        self.record(PlatformCall::Size(size));
    }

    fn set_offset(&self, x: f32, y: f32) {
        self.record(PlatformCall::Offset(x, y));
    }

    fn set_visible(&self, visible: bool) {
        self.record(PlatformCall::Visible(visible));
    }

    fn set_clip(&self, clip: Option<Rect>, inherit_parent_clip: bool) {
        self.record(PlatformCall::Clip(clip, inherit_parent_clip));
    }

    fn set_opacity(&self, opacity: f32) {
        self.record(PlatformCall::Opacity(opacity));
    }

    fn set_z_order(&self, z_order: i32) {
        self.record(PlatformCall::ZOrder(z_order));
    }

    fn set_transform(&self, transform: Transform) {
        self.record(PlatformCall::Transform(transform));
    }
}
