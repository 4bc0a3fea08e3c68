//! Property keys, tagged property values, and set-operation options

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use trellis_geometry::{
    HorizontalAlignment, Point, Rect, Size, Thickness, Transform, VerticalAlignment,
};

static NEXT_PROPERTY_KEY: AtomicU32 = AtomicU32::new(1);

/// Identity of a property descriptor.
///
/// Keys are allocated once per process at registration time and shared by
/// every redeclaration of the property: a subtype overriding a property's
/// default or invalidation spec keys its override with the same identity,
/// so per-instance storage stays identity-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey(u32);

impl PropertyKey {
    /// Allocates a fresh process-wide key.
    pub fn next() -> Self {
        Self(NEXT_PROPERTY_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Current value of a property: a small tagged union covering every type
/// the layout engine stores.
///
/// `Text` uses `Arc<str>` so values stay cheap to clone and safe to read
/// from background threads.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Size(Size),
    Point(Point),
    Rect(Rect),
    Thickness(Thickness),
    HAlign(HorizontalAlignment),
    VAlign(VerticalAlignment),
    Transform(Transform),
    Text(Arc<str>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_thickness(&self) -> Option<Thickness> {
        match self {
            PropertyValue::Thickness(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_h_align(&self) -> Option<HorizontalAlignment> {
        match self {
            PropertyValue::HAlign(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_v_align(&self) -> Option<VerticalAlignment> {
        match self {
            PropertyValue::VAlign(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_transform(&self) -> Option<Transform> {
        match self {
            PropertyValue::Transform(value) => Some(*value),
            _ => None,
        }
    }

    /// Natural equality used for the set-time short circuit. Floats compare
    /// by value (NaN never equals NaN, so a NaN write is never silently
    /// dropped); text compares by content.
    pub fn value_eq(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a == b,
            (PropertyValue::Size(a), PropertyValue::Size(b)) => a == b,
            (PropertyValue::Point(a), PropertyValue::Point(b)) => a == b,
            (PropertyValue::Rect(a), PropertyValue::Rect(b)) => a == b,
            (PropertyValue::Thickness(a), PropertyValue::Thickness(b)) => a == b,
            (PropertyValue::HAlign(a), PropertyValue::HAlign(b)) => a == b,
            (PropertyValue::VAlign(a), PropertyValue::VAlign(b)) => a == b,
            (PropertyValue::Transform(a), PropertyValue::Transform(b)) => a == b,
            (PropertyValue::Text(a), PropertyValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

/// Options that tune one `try_set` call.
///
/// Equality testing and the changing/changed notifications are individually
/// suppressible; `force_changed_event` fires the changed notification even
/// when the committed value equals the previous one (used by hosts that
/// re-push platform state after reattach).
#[derive(Clone, Copy, Debug, Default)]
pub struct SetOptions {
    pub suppress_equality_check: bool,
    pub suppress_changing_event: bool,
    pub suppress_changed_event: bool,
    pub force_changed_event: bool,
}

impl SetOptions {
    pub const DEFAULT: SetOptions = SetOptions {
        suppress_equality_check: false,
        suppress_changing_event: false,
        suppress_changed_event: false,
        force_changed_event: false,
    };
}
