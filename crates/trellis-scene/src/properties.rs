//! Property descriptor tables with most-derived override resolution
//!
//! Every node class carries a static table of property metadata chained to
//! its base class's table. Resolution walks the chain once, most-derived
//! first: a subtype redeclares a property by re-listing its key with a
//! different default or invalidation spec, while per-instance storage stays
//! keyed by the shared identity.

use std::sync::OnceLock;

use trellis_core::{InvalidationSpec, PropertyKey, PropertyValue};
use trellis_geometry::{
    HorizontalAlignment, Thickness, Transform, VerticalAlignment,
};

use crate::visual::Visual;

/// Converts a raw value before the equality check and veto run.
pub type ConvertFn = fn(&Visual, PropertyValue) -> PropertyValue;
/// Vetoes a pending change. Returning `false` aborts the set as a no-op.
pub type ChangingFn = fn(&Visual, new: &PropertyValue, old: Option<&PropertyValue>) -> bool;
/// Runs after the value is committed, before notifications fan out.
pub type ChangedFn = fn(&mut Visual, new: &PropertyValue, old: Option<&PropertyValue>);

/// Immutable declaration of one settable attribute.
pub struct PropertyMetadata {
    pub key: PropertyKey,
    pub name: &'static str,
    pub default: PropertyValue,
    pub convert: Option<ConvertFn>,
    pub changing: Option<ChangingFn>,
    pub changed: Option<ChangedFn>,
    /// Properties whose observers are notified after this one changes.
    pub dependents: Vec<PropertyKey>,
    /// True when a change can affect validation state; triggers the
    /// errors-changed notification.
    pub affects_validation: bool,
    pub invalidation: InvalidationSpec,
}

impl PropertyMetadata {
    pub fn new(
        key: PropertyKey,
        name: &'static str,
        default: PropertyValue,
        invalidation: InvalidationSpec,
    ) -> Self {
        Self {
            key,
            name,
            default,
            convert: None,
            changing: None,
            changed: None,
            dependents: Vec::new(),
            affects_validation: false,
            invalidation,
        }
    }

    pub fn with_convert(mut self, convert: ConvertFn) -> Self {
        self.convert = Some(convert);
        self
    }

    pub fn with_changing(mut self, changing: ChangingFn) -> Self {
        self.changing = Some(changing);
        self
    }

    pub fn with_changed(mut self, changed: ChangedFn) -> Self {
        self.changed = Some(changed);
        self
    }

    pub fn with_dependents(mut self, dependents: Vec<PropertyKey>) -> Self {
        self.dependents = dependents;
        self
    }

    pub fn affecting_validation(mut self) -> Self {
        self.affects_validation = true;
        self
    }
}

/// Per-class property table, chained to the base class.
pub struct PropertyTable {
    class_name: &'static str,
    base: Option<&'static PropertyTable>,
    entries: Vec<PropertyMetadata>,
}

impl PropertyTable {
    pub fn new(
        class_name: &'static str,
        base: Option<&'static PropertyTable>,
        entries: Vec<PropertyMetadata>,
    ) -> Self {
        Self {
            class_name,
            base,
            entries,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Returns the most-derived metadata for the key, walking toward the
    /// base class only when this class does not redeclare it.
    pub fn resolve(&self, key: PropertyKey) -> Option<&PropertyMetadata> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .or_else(|| self.base.and_then(|base| base.resolve(key)))
    }

    /// Default value in effect for the key, after override resolution.
    pub fn default_value(&self, key: PropertyKey) -> Option<PropertyValue> {
        self.resolve(key).map(|entry| entry.default.clone())
    }
}

/// Built-in layout properties every visual understands.
pub mod builtin {
    use super::*;

    /// Keys of the built-in properties, allocated once per process.
    pub struct BuiltinKeys {
        pub width: PropertyKey,
        pub height: PropertyKey,
        pub min_width: PropertyKey,
        pub max_width: PropertyKey,
        pub min_height: PropertyKey,
        pub max_height: PropertyKey,
        pub margin: PropertyKey,
        pub h_align: PropertyKey,
        pub v_align: PropertyKey,
        pub is_visible: PropertyKey,
        pub opacity: PropertyKey,
        pub z_index: PropertyKey,
        pub clip_children: PropertyKey,
        pub clip_from_parent: PropertyKey,
        pub is_hit_test_visible: PropertyKey,
        pub is_focusable: PropertyKey,
        pub is_modal_scope: PropertyKey,
        pub use_layout_rounding: PropertyKey,
        pub render_transform: PropertyKey,
    }

    static KEYS: OnceLock<BuiltinKeys> = OnceLock::new();
    static BASE_TABLE: OnceLock<PropertyTable> = OnceLock::new();

    pub fn keys() -> &'static BuiltinKeys {
        KEYS.get_or_init(|| BuiltinKeys {
            width: PropertyKey::next(),
            height: PropertyKey::next(),
            min_width: PropertyKey::next(),
            max_width: PropertyKey::next(),
            min_height: PropertyKey::next(),
            max_height: PropertyKey::next(),
            margin: PropertyKey::next(),
            h_align: PropertyKey::next(),
            v_align: PropertyKey::next(),
            is_visible: PropertyKey::next(),
            opacity: PropertyKey::next(),
            z_index: PropertyKey::next(),
            clip_children: PropertyKey::next(),
            clip_from_parent: PropertyKey::next(),
            is_hit_test_visible: PropertyKey::next(),
            is_focusable: PropertyKey::next(),
            is_modal_scope: PropertyKey::next(),
            use_layout_rounding: PropertyKey::next(),
            render_transform: PropertyKey::next(),
        })
    }

    fn veto_negative_length(
        _owner: &Visual,
        new: &PropertyValue,
        _old: Option<&PropertyValue>,
    ) -> bool {
        match new.as_float() {
            Some(value) => value.is_nan() || value >= 0.0,
            None => false,
        }
    }

    fn clamp_opacity(_owner: &Visual, raw: PropertyValue) -> PropertyValue {
        match raw.as_float() {
            Some(value) => PropertyValue::Float(value.clamp(0.0, 1.0)),
            None => raw,
        }
    }

    /// The base table shared by every visual class.
    pub fn base_table() -> &'static PropertyTable {
        BASE_TABLE.get_or_init(|| {
            let keys = keys();
            let entries = vec![
                // Explicit size. Absent from the store means "auto"; the NaN
                // default is the sentinel read back for auto.
                PropertyMetadata::new(
                    keys.width,
                    "Width",
                    PropertyValue::Float(f32::NAN),
                    InvalidationSpec::MEASURE,
                )
                .with_changing(veto_negative_length)
                .affecting_validation(),
                PropertyMetadata::new(
                    keys.height,
                    "Height",
                    PropertyValue::Float(f32::NAN),
                    InvalidationSpec::MEASURE,
                )
                .with_changing(veto_negative_length)
                .affecting_validation(),
                PropertyMetadata::new(
                    keys.min_width,
                    "MinWidth",
                    PropertyValue::Float(0.0),
                    InvalidationSpec::MEASURE,
                )
                .with_changing(veto_negative_length)
                .with_dependents(vec![keys.width])
                .affecting_validation(),
                PropertyMetadata::new(
                    keys.max_width,
                    "MaxWidth",
                    PropertyValue::Float(f32::INFINITY),
                    InvalidationSpec::MEASURE,
                )
                .with_dependents(vec![keys.width])
                .affecting_validation(),
                PropertyMetadata::new(
                    keys.min_height,
                    "MinHeight",
                    PropertyValue::Float(0.0),
                    InvalidationSpec::MEASURE,
                )
                .with_changing(veto_negative_length)
                .with_dependents(vec![keys.height])
                .affecting_validation(),
                PropertyMetadata::new(
                    keys.max_height,
                    "MaxHeight",
                    PropertyValue::Float(f32::INFINITY),
                    InvalidationSpec::MEASURE,
                )
                .with_dependents(vec![keys.height])
                .affecting_validation(),
                PropertyMetadata::new(
                    keys.margin,
                    "Margin",
                    PropertyValue::Thickness(Thickness::ZERO),
                    InvalidationSpec::MEASURE,
                ),
                PropertyMetadata::new(
                    keys.h_align,
                    "HorizontalAlignment",
                    PropertyValue::HAlign(HorizontalAlignment::Stretch),
                    InvalidationSpec::ARRANGE,
                ),
                PropertyMetadata::new(
                    keys.v_align,
                    "VerticalAlignment",
                    PropertyValue::VAlign(VerticalAlignment::Stretch),
                    InvalidationSpec::ARRANGE,
                ),
                PropertyMetadata::new(
                    keys.is_visible,
                    "IsVisible",
                    PropertyValue::Bool(true),
                    InvalidationSpec::RENDER,
                ),
                PropertyMetadata::new(
                    keys.opacity,
                    "Opacity",
                    PropertyValue::Float(1.0),
                    InvalidationSpec::RENDER,
                )
                .with_convert(clamp_opacity),
                PropertyMetadata::new(
                    keys.z_index,
                    "ZIndex",
                    PropertyValue::Int(0),
                    InvalidationSpec::RENDER,
                ),
                PropertyMetadata::new(
                    keys.clip_children,
                    "ClipChildren",
                    PropertyValue::Bool(false),
                    InvalidationSpec::RENDER,
                ),
                PropertyMetadata::new(
                    keys.clip_from_parent,
                    "ClipFromParent",
                    PropertyValue::Bool(true),
                    InvalidationSpec::RENDER,
                ),
                PropertyMetadata::new(
                    keys.is_hit_test_visible,
                    "IsHitTestVisible",
                    PropertyValue::Bool(true),
                    InvalidationSpec::RENDER,
                ),
                PropertyMetadata::new(
                    keys.is_focusable,
                    "IsFocusable",
                    PropertyValue::Bool(false),
                    InvalidationSpec::NONE,
                ),
                PropertyMetadata::new(
                    keys.is_modal_scope,
                    "IsModalScope",
                    PropertyValue::Bool(false),
                    InvalidationSpec::NONE,
                ),
                PropertyMetadata::new(
                    keys.use_layout_rounding,
                    "UseLayoutRounding",
                    PropertyValue::Bool(false),
                    InvalidationSpec::ARRANGE,
                ),
                PropertyMetadata::new(
                    keys.render_transform,
                    "RenderTransform",
                    PropertyValue::Transform(Transform::IDENTITY),
                    InvalidationSpec::RENDER,
                ),
            ];
            PropertyTable::new("Visual", None, entries)
        })
    }
}
