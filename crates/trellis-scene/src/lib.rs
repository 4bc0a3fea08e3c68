//! Retained-mode scene graph core: the visual tree, its three layout passes
//! (Measure, Arrange, Render), severity-ranked invalidation scheduling, the
//! hit-test spatial index, and keyboard focus traversal.
//!
//! The [`Window`] host coordinator owns everything and drives one
//! Measure→Arrange→Render sweep per coalesced wake-up. All mutation happens
//! on the UI-affinity thread; property reads are safe from anywhere via
//! [`trellis_core::PropertyReader`].

mod events;
mod focus;
mod layout;
mod platform;
mod policy;
mod properties;
mod scheduler;
mod spatial;
mod tasks;
mod tree;
mod visual;
mod window;

pub use events::{EventBus, LifecycleEvent, SubscriptionId};
pub use focus::{next_focusable, focusable_sibling, FocusDirection};
pub use layout::{ArrangeScope, MeasureScope};
pub use platform::{CompositionParts, PlatformNode};
pub use policy::{DefaultPolicy, VisualPolicy};
pub use properties::{builtin, ChangedFn, ChangingFn, ConvertFn, PropertyMetadata, PropertyTable};
pub use scheduler::{HostWaker, InvalidationReason, InvalidationScheduler};
pub use spatial::SpatialIndex;
pub use tasks::{TaskHandle, WindowTask};
pub use tree::SceneTree;
pub use visual::Visual;
pub use window::{ObserverId, PropertyChangeKind, Window};

pub use trellis_core::{
    InvalidationSpec, PropertyKey, PropertyReader, PropertyValue, SceneError, SetOptions,
    Severity, VisualId,
};
pub use trellis_geometry::{
    HorizontalAlignment, Point, Rect, Size, Thickness, Transform, VerticalAlignment,
};
