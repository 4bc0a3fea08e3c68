//! Testing utilities and harness for Trellis

pub mod platform;
pub mod policies;
pub mod rule;

pub use platform::{PlatformCall, RecordingPlatformNode};
pub use policies::{FixedSizePolicy, VerticalStackPolicy};
pub use rule::{SceneTestRule, TestWaker};

pub mod prelude {
    pub use crate::platform::{PlatformCall, RecordingPlatformNode};
    pub use crate::policies::{FixedSizePolicy, VerticalStackPolicy};
    pub use crate::rule::{SceneTestRule, TestWaker};
}
