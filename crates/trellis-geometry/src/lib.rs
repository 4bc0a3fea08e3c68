//! Geometry contracts & units for Trellis

mod alignment;
mod geometry;
mod transform;

pub use alignment::*;
pub use geometry::*;
pub use transform::*;

pub mod prelude {
    pub use crate::alignment::{HorizontalAlignment, VerticalAlignment};
    pub use crate::geometry::{Point, Rect, Size, Thickness};
    pub use crate::transform::Transform;
}
