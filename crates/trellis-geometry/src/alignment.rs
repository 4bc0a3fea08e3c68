//! Alignment utilities for positioning content within an arranged slot

/// Alignment along the horizontal axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    /// Fill the available width.
    #[default]
    Stretch,
    /// Center within the available width.
    Center,
    /// Align to the leading edge.
    Near,
    /// Align to the trailing edge.
    Far,
}

impl HorizontalAlignment {
    /// Computes `(offset, length)` for a child of the desired length inside
    /// the available span. `Stretch` consumes the whole span; the others
    /// keep the desired length and position it.
    pub fn align(&self, available: f32, desired: f32) -> (f32, f32) {
        align_axis(AxisAlignment::from_horizontal(*self), available, desired)
    }
}

/// Alignment along the vertical axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    /// Fill the available height.
    #[default]
    Stretch,
    /// Center within the available height.
    Center,
    /// Align to the top edge.
    Near,
    /// Align to the bottom edge.
    Far,
}

impl VerticalAlignment {
    /// Computes `(offset, length)` for a child of the desired length inside
    /// the available span.
    pub fn align(&self, available: f32, desired: f32) -> (f32, f32) {
        align_axis(AxisAlignment::from_vertical(*self), available, desired)
    }
}

#[derive(Clone, Copy)]
enum AxisAlignment {
    Stretch,
    Center,
    Near,
    Far,
}

impl AxisAlignment {
    fn from_horizontal(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Stretch => Self::Stretch,
            HorizontalAlignment::Center => Self::Center,
            HorizontalAlignment::Near => Self::Near,
            HorizontalAlignment::Far => Self::Far,
        }
    }

    fn from_vertical(alignment: VerticalAlignment) -> Self {
        match alignment {
            VerticalAlignment::Stretch => Self::Stretch,
            VerticalAlignment::Center => Self::Center,
            VerticalAlignment::Near => Self::Near,
            VerticalAlignment::Far => Self::Far,
        }
    }
}

fn align_axis(alignment: AxisAlignment, available: f32, desired: f32) -> (f32, f32) {
    // A child never grows past the available span, and never goes negative.
    let length = desired.min(available).max(0.0);
    match alignment {
        AxisAlignment::Stretch => (0.0, available.max(0.0)),
        AxisAlignment::Near => (0.0, length),
        AxisAlignment::Center => (((available - length) / 2.0).max(0.0), length),
        AxisAlignment::Far => ((available - length).max(0.0), length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretch_fills_available_span() {
        let (offset, length) = HorizontalAlignment::Stretch.align(100.0, 40.0);
        assert_eq!(offset, 0.0);
        assert_eq!(length, 100.0);
    }

    #[test]
    fn center_splits_leftover_evenly() {
        let (offset, length) = VerticalAlignment::Center.align(100.0, 40.0);
        assert_eq!(offset, 30.0);
        assert_eq!(length, 40.0);
    }

    #[test]
    fn far_pushes_to_trailing_edge() {
        let (offset, length) = HorizontalAlignment::Far.align(100.0, 40.0);
        assert_eq!(offset, 60.0);
        assert_eq!(length, 40.0);
    }

    #[test]
    fn oversized_child_is_clamped_to_available() {
        let (offset, length) = HorizontalAlignment::Center.align(50.0, 80.0);
        assert_eq!(offset, 0.0);
        assert_eq!(length, 50.0);
    }
}
