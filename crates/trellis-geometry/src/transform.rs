//! 2D affine transform used to compose render bounds up the tree

use crate::{Point, Rect};

/// Row-major 2x3 affine transform.
///
/// Layout only ever composes translations and scales, but rotation-capable
/// storage keeps the platform synchronization contract general.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        dx: 0.0,
        dy: 0.0,
    };

    pub const fn translation(dx: f32, dy: f32) -> Self {
        Self {
            m11: 1.0,
            m12: 0.0,
            m21: 0.0,
            m22: 1.0,
            dx,
            dy,
        }
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m11: sx,
            m12: 0.0,
            m21: 0.0,
            m22: sy,
            dx: 0.0,
            dy: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns the transform that applies `self` first and `other` second.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            m11: self.m11 * other.m11 + self.m12 * other.m21,
            m12: self.m11 * other.m12 + self.m12 * other.m22,
            m21: self.m21 * other.m11 + self.m22 * other.m21,
            m22: self.m21 * other.m12 + self.m22 * other.m22,
            dx: self.dx * other.m11 + self.dy * other.m21 + other.dx,
            dy: self.dx * other.m12 + self.dy * other.m22 + other.dy,
        }
    }

    pub fn apply_point(&self, point: Point) -> Point {
        Point {
            x: point.x * self.m11 + point.y * self.m21 + self.dx,
            y: point.x * self.m12 + point.y * self.m22 + self.dy,
        }
    }

    /// Transforms a rect and returns the axis-aligned bounding box of the
    /// transformed corners.
    pub fn apply_rect(&self, rect: Rect) -> Rect {
        let corners = [
            self.apply_point(Point::new(rect.x, rect.y)),
            self.apply_point(Point::new(rect.right(), rect.y)),
            self.apply_point(Point::new(rect.x, rect.bottom())),
            self.apply_point(Point::new(rect.right(), rect.bottom())),
        ];
        let mut min_x = corners[0].x;
        let mut min_y = corners[0].y;
        let mut max_x = corners[0].x;
        let mut max_y = corners[0].y;
        for corner in &corners[1..] {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x);
            max_y = max_y.max(corner.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_then_scale_applies_in_order() {
        let transform = Transform::translation(10.0, 0.0).then(&Transform::scale(2.0, 2.0));
        let point = transform.apply_point(Point::new(1.0, 1.0));
        assert_eq!(point, Point::new(22.0, 2.0));
    }

    #[test]
    fn apply_rect_returns_bounding_box() {
        let transform = Transform::scale(2.0, 3.0);
        let rect = transform.apply_rect(Rect::new(1.0, 1.0, 2.0, 2.0));
        assert_eq!(rect, Rect::new(2.0, 3.0, 4.0, 6.0));
    }
}
