// src/geometry.rs
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A landmark position in normalized image coordinates.
///
/// Origin is the top-left corner of the frame, `y` grows downward, and both
/// axes are roughly within `[0, 1]` for points inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_vector(self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Pixel position of this point in a `width` x `height` frame.
    pub fn to_pixel(self, width: u32, height: u32) -> (f32, f32) {
        ((self.x * width as f64) as f32, (self.y * height as f64) as f32)
    }
}

/// Angle at vertex `b` from ray `b->a` to ray `b->c`, in degrees.
///
/// The result is the signed difference of the two ray headings, shifted into
/// `[0, 360)` when negative. It is not the unsigned interior angle, so
/// swapping `a` and `c` generally gives `360 - angle`. Zero-length rays use
/// `atan2(0, 0) = 0` and are not rejected. A tiny negative difference that
/// rounds up to 360 after the shift is reported as 0.
pub fn joint_angle(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let ray_a = a.to_vector() - b.to_vector();
    let ray_c = c.to_vector() - b.to_vector();

    let radians = ray_c.y.atan2(ray_c.x) - ray_a.y.atan2(ray_a.x);
    let degrees = radians.to_degrees();

    let wrapped = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
