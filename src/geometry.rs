//! Pure line geometry shared by the lane detector and the steering code.

use crate::types::{LaneLine, LineSegment};

/// Slope magnitudes below this are treated as degenerate; see `make_points`.
const SLOPE_EPSILON: f64 = 0.001;

/// Angles this close to straight ahead skip the tangent projection entirely.
const STRAIGHT_ANGLE_EPSILON: f64 = 0.1;

pub fn segment_length(seg: &LineSegment) -> f64 {
    let dx = (seg.x2 - seg.x1) as f64;
    let dy = (seg.y2 - seg.y1) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Convert an averaged (slope, intercept) fit into a lane line spanning from
/// the frame bottom up to mid-height.
///
/// A near-zero slope would send x to infinity when solving `x = (y - b) / m`,
/// so that case falls back to a vertical line through the horizontal center.
/// Otherwise x is clamped into [-width, 2*width] to avoid wild extrapolation
/// from short, noisy segments.
pub fn make_points(width: usize, height: usize, slope: f64, intercept: f64) -> LaneLine {
    let y1 = height as i32;
    let y2 = (height / 2) as i32;

    if slope.abs() < SLOPE_EPSILON {
        let mid_x = (width / 2) as i32;
        return LaneLine::new(mid_x, y1, mid_x, y2);
    }

    let clamp_x = |y: i32| -> i32 {
        let x = (y as f64 - intercept) / slope;
        let bounded = x.max(-(width as f64)).min(2.0 * width as f64);
        bounded as i32
    };

    LaneLine::new(clamp_x(y1), y1, clamp_x(y2), y2)
}

/// Project the heading indicator for an annotated frame: a line from the
/// bottom-center of the frame toward mid-height in the direction the steering
/// angle points.
///
/// The x displacement is `height/2 / tan(angle)`; at 90° the tangent blows up,
/// so angles within 0.1° of straight draw a plain vertical line instead.
pub fn heading_line(width: usize, height: usize, steering_angle: i32) -> LineSegment {
    let x1 = (width / 2) as i32;
    let y1 = height as i32;
    let y2 = (height / 2) as i32;

    let angle = steering_angle as f64;
    if (angle - 90.0).abs() < STRAIGHT_ANGLE_EPSILON {
        return LineSegment::new(x1, y1, x1, y2);
    }

    let radians = angle / 180.0 * std::f64::consts::PI;
    let x2 = x1 - ((height as f64 / 2.0) / radians.tan()) as i32;
    LineSegment::new(x1, y1, x2, y2)
}
