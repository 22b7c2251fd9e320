//! Steering-angle estimation from detected lane lines, plus the per-frame
//! rate limiter that keeps the command from jumping.
//!
//! Angle convention: integer degrees in [0, 180], 90 = straight ahead,
//! below 90 = left, above 90 = right.

use crate::types::{LaneLine, NO_LANE_ANGLE};
use tracing::debug;

/// Estimate the raw steering angle from the current lane lines.
///
/// - 0 lines: returns [`NO_LANE_ANGLE`]; callers hold the previous angle.
/// - 1 line: follow that line's direction (offset = x2 - x1).
/// - 2 lines: steer toward the midpoint of the two upper endpoints, corrected
///   by `camera_mid_offset_percent` for camera mounting skew.
pub fn compute_steering_angle(
    width: usize,
    height: usize,
    lane_lines: &[LaneLine],
    camera_mid_offset_percent: f32,
) -> i32 {
    if lane_lines.is_empty() {
        debug!("no lane lines detected, do nothing");
        return NO_LANE_ANGLE;
    }

    let x_offset = if lane_lines.len() == 1 {
        debug!("only one lane line detected, following it: {:?}", lane_lines[0]);
        (lane_lines[0].x2 - lane_lines[0].x1) as f64
    } else {
        let mid_x = (width as f64 / 2.0) * (1.0 + camera_mid_offset_percent as f64);
        let lane_center = (lane_lines[0].x2 + lane_lines[1].x2) as f64 / 2.0;
        lane_center - mid_x
    };

    // Angle between the heading direction and the vertical center line,
    // measured against half the frame height.
    let y_offset = height as f64 / 2.0;
    let angle_to_mid_deg = (x_offset / y_offset).atan().to_degrees().round() as i32;
    let steering_angle = angle_to_mid_deg + 90;

    debug!("new steering angle: {}", steering_angle);
    steering_angle
}

/// Rate-limit the change from `current` to `proposed`.
///
/// With both lane lines visible the estimate is trustworthy enough for a 5°
/// step per frame; with one line (or an external angle source) only 1°. Within
/// the band the proposed angle is adopted outright; outside it the output
/// moves exactly the allowed amount toward the proposal, however large the
/// jump. This bounds instantaneous change only; it is not a low-pass filter.
pub fn stabilize_steering_angle(
    current: i32,
    proposed: i32,
    num_lane_lines: usize,
    max_deviation_two_lanes: i32,
    max_deviation_one_lane: i32,
) -> i32 {
    let max_deviation = if num_lane_lines == 2 {
        max_deviation_two_lanes
    } else {
        max_deviation_one_lane
    };

    let deviation = proposed - current;
    let stabilized = if deviation.abs() > max_deviation {
        current + max_deviation * deviation.signum()
    } else {
        proposed
    };
    debug!("proposed angle: {}, stabilized angle: {}", proposed, stabilized);
    stabilized
}
