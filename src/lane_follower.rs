//! Per-frame lane-following controller: detector → estimator → stabilizer,
//! then command dispatch and heading annotation.

use crate::actuator::Actuator;
use crate::annotate;
use crate::lane_detector;
use crate::steering::{compute_steering_angle, stabilize_steering_angle};
use crate::types::{Frame, LaneConfig, SteeringConfig};
use anyhow::Result;
use tracing::{debug, info, warn};

pub struct LaneFollower {
    lane_config: LaneConfig,
    steering_config: SteeringConfig,
    current_steering_angle: i32,
}

impl LaneFollower {
    pub fn new(lane_config: LaneConfig, steering_config: SteeringConfig) -> Self {
        info!("creating lane follower");
        Self {
            lane_config,
            steering_config,
            current_steering_angle: 90,
        }
    }

    pub fn current_steering_angle(&self) -> i32 {
        self.current_steering_angle
    }

    /// Process one frame: detect lane lines, update the steering angle, and
    /// command the actuator.
    ///
    /// Zero lane lines is the explicit "do nothing" case: the previous angle
    /// holds (and stays in force at the servo), and the frame comes back
    /// without a heading overlay.
    pub fn follow_lane(&mut self, frame: &Frame, actuator: &mut dyn Actuator) -> Result<Frame> {
        let (lane_lines, annotated) = lane_detector::detect(frame, &self.lane_config);

        if lane_lines.is_empty() {
            warn!("no lane lines detected, holding steering at {}", self.current_steering_angle);
            return Ok(annotated);
        }

        let proposed = compute_steering_angle(
            frame.width,
            frame.height,
            &lane_lines,
            self.steering_config.camera_mid_offset_percent,
        );
        self.current_steering_angle = stabilize_steering_angle(
            self.current_steering_angle,
            proposed,
            lane_lines.len(),
            self.steering_config.max_deviation_two_lanes,
            self.steering_config.max_deviation_one_lane,
        );

        actuator.set_steering_angle(self.current_steering_angle)?;
        debug!("steering at {}", self.current_steering_angle);

        Ok(annotate::draw_heading(&annotated, self.current_steering_angle))
    }

    /// Steer from an externally supplied raw angle (e.g. a learned model),
    /// bypassing detection and estimation but not stabilization or dispatch.
    ///
    /// The lane count is unknown on this path, so the conservative one-lane
    /// deviation band applies.
    pub fn follow_with_angle(
        &mut self,
        frame: &Frame,
        raw_angle: i32,
        actuator: &mut dyn Actuator,
    ) -> Result<Frame> {
        let proposed = raw_angle.clamp(0, 180);
        self.current_steering_angle = stabilize_steering_angle(
            self.current_steering_angle,
            proposed,
            1,
            self.steering_config.max_deviation_two_lanes,
            self.steering_config.max_deviation_one_lane,
        );

        actuator.set_steering_angle(self.current_steering_angle)?;
        Ok(annotate::draw_heading(frame, self.current_steering_angle))
    }
}
