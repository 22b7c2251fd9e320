use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub lane: LaneConfig,
    pub steering: SteeringConfig,
    pub objects: ObjectConfig,
    pub logging: LoggingConfig,
}

/// Tuning for the classical lane-detection pipeline. The Hough parameters are
/// hand-tuned constants, not derived values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Hue band of the lane-marker color, degrees in [0, 360).
    pub hue_min: f32,
    pub hue_max: f32,
    /// Minimum saturation (0-100) and value (0-255) for a marker pixel.
    pub sat_min: f32,
    pub val_min: f32,
    /// Hysteresis thresholds on the Sobel gradient magnitude.
    pub edge_low_threshold: f32,
    pub edge_high_threshold: f32,
    /// Minimum accumulator votes before a line is considered present.
    pub hough_threshold: u32,
    /// Minimum segment length in pixels.
    pub min_line_length: u32,
    /// Maximum gap in pixels merged into one segment.
    pub max_line_gap: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteeringConfig {
    /// Calibration for camera mounting skew: 0.0 = camera points dead center,
    /// positive = camera skewed right. Tuned per vehicle.
    pub camera_mid_offset_percent: f32,
    /// Allowed per-frame angle change when both lane lines are visible.
    pub max_deviation_two_lanes: i32,
    /// Allowed per-frame angle change otherwise.
    pub max_deviation_one_lane: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Initial speed limit, also the cruising speed when the road is clear.
    pub speed_limit: u32,
    /// Bounding-box height as a fraction of frame height before an object is
    /// considered close enough to act on.
    pub min_height_pct: f32,
    pub stop_sign_wait_secs: f64,
    /// How long a full stop is held before the next speed command may raise it.
    pub stop_dwell_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// One camera frame, raw RGB in HWC order.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

impl Frame {
    pub fn new(width: usize, height: usize, timestamp_ms: f64) -> Self {
        Self {
            data: vec![0u8; width * height * 3],
            width,
            height,
            timestamp_ms,
        }
    }
}

/// A line segment in frame-pixel coordinates, ordered (x1,y1)→(x2,y2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// One inferred lane boundary, always expressed bottom-to-top:
/// y1 = frame bottom, y2 = frame mid-height. A detection result holds 0, 1, or
/// 2 of these; with 2, index 0 is the negative-slope (left) line and index 1
/// the positive-slope (right) line.
pub type LaneLine = LineSegment;

/// Steering angle sentinel meaning "no lane information this frame".
/// Callers must hold the previous angle rather than steer toward this value.
pub const NO_LANE_ANGLE: i32 = -90;

/// Commanded vehicle state for one control cycle. Seeded fresh each frame from
/// the persistent speed limit, then mutated by every near traffic object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleState {
    /// Commanded speed, 0 = stopped.
    pub speed: u32,
    /// Ceiling on speed.
    pub speed_limit: u32,
    pub steering_angle: i32,
}

impl VehicleState {
    pub fn new(speed: u32, speed_limit: u32) -> Self {
        Self {
            speed,
            speed_limit,
            steering_angle: 90,
        }
    }
}

/// Road-object classes the detection source can report. Labels map 1:1 to
/// reactive handlers via the table in `object_controller`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectLabel {
    GreenLight,
    Person,
    RedLight,
    SpeedLimit25,
    SpeedLimit40,
    StopSign,
}

impl ObjectLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectLabel::GreenLight => "Green Traffic Light",
            ObjectLabel::Person => "Person",
            ObjectLabel::RedLight => "Red Traffic Light",
            ObjectLabel::SpeedLimit25 => "Speed Limit 25",
            ObjectLabel::SpeedLimit40 => "Speed Limit 40",
            ObjectLabel::StopSign => "Stop Sign",
        }
    }
}

/// Axis-aligned bounding box, top-left and bottom-right in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One detection from the external object-detection source. Read-only here.
#[derive(Debug, Clone, Copy)]
pub struct DetectedObject {
    pub label: ObjectLabel,
    pub score: f32,
    pub bounding_box: BoundingBox,
}
