//! Simulated inputs: a synthetic road camera and a scripted object detector.
//! These let the full control loop run on a development machine with no
//! camera, no detector model, and no vehicle attached.

use crate::driver::{DetectionSource, FrameSource};
use crate::types::{DetectedObject, Frame};
use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

/// Frame interval at the nominal 30fps camera rate.
const FRAME_INTERVAL_MS: f64 = 1000.0 / 30.0;
/// Lane-marker paint color (pure blue, hue 240).
const MARKER_COLOR: [u8; 3] = [0, 0, 255];
const MARKER_WIDTH_PX: usize = 4;

/// Emits frames of a straight two-marker road whose center drifts sideways a
/// fixed amount per frame, so the steering loop has something to chase.
pub struct SyntheticRoadSource {
    width: usize,
    height: usize,
    total_frames: u64,
    emitted: u64,
    drift_px_per_frame: f64,
}

impl SyntheticRoadSource {
    pub fn new(width: usize, height: usize, total_frames: u64, drift_px_per_frame: f64) -> Self {
        Self {
            width,
            height,
            total_frames,
            emitted: 0,
            drift_px_per_frame,
        }
    }

    fn paint_road(&self, frame: &mut Frame) {
        let center = self.width as f64 / 2.0 + self.drift_px_per_frame * self.emitted as f64;
        let half_gap = self.width as f64 * 0.3;

        // Markers start at the bottom edge and converge toward the top of the
        // lower half, the way a straight road projects into the camera.
        let rows = self.height / 2;
        for step in 0..rows {
            let y = self.height - 1 - step;
            let pinch = step as f64 * half_gap / (rows as f64 * 1.5);
            let left_x = center - half_gap + pinch;
            let right_x = center + half_gap - pinch;
            self.paint_marker(frame, y, left_x);
            self.paint_marker(frame, y, right_x);
        }
    }

    fn paint_marker(&self, frame: &mut Frame, y: usize, x_center: f64) {
        for t in 0..MARKER_WIDTH_PX {
            let x = x_center as i64 + t as i64 - (MARKER_WIDTH_PX / 2) as i64;
            if x < 0 || x >= self.width as i64 {
                continue;
            }
            let i = (y * self.width + x as usize) * 3;
            frame.data[i..i + 3].copy_from_slice(&MARKER_COLOR);
        }
    }
}

impl FrameSource for SyntheticRoadSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.emitted >= self.total_frames {
            debug!("synthetic road exhausted after {} frames", self.emitted);
            return Ok(None);
        }
        let mut frame = Frame::new(
            self.width,
            self.height,
            self.emitted as f64 * FRAME_INTERVAL_MS,
        );
        self.paint_road(&mut frame);
        self.emitted += 1;
        Ok(Some(frame))
    }
}

/// Replays detections at scripted frame indices; every other frame is clear.
pub struct ScriptedDetections {
    script: HashMap<u64, Vec<DetectedObject>>,
    frame_index: u64,
}

impl ScriptedDetections {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            frame_index: 0,
        }
    }

    /// Schedule `detections` for the given zero-based frame index.
    pub fn at(mut self, frame_index: u64, detections: Vec<DetectedObject>) -> Self {
        self.script.insert(frame_index, detections);
        self
    }
}

impl Default for ScriptedDetections {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionSource for ScriptedDetections {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectedObject>> {
        let dets = self.script.get(&self.frame_index).cloned().unwrap_or_default();
        self.frame_index += 1;
        Ok(dets)
    }
}
