//! Top-level drive loop: pull frames, react to road objects, follow the lane.
//!
//! The loop is synchronous and single-threaded. Object reactions run before
//! lane following on every frame so that a stop decision is already in force
//! by the time the steering command for the same frame goes out.

use crate::actuator::Actuator;
use crate::clock::Clock;
use crate::lane_follower::LaneFollower;
use crate::object_controller::ObjectsOnRoadProcessor;
use crate::types::{Config, DetectedObject, Frame};
use anyhow::Result;
use tracing::{debug, info};

/// Supplies camera frames. `Ok(None)` means the source is cleanly exhausted
/// (end of a recorded run, simulation finished); errors are fatal to the loop.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Produces road-object detections for a frame. Implementations wrap whatever
/// detector is available (a scripted scenario, an accelerator-backed model).
pub trait DetectionSource {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedObject>>;
}

/// Consumes annotated output frames (display, disk recorder).
pub trait FrameSink {
    fn write(&mut self, frame: &Frame) -> Result<()>;
}

/// Discards every frame. Useful when running headless.
pub struct NullSink;

impl FrameSink for NullSink {
    fn write(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DriveStats {
    pub frames_processed: u64,
    pub final_steering_angle: i32,
    pub final_speed: u32,
    pub final_speed_limit: u32,
}

pub struct Driver<A: Actuator, C: Clock> {
    actuator: A,
    lane_follower: LaneFollower,
    object_processor: ObjectsOnRoadProcessor<C>,
}

impl<A: Actuator, C: Clock> Driver<A, C> {
    pub fn new(config: &Config, actuator: A, clock: C) -> Self {
        info!("creating driver");
        Self {
            actuator,
            lane_follower: LaneFollower::new(config.lane.clone(), config.steering.clone()),
            object_processor: ObjectsOnRoadProcessor::new(config.objects.clone(), clock),
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Run the control loop until the frame source is exhausted.
    pub fn drive(
        &mut self,
        frames: &mut dyn FrameSource,
        detector: &mut dyn DetectionSource,
        sink: &mut dyn FrameSink,
    ) -> Result<DriveStats> {
        let mut stats = DriveStats::default();

        while let Some(frame) = frames.next_frame()? {
            let annotated = self.process_frame(&frame, detector)?;
            sink.write(&annotated)?;
            stats.frames_processed += 1;
            debug!("frame {} processed", stats.frames_processed);
        }

        stats.final_steering_angle = self.lane_follower.current_steering_angle();
        stats.final_speed = self.object_processor.speed();
        stats.final_speed_limit = self.object_processor.speed_limit();
        info!(
            "drive finished: {} frames, steering {}, speed {}/{}",
            stats.frames_processed,
            stats.final_steering_angle,
            stats.final_speed,
            stats.final_speed_limit
        );
        Ok(stats)
    }

    /// Process one frame end to end and return the annotated output.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        detector: &mut dyn DetectionSource,
    ) -> Result<Frame> {
        let detections = detector.detect(frame)?;
        self.object_processor
            .process(&detections, frame.height, &mut self.actuator)?;
        self.lane_follower.follow_lane(frame, &mut self.actuator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockActuator;
    use crate::clock::testing::FakeClock;
    use crate::types::{BoundingBox, ObjectLabel};

    /// Fixed number of blank frames.
    struct BlankFrames {
        remaining: u32,
        width: usize,
        height: usize,
    }

    impl FrameSource for BlankFrames {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(Frame::new(self.width, self.height, 0.0)))
        }
    }

    /// Replays a fixed per-frame detection script, then nothing.
    struct Script {
        frames: Vec<Vec<DetectedObject>>,
        next: usize,
    }

    impl DetectionSource for Script {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectedObject>> {
            let dets = self.frames.get(self.next).cloned().unwrap_or_default();
            self.next += 1;
            Ok(dets)
        }
    }

    fn near_person() -> DetectedObject {
        DetectedObject {
            label: ObjectLabel::Person,
            score: 0.9,
            bounding_box: BoundingBox::new(100.0, 100.0, 200.0, 250.0),
        }
    }

    #[test]
    fn test_drive_consumes_source_and_reports_stats() {
        let config = Config::default();
        let mut driver = Driver::new(&config, MockActuator::new(), FakeClock::new());
        let mut frames = BlankFrames { remaining: 3, width: 64, height: 64 };
        let mut detector = Script { frames: vec![], next: 0 };

        let stats = driver
            .drive(&mut frames, &mut detector, &mut NullSink)
            .unwrap();
        assert_eq!(stats.frames_processed, 3);
        // Blank frames carry no lane markings: steering never moves off 90.
        assert_eq!(stats.final_steering_angle, 90);
        assert_eq!(stats.final_speed, config.objects.speed_limit);
    }

    #[test]
    fn test_person_in_frame_stops_the_car() {
        let config = Config::default();
        let mut driver = Driver::new(&config, MockActuator::new(), FakeClock::new());
        let mut frames = BlankFrames { remaining: 2, width: 64, height: 64 };
        // Person appears on the second frame only.
        let mut detector = Script {
            frames: vec![vec![], vec![near_person()]],
            next: 0,
        };

        let stats = driver
            .drive(&mut frames, &mut detector, &mut NullSink)
            .unwrap();
        assert_eq!(stats.final_speed, 0);
        assert_eq!(driver.actuator().speed, 0);
    }

    #[test]
    fn test_objects_are_handled_before_steering() {
        let config = Config::default();
        let mut driver = Driver::new(&config, MockActuator::new(), FakeClock::new());
        let mut detector = Script {
            frames: vec![vec![near_person()]],
            next: 0,
        };

        let frame = Frame::new(64, 64, 0.0);
        driver.process_frame(&frame, &mut detector).unwrap();
        // The stop command landed even though no lanes were found and no
        // steering command went out.
        assert_eq!(driver.actuator().speed, 0);
        assert_eq!(driver.actuator().steering_commands, 0);
        assert_eq!(driver.actuator().speed_commands, 1);
    }
}
