mod actuator;
mod annotate;
mod clock;
mod config;
mod driver;
mod geometry;
mod lane_detector;
mod lane_follower;
mod object_controller;
mod sim;
mod steering;
mod traffic_objects;
mod types;

use crate::actuator::MockActuator;
use crate::clock::SystemClock;
use crate::driver::{Driver, NullSink};
use crate::sim::{ScriptedDetections, SyntheticRoadSource};
use crate::types::{BoundingBox, Config, DetectedObject, ObjectLabel};
use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config.yaml";

const FRAME_WIDTH: usize = 640;
const FRAME_HEIGHT: usize = 480;
const SIM_FRAMES: u64 = 120;
/// Sideways road drift per frame, enough to make the steering loop work.
const SIM_DRIFT_PX: f64 = 0.5;

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("starting rover pilot (simulated inputs)");

    let mut frames = SyntheticRoadSource::new(FRAME_WIDTH, FRAME_HEIGHT, SIM_FRAMES, SIM_DRIFT_PX);
    let mut detections = sim_scenario();
    let mut driver = Driver::new(&config, MockActuator::new(), SystemClock);

    let stats = driver.drive(&mut frames, &mut detections, &mut NullSink)?;

    info!(
        "run complete: {} frames, final steering {}, final speed {} (limit {})",
        stats.frames_processed,
        stats.final_steering_angle,
        stats.final_speed,
        stats.final_speed_limit
    );
    Ok(())
}

/// A short demo script: a stop sign, then a green light, then a lower limit.
fn sim_scenario() -> ScriptedDetections {
    let near_box = BoundingBox::new(280.0, 180.0, 360.0, 260.0);
    ScriptedDetections::new()
        .at(
            30,
            vec![DetectedObject {
                label: ObjectLabel::StopSign,
                score: 0.93,
                bounding_box: near_box,
            }],
        )
        .at(
            70,
            vec![DetectedObject {
                label: ObjectLabel::GreenLight,
                score: 0.88,
                bounding_box: near_box,
            }],
        )
        .at(
            100,
            vec![DetectedObject {
                label: ObjectLabel::SpeedLimit25,
                score: 0.91,
                bounding_box: near_box,
            }],
        )
}
