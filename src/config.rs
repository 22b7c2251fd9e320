use crate::types::{Config, LaneConfig, LoggingConfig, ObjectConfig, SteeringConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lane: LaneConfig {
                hue_min: 60.0,
                hue_max: 300.0,
                sat_min: 15.0,
                val_min: 0.0,
                edge_low_threshold: 200.0,
                edge_high_threshold: 400.0,
                hough_threshold: 10,
                min_line_length: 8,
                max_line_gap: 4,
            },
            steering: SteeringConfig {
                camera_mid_offset_percent: 0.02,
                max_deviation_two_lanes: 5,
                max_deviation_one_lane: 1,
            },
            objects: ObjectConfig {
                speed_limit: 40,
                min_height_pct: 0.05,
                stop_sign_wait_secs: 2.0,
                stop_dwell_secs: 1.0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
