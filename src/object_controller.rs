//! Speed control from the frame's detected road objects.
//!
//! Aggregates one frame's detections, dispatches every near-enough object to
//! its reactive handler in a single pass, resolves the stop-sign
//! presence/absence transition, and commands the drive motor. A full stop is
//! held for a configurable dwell before any later frame may raise the speed
//! again; the dwell is modeled as a scheduled resume instant rather than a
//! blocking sleep, so the frame loop never stalls.

use crate::actuator::Actuator;
use crate::clock::Clock;
use crate::traffic_objects::{
    is_close_by, GreenLight, Person, RedLight, SpeedLimit, StopSign, TrafficObject,
};
use crate::types::{DetectedObject, ObjectConfig, ObjectLabel, VehicleState};
use anyhow::Result;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct ObjectsOnRoadProcessor<C: Clock> {
    config: ObjectConfig,
    clock: C,
    handlers: HashMap<ObjectLabel, Box<dyn TrafficObject>>,
    speed: u32,
    speed_limit: u32,
    /// While set, every cycle up to this instant commands speed 0.
    hold_zero_until: Option<Instant>,
}

impl<C: Clock> ObjectsOnRoadProcessor<C> {
    pub fn new(config: ObjectConfig, clock: C) -> Self {
        info!("creating objects-on-road processor");
        let mut handlers: HashMap<ObjectLabel, Box<dyn TrafficObject>> = HashMap::new();
        handlers.insert(ObjectLabel::GreenLight, Box::new(GreenLight));
        handlers.insert(ObjectLabel::Person, Box::new(Person));
        handlers.insert(ObjectLabel::RedLight, Box::new(RedLight));
        handlers.insert(ObjectLabel::SpeedLimit25, Box::new(SpeedLimit::new(25)));
        handlers.insert(ObjectLabel::SpeedLimit40, Box::new(SpeedLimit::new(40)));
        handlers.insert(
            ObjectLabel::StopSign,
            Box::new(StopSign::new(config.stop_sign_wait_secs)),
        );

        let speed_limit = config.speed_limit;
        Self {
            config,
            clock,
            handlers,
            speed: speed_limit,
            speed_limit,
            hold_zero_until: None,
        }
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn speed_limit(&self) -> u32 {
        self.speed_limit
    }

    /// Process one frame's detections and command the drive motor.
    ///
    /// The returned state is the cycle's resolved outcome (after any dwell
    /// hold), seeded from the persistent speed limit and mutated by each near
    /// object's handler. The stop-sign clear runs only after every detection
    /// has been classified, never interleaved with dispatch.
    pub fn process(
        &mut self,
        detections: &[DetectedObject],
        frame_height: usize,
        actuator: &mut dyn Actuator,
    ) -> Result<VehicleState> {
        let now = self.clock.now();
        let mut car_state = VehicleState::new(self.speed_limit, self.speed_limit);

        if detections.is_empty() {
            debug!("no objects detected, driving at speed limit {}", self.speed_limit);
        }

        let mut contains_stop_sign = false;
        for obj in detections {
            if obj.label == ObjectLabel::StopSign {
                contains_stop_sign = true;
            }
            let handler = match self.handlers.get_mut(&obj.label) {
                Some(h) => h,
                None => continue,
            };
            if is_close_by(obj, frame_height, self.config.min_height_pct) {
                info!("[{}] detected and close by, taking action", obj.label.as_str());
                handler.apply_to(&mut car_state, now);
            } else {
                debug!("[{}] detected but too far, ignoring", obj.label.as_str());
            }
        }

        // The sign left view (or was never there): abandon any wait in
        // progress so it cannot stall the vehicle indefinitely.
        if !contains_stop_sign {
            if let Some(stop_sign) = self.handlers.get_mut(&ObjectLabel::StopSign) {
                stop_sign.on_absent();
            }
        }

        self.resume_driving(&mut car_state, now, actuator)?;
        Ok(car_state)
    }

    fn resume_driving(
        &mut self,
        car_state: &mut VehicleState,
        now: Instant,
        actuator: &mut dyn Actuator,
    ) -> Result<()> {
        let old_speed = self.speed;
        self.speed_limit = car_state.speed_limit;
        self.speed = car_state.speed;

        // An unexpired dwell overrides whatever this cycle decided.
        if let Some(until) = self.hold_zero_until {
            if now < until {
                debug!("full stop dwell in effect, holding speed 0");
                self.speed = 0;
                car_state.speed = 0;
            } else {
                self.hold_zero_until = None;
            }
        }

        if self.speed == 0 {
            actuator.set_speed(0)?;
            if self.hold_zero_until.is_none() {
                info!("full stop, holding for {:.1}s", self.config.stop_dwell_secs);
                self.hold_zero_until =
                    Some(now + Duration::from_secs_f64(self.config.stop_dwell_secs));
            }
        } else {
            actuator.set_speed(self.speed_limit)?;
        }

        if old_speed != self.speed {
            info!("speed change: {} -> {}", old_speed, self.speed);
        }
        Ok(())
    }
}
