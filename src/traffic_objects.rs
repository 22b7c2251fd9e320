//! Reactive handlers for recognized road objects.
//!
//! Each handler mutates the frame's [`VehicleState`] when its object is
//! detected close enough to matter. Only the stop sign carries runtime state:
//! a wait timer modeled as an explicit Idle/Waiting machine driven by an
//! injected clock, so tests can simulate the wait without sleeping.

use crate::types::{DetectedObject, VehicleState};
use std::time::Instant;
use tracing::{debug, info};

/// Capability shared by every road-object handler: adjust the vehicle state
/// for this control cycle. `now` comes from the controller's clock and is the
/// same instant for every handler in a frame.
pub trait TrafficObject {
    fn apply_to(&mut self, state: &mut VehicleState, now: Instant);

    /// Called when this object class is absent from the current frame.
    /// Only the stop sign cares; everything else is stateless.
    fn on_absent(&mut self) {}
}

/// Apparent-size proximity heuristic: an object is close enough to act on when
/// its bounding box covers at least `min_height_pct` of the frame height.
/// No actual distance estimation.
pub fn is_close_by(obj: &DetectedObject, frame_height: usize, min_height_pct: f32) -> bool {
    let obj_height = obj.bounding_box.height();
    let pct = obj_height / frame_height as f32;
    let close = pct >= min_height_pct;
    debug!(
        "object height {:.0}px ({:.1}%), close: {}",
        obj_height,
        pct * 100.0,
        close
    );
    close
}

pub struct RedLight;

impl TrafficObject for RedLight {
    fn apply_to(&mut self, state: &mut VehicleState, _now: Instant) {
        info!("red light: stopping");
        state.speed = 0;
    }
}

pub struct GreenLight;

impl TrafficObject for GreenLight {
    fn apply_to(&mut self, _state: &mut VehicleState, _now: Instant) {
        // Deliberate no-op: a green light never changes the commanded state.
        info!("green light: continue");
    }
}

pub struct Person;

impl TrafficObject for Person {
    fn apply_to(&mut self, state: &mut VehicleState, _now: Instant) {
        info!("person detected: emergency stop");
        state.speed = 0;
    }
}

pub struct SpeedLimit {
    limit: u32,
}

impl SpeedLimit {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl TrafficObject for SpeedLimit {
    fn apply_to(&mut self, state: &mut VehicleState, _now: Instant) {
        info!("speed limit {}: adjusting", self.limit);
        state.speed_limit = self.limit;
        if state.speed > self.limit {
            state.speed = self.limit;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Idle,
    Waiting { since: Instant },
}

/// Stop sign with a mandatory wait.
///
/// Idle + near detection → enter Waiting, record the start instant, stop the
/// car. While waiting, every invocation keeps the speed at 0 until the wait
/// interval elapses; completion transitions back to Idle without touching the
/// speed (resuming is the speed controller's decision, not the sign's).
/// [`TrafficObject::on_absent`] abandons the wait unconditionally so a sign
/// that scrolls out of view cannot stall the vehicle forever.
pub struct StopSign {
    wait_secs: f64,
    state: WaitState,
}

impl StopSign {
    pub fn new(wait_secs: f64) -> Self {
        Self {
            wait_secs,
            state: WaitState::Idle,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, WaitState::Waiting { .. })
    }
}

impl TrafficObject for StopSign {
    fn apply_to(&mut self, state: &mut VehicleState, now: Instant) {
        match self.state {
            WaitState::Idle => {
                info!("stop sign: starting {:.0}s wait", self.wait_secs);
                self.state = WaitState::Waiting { since: now };
                state.speed = 0;
            }
            WaitState::Waiting { since } => {
                let elapsed = now.duration_since(since).as_secs_f64();
                if elapsed < self.wait_secs {
                    debug!(
                        "stop sign: still waiting ({:.1}s remaining)",
                        self.wait_secs - elapsed
                    );
                    state.speed = 0;
                } else {
                    info!("stop sign: wait complete, can proceed");
                    // Speed is intentionally left alone here.
                    self.state = WaitState::Idle;
                }
            }
        }
    }

    fn on_absent(&mut self) {
        if self.is_waiting() {
            debug!("stop sign: cleared from view");
        }
        self.state = WaitState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::FakeClock;
    use crate::clock::Clock;
    use crate::types::{BoundingBox, ObjectLabel};

    fn detection(height_px: f32) -> DetectedObject {
        DetectedObject {
            label: ObjectLabel::Person,
            score: 0.9,
            bounding_box: BoundingBox::new(100.0, 100.0, 150.0, 100.0 + height_px),
        }
    }

    #[test]
    fn test_is_close_by_threshold() {
        // 10px of 480 is 2.1%, under the 5% threshold.
        assert!(!is_close_by(&detection(10.0), 480, 0.05));
        // 48px of 480 is exactly 10%.
        assert!(is_close_by(&detection(48.0), 480, 0.05));
        // Boundary: exactly 5% counts as close.
        assert!(is_close_by(&detection(24.0), 480, 0.05));
    }

    #[test]
    fn test_red_light_stops_car() {
        let clock = FakeClock::new();
        let mut state = VehicleState::new(40, 50);
        RedLight.apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 0);
        assert_eq!(state.speed_limit, 50);
    }

    #[test]
    fn test_green_light_changes_nothing() {
        let clock = FakeClock::new();
        let mut state = VehicleState::new(40, 50);
        GreenLight.apply_to(&mut state, clock.now());
        assert_eq!(state, VehicleState::new(40, 50));
    }

    #[test]
    fn test_person_stops_car() {
        let clock = FakeClock::new();
        let mut state = VehicleState::new(35, 50);
        Person.apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 0);
    }

    #[test]
    fn test_speed_limit_clamps_only_downward() {
        let clock = FakeClock::new();

        let mut state = VehicleState::new(40, 50);
        SpeedLimit::new(25).apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 25);
        assert_eq!(state.speed_limit, 25);

        let mut state = VehicleState::new(40, 50);
        SpeedLimit::new(60).apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 40);
        assert_eq!(state.speed_limit, 60);
    }

    #[test]
    fn test_stop_sign_wait_sequence() {
        let clock = FakeClock::new();
        let mut sign = StopSign::new(2.0);

        // t=0: first sighting enters Waiting and stops the car.
        let mut state = VehicleState::new(40, 40);
        sign.apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 0);
        assert!(sign.is_waiting());

        // t=1: still waiting, still stopped.
        clock.advance_secs(1.0);
        let mut state = VehicleState::new(40, 40);
        sign.apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 0);
        assert!(sign.is_waiting());

        // t=2.1: wait complete. Back to Idle, and the speed is deliberately
        // left at whatever the cycle seeded it with.
        clock.advance_secs(1.1);
        let mut state = VehicleState::new(40, 40);
        sign.apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 40);
        assert!(!sign.is_waiting());

        // A later clear when the sign is gone is a no-op.
        sign.on_absent();
        assert!(!sign.is_waiting());
    }

    #[test]
    fn test_stop_sign_holds_regardless_of_call_rate() {
        let clock = FakeClock::new();
        let mut sign = StopSign::new(2.0);

        let mut state = VehicleState::new(40, 40);
        sign.apply_to(&mut state, clock.now());

        // Hammer the handler at 100ms intervals; every call within the wait
        // window must report speed 0.
        for _ in 0..19 {
            clock.advance_secs(0.1);
            let mut state = VehicleState::new(40, 40);
            sign.apply_to(&mut state, clock.now());
            assert_eq!(state.speed, 0);
        }
    }

    #[test]
    fn test_stop_sign_clear_abandons_timer() {
        let clock = FakeClock::new();
        let mut sign = StopSign::new(2.0);

        let mut state = VehicleState::new(40, 40);
        sign.apply_to(&mut state, clock.now());
        assert!(sign.is_waiting());

        // Sign scrolls out of frame mid-wait: timer is discarded.
        clock.advance_secs(0.5);
        sign.on_absent();
        assert!(!sign.is_waiting());

        // Next sighting starts a fresh wait.
        let mut state = VehicleState::new(40, 40);
        sign.apply_to(&mut state, clock.now());
        assert_eq!(state.speed, 0);
        assert!(sign.is_waiting());
    }
}
