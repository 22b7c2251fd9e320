//! Actuator sink interface: the two fire-and-forget commands this core issues.
//! Physical drivers live outside the crate; the mock here stands in for them
//! in tests and on development machines without the vehicle attached.

use anyhow::Result;
use tracing::debug;

/// Steering servo + drive motor command sink. Commands are fire-and-forget:
/// failures are surfaced to the caller, never retried here.
pub trait Actuator {
    /// Steering angle in [0, 180], 90 = straight ahead.
    fn set_steering_angle(&mut self, angle: i32) -> Result<()>;
    /// Drive speed in [0, 100], 0 = stopped.
    fn set_speed(&mut self, speed: u32) -> Result<()>;
}

/// Records the last commands instead of moving hardware.
#[derive(Debug, Default)]
pub struct MockActuator {
    pub steering_angle: i32,
    pub speed: u32,
    pub steering_commands: u32,
    pub speed_commands: u32,
}

impl MockActuator {
    pub fn new() -> Self {
        Self {
            steering_angle: 90,
            speed: 0,
            steering_commands: 0,
            speed_commands: 0,
        }
    }
}

impl Actuator for MockActuator {
    fn set_steering_angle(&mut self, angle: i32) -> Result<()> {
        debug!("mock front wheels turn to {}", angle);
        self.steering_angle = angle;
        self.steering_commands += 1;
        Ok(())
    }

    fn set_speed(&mut self, speed: u32) -> Result<()> {
        debug!("mock back wheels speed set to {}", speed);
        self.speed = speed;
        self.speed_commands += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_commands() {
        let mut mock = MockActuator::new();
        mock.set_steering_angle(105).unwrap();
        mock.set_speed(40).unwrap();
        mock.set_speed(0).unwrap();
        assert_eq!(mock.steering_angle, 105);
        assert_eq!(mock.speed, 0);
        assert_eq!(mock.steering_commands, 1);
        assert_eq!(mock.speed_commands, 2);
    }
}
