use rover_kinematics::Turn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stepper ports on the motor driver board. `M1` drives the left wheel, `M2` the right.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperId {
    M1,
    M2,
}

/// Motion commands of a two-stepper chassis.
///
/// Commands are fire-and-forget from the caller's point of view: they report bus
/// errors but no motion status.
pub trait DriveTrain {
    type Error: core::fmt::Debug;

    /// Drive both wheels forward by `distance_cm`, at `speed` phases per second per wheel.
    fn move_forward(&mut self, speed: u32, distance_cm: f64) -> Result<(), Self::Error>;

    /// Rotate a single stepper by `turn`, leaving the other one still.
    fn turn_stepper(&mut self, motor: StepperId, turn: Turn) -> Result<(), Self::Error>;
}
