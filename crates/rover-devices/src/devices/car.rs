//! Two-stepper car (robotbit layout): M1 drives the left wheel, M2 the right one,
//! and M2 is mounted mirrored so its shaft turns backwards when the car rolls forward.

use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use rover_kinematics::{KinematicsError, StepperGeometry, Turn};

use crate::devices::stepper::{Direction, StepCommand, Stepper, StepperError, interleave};
use crate::traits::drive::{DriveTrain, StepperId};

/// Phase rate used for single-wheel turns (phases per second).
pub const DEFAULT_TURN_SPEED: u32 = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum DriveError<E> {
    Stepper(StepperError<E>),
    Geometry(KinematicsError),
    /// A move was requested at zero phases per second.
    ZeroSpeed,
}

impl<E> From<StepperError<E>> for DriveError<E> {
    fn from(err: StepperError<E>) -> Self {
        DriveError::Stepper(err)
    }
}

impl<E> From<KinematicsError> for DriveError<E> {
    fn from(err: KinematicsError) -> Self {
        DriveError::Geometry(err)
    }
}

impl<E: fmt::Debug> fmt::Display for DriveError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveError::Stepper(e) => write!(f, "{}", e),
            DriveError::Geometry(e) => write!(f, "{}", e),
            DriveError::ZeroSpeed => write!(f, "Drive speed must be non-zero"),
        }
    }
}

pub struct StepperCar<P, D> {
    m1: Stepper<P>,
    m2: Stepper<P>,
    delay: D,
    geometry: StepperGeometry,
    turn_speed: u32,
}

impl<P, D> StepperCar<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(m1: Stepper<P>, m2: Stepper<P>, delay: D, geometry: StepperGeometry) -> Self {
        StepperCar {
            m1,
            m2,
            delay,
            geometry,
            turn_speed: DEFAULT_TURN_SPEED,
        }
    }

    /// Phase rate for [`DriveTrain::turn_stepper`]. Zero is ignored.
    pub fn with_turn_speed(mut self, turn_speed: u32) -> Self {
        if turn_speed > 0 {
            self.turn_speed = turn_speed;
        }
        self
    }

    pub fn geometry(&self) -> &StepperGeometry {
        &self.geometry
    }

    /// Open-loop phase counters of M1 and M2.
    pub fn positions(&self) -> (i64, i64) {
        (self.m1.position(), self.m2.position())
    }

    /// Release both motors' coils.
    pub fn stop(&mut self) -> Result<(), DriveError<P::Error>> {
        self.m1.release()?;
        self.m2.release()?;
        Ok(())
    }

    pub fn into_parts(self) -> (Stepper<P>, Stepper<P>, D) {
        (self.m1, self.m2, self.delay)
    }
}

fn phase_delay_us(speed: u32) -> u32 {
    1_000_000 / speed
}

impl<P, D> DriveTrain for StepperCar<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    type Error = DriveError<P::Error>;

    fn move_forward(&mut self, speed: u32, distance_cm: f64) -> Result<(), Self::Error> {
        if speed == 0 {
            return Err(DriveError::ZeroSpeed);
        }
        let phases = self.geometry.steps_for_distance(distance_cm)?;

        // Both wheels share the phase slot, so each waits half of it.
        let slot_us = phase_delay_us(speed) / 2;
        let mut commands = [
            StepCommand::new(&mut self.m1, phases, Direction::Forward),
            StepCommand::new(&mut self.m2, phases, Direction::Reverse),
        ];
        interleave(&mut commands, &mut self.delay, slot_us)?;
        Ok(())
    }

    /// Turns the shaft in its own forward sense. Because M2 is mirrored, turning M1 and
    /// then M2 swings the car clockwise twice.
    fn turn_stepper(&mut self, motor: StepperId, turn: Turn) -> Result<(), Self::Error> {
        let phases = self.geometry.steps_for_turn(turn);
        let delay_us = phase_delay_us(self.turn_speed);
        let stepper = match motor {
            StepperId::M1 => &mut self.m1,
            StepperId::M2 => &mut self.m2,
        };
        stepper.step(&mut self.delay, phases, Direction::Forward, delay_us)?;
        Ok(())
    }
}
