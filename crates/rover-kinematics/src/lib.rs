#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for stepper-driven two-wheel rover geometry."]
#![doc = ""]
#![doc = "This crate converts travel distances and wheel turns into stepper phases,"]
#![doc = "and integrates straight moves and single-wheel pivots into a chassis pose."]

use core::f64::consts::PI;
use core::fmt;
use libm::{cos, round, sin};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Half-step phases per output shaft revolution of a 28BYJ-48 geared stepper.
///
/// The gearbox ratio gives 4075.77 phases; the motor can only stop on whole phases.
pub const BYJ48_HALF_STEPS_PER_REVOLUTION: u32 = 4076;

/// Wheel diameter of the stock robotbit stepper car (mm).
pub const DEFAULT_WHEEL_DIAMETER_MM: f64 = 48.0;

/// Distance between the wheel contact points of the stock chassis (mm).
pub const DEFAULT_AXLE_TRACK_MM: f64 = 100.0;

/// A 2‑D pose `(x, y, θ)` in centimetres and radians (θ measured counter‑clockwise
/// from the x‑axis in the world frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World‑frame x position (cm).
    pub x: f64,
    /// World‑frame y position (cm).
    pub y: f64,
    /// Heading (rad), normalized to `[-PI, PI)`.
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose.
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose { x, y, theta }
    }

    /// Normalize an angle to be within `[-PI, PI)`.
    ///
    /// Angles at `PI` will be normalized to `-PI`.
    pub fn normalize_angle(angle: f64) -> f64 {
        let a = angle % (2.0 * PI);
        if a >= PI {
            a - 2.0 * PI
        } else if a < -PI {
            a + 2.0 * PI
        } else {
            a
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.1} cm, y: {:.1} cm, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}

/// A discrete amount of output shaft rotation, as offered by robotbit stepper blocks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Turn {
    /// One quarter of a revolution (`T1B4`).
    #[default]
    Quarter,
    /// One half of a revolution (`T1B2`).
    Half,
    /// Three quarters of a revolution (`T3B4`).
    ThreeQuarters,
    /// A full revolution (`T1`).
    Full,
}

impl Turn {
    /// Fraction of a revolution this turn represents.
    pub const fn fraction(self) -> f64 {
        match self {
            Turn::Quarter => 0.25,
            Turn::Half => 0.5,
            Turn::ThreeQuarters => 0.75,
            Turn::Full => 1.0,
        }
    }
}

/// Which drive wheel a motion applies to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelSide {
    /// Left wheel, looking along the heading.
    Left,
    /// Right wheel, looking along the heading.
    Right,
}

/// Geometry of a two-wheel chassis driven by one stepper per wheel.
///
/// Stores the physical parameters needed to convert between centimetres travelled
/// and stepper phases, and to integrate those motions into a [`Pose`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperGeometry {
    /// Wheel diameter (mm).
    wheel_diameter_mm: f64,
    /// Distance between the wheel contact points (mm).
    axle_track_mm: f64,
    /// Phases per output shaft revolution.
    steps_per_revolution: u32,
}

impl StepperGeometry {
    /// Construct a new geometry.
    ///
    /// # Arguments
    ///
    /// * `wheel_diameter_mm`: Diameter of the drive wheels in millimetres.
    /// * `axle_track_mm`: Distance between the two drive wheels in millimetres.
    /// * `steps_per_revolution`: Stepper phases needed for one wheel revolution.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidWheelDiameter)` if `wheel_diameter_mm` is not positive.
    /// Returns `Err(KinematicsError::InvalidAxleTrack)` if `axle_track_mm` is not positive.
    /// Returns `Err(KinematicsError::InvalidStepsPerRevolution)` if `steps_per_revolution` is zero.
    pub const fn new(
        wheel_diameter_mm: f64,
        axle_track_mm: f64,
        steps_per_revolution: u32,
    ) -> Result<Self, KinematicsError> {
        if !(wheel_diameter_mm > 0.0) {
            return Err(KinematicsError::InvalidWheelDiameter("must be positive"));
        }
        if !(axle_track_mm > 0.0) {
            return Err(KinematicsError::InvalidAxleTrack("must be positive"));
        }
        if steps_per_revolution == 0 {
            return Err(KinematicsError::InvalidStepsPerRevolution("must be non-zero"));
        }
        Ok(StepperGeometry {
            wheel_diameter_mm,
            axle_track_mm,
            steps_per_revolution,
        })
    }

    /// Returns the wheel diameter in millimetres.
    pub fn wheel_diameter_mm(&self) -> f64 {
        self.wheel_diameter_mm
    }

    /// Returns the axle track in millimetres.
    pub fn axle_track_mm(&self) -> f64 {
        self.axle_track_mm
    }

    /// Returns the number of phases per wheel revolution.
    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    /// Distance a wheel rolls in one revolution (cm).
    pub fn wheel_circumference_cm(&self) -> f64 {
        PI * self.wheel_diameter_mm / 10.0
    }

    /// Number of phases a wheel needs to roll `distance_cm`, rounded to the nearest phase.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::NegativeDistance)` if `distance_cm` is negative or NaN.
    pub fn steps_for_distance(&self, distance_cm: f64) -> Result<u32, KinematicsError> {
        if !(distance_cm >= 0.0) {
            return Err(KinematicsError::NegativeDistance("must be non-negative"));
        }
        let revolutions = distance_cm / self.wheel_circumference_cm();
        Ok(round(revolutions * self.steps_per_revolution as f64) as u32)
    }

    /// Distance a wheel rolls after `steps` phases (cm).
    pub fn distance_for_steps(&self, steps: u32) -> f64 {
        steps as f64 / self.steps_per_revolution as f64 * self.wheel_circumference_cm()
    }

    /// Number of phases needed to rotate a wheel by `turn`.
    pub fn steps_for_turn(&self, turn: Turn) -> u32 {
        round(turn.fraction() * self.steps_per_revolution as f64) as u32
    }

    /// Distance the wheel rim rolls while rotating by `turn` (cm).
    pub fn wheel_travel_cm(&self, turn: Turn) -> f64 {
        turn.fraction() * self.wheel_circumference_cm()
    }

    /// Moves the chassis straight ahead along its heading.
    ///
    /// Both wheels roll `distance_cm`; negative distances move backwards.
    pub fn advance(&self, pose: Pose, distance_cm: f64) -> Pose {
        Pose {
            x: pose.x + distance_cm * cos(pose.theta),
            y: pose.y + distance_cm * sin(pose.theta),
            theta: pose.theta,
        }
    }

    /// Rolls one wheel by `wheel_travel_cm` while the other stays still.
    ///
    /// The chassis rotates about the stationary wheel. A forward roll of the left wheel
    /// turns the rover clockwise, a forward roll of the right wheel counter-clockwise.
    /// The final heading is normalized to `[-PI, PI)`.
    pub fn pivot(&self, pose: Pose, side: WheelSide, wheel_travel_cm: f64) -> Pose {
        let track_cm = self.axle_track_mm / 10.0;
        let half_track = track_cm / 2.0;

        // Unit vector pointing to the rover's right.
        let (right_x, right_y) = (sin(pose.theta), -cos(pose.theta));

        let (pivot_x, pivot_y, delta_theta) = match side {
            WheelSide::Left => (
                pose.x + half_track * right_x,
                pose.y + half_track * right_y,
                -wheel_travel_cm / track_cm,
            ),
            WheelSide::Right => (
                pose.x - half_track * right_x,
                pose.y - half_track * right_y,
                wheel_travel_cm / track_cm,
            ),
        };

        let (dx, dy) = (pose.x - pivot_x, pose.y - pivot_y);
        let (c, s) = (cos(delta_theta), sin(delta_theta));

        Pose {
            x: pivot_x + dx * c - dy * s,
            y: pivot_y + dx * s + dy * c,
            theta: Pose::normalize_angle(pose.theta + delta_theta),
        }
    }
}

impl Default for StepperGeometry {
    fn default() -> Self {
        StepperGeometry {
            wheel_diameter_mm: DEFAULT_WHEEL_DIAMETER_MM,
            axle_track_mm: DEFAULT_AXLE_TRACK_MM,
            steps_per_revolution: BYJ48_HALF_STEPS_PER_REVOLUTION,
        }
    }
}

impl fmt::Display for StepperGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StepperGeometry (d: {:.1} mm, track: {:.1} mm, {} steps/rev)",
            self.wheel_diameter_mm, self.axle_track_mm, self.steps_per_revolution
        )
    }
}
