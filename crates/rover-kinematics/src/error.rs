//! Error types for the rover geometry library.

use core::fmt;

/// Errors that can occur while building a geometry or converting distances.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Returned when a wheel diameter is provided that is not positive.
    InvalidWheelDiameter(&'static str),
    /// Returned when the distance between the two drive wheels is not positive.
    InvalidAxleTrack(&'static str),
    /// Returned when a stepper is described with zero steps per revolution.
    InvalidStepsPerRevolution(&'static str),
    /// Returned when a negative (or NaN) travel distance is converted to steps.
    NegativeDistance(&'static str),
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidWheelDiameter(msg) => write!(f, "Invalid wheel diameter: {}", msg),
            KinematicsError::InvalidAxleTrack(msg) => write!(f, "Invalid axle track: {}", msg),
            KinematicsError::InvalidStepsPerRevolution(msg) => {
                write!(f, "Invalid steps per revolution: {}", msg)
            }
            KinematicsError::NegativeDistance(msg) => write!(f, "Negative distance: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
