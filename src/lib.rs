//! Button-gated sonar drive loop for a two-stepper rover, plus a simulated rover to run it on.

pub mod blackboard;
pub mod config;
pub mod control;
pub mod error;
pub mod sim;

pub use control::{
    BoundaryPolicy, CycleOutcome, DistanceReading, DriveLoopConfig, Feedback, NearRangeAction,
    ProximityDriveLoop, Zone,
};
pub use error::{ConfigError, ControlError};
