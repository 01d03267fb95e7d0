use rover_kinematics::KinematicsError;
use thiserror::Error;

/// A hardware call that failed inside a drive cycle.
///
/// Device errors are generic per driver; they are flattened to their debug text here so
/// the loop can report them uniformly.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("trigger button read failed: {0}")]
    Trigger(String),
    #[error("display update failed: {0}")]
    Display(String),
    #[error("drive command failed: {0}")]
    Drive(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting `{key}`: {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
    #[error("invalid chassis geometry: {0}")]
    Geometry(#[from] KinematicsError),
}
