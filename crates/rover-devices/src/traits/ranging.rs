#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unit a range measurement is reported in.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Centimeters,
    Inches,
    /// Raw echo pulse width.
    MicroSeconds,
}

/// A distance sensor that is triggered once per measurement.
pub trait RangingDevice {
    type Error: core::fmt::Debug;

    /// Fire one ping and report the distance in `unit`.
    ///
    /// `Ok(None)` means no echo came back in time (nothing in range, or a lost pulse).
    fn ping(&mut self, unit: DistanceUnit) -> Result<Option<f32>, Self::Error>;
}
