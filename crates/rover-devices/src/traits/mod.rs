//! Hardware contract of the rover.
//!
//! Each trait carries its own `Error` type so drivers can surface pin or bus errors
//! without boxing.

pub mod clock;
pub mod display;
pub mod drive;
pub mod input;
pub mod ranging;
