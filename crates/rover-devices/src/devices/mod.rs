//! Drivers that implement the rover traits on `embedded-hal` pins.

pub mod button;
pub mod car;
pub mod hcsr04;
pub mod stepper;
