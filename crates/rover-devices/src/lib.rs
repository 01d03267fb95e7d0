#![cfg_attr(not(test), no_std)]
#![doc = "Hardware traits and `embedded-hal` 1.0 drivers for a stepper-driven sonar rover."]
#![doc = ""]
#![doc = "The traits in [`traits`] are the contract the drive loop is written against;"]
#![doc = "[`devices`] holds drivers that implement them on real pins."]

pub mod devices;
pub mod icon;
pub mod traits;

pub use devices::button::ButtonPad;
pub use devices::car::{DriveError, StepperCar};
pub use devices::hcsr04::{Hcsr04, Hcsr04Error};
pub use devices::stepper::{Direction, StepCommand, StepMode, Stepper, StepperError, interleave};
pub use icon::Icon;
pub use traits::clock::MicrosClock;
pub use traits::display::LedDisplay;
pub use traits::drive::{DriveTrain, StepperId};
pub use traits::input::{ButtonId, ButtonInput};
pub use traits::ranging::{DistanceUnit, RangingDevice};

pub use rover_kinematics::Turn;
