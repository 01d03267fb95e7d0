//! Walled-arena simulation of the rover, for running the drive loop without hardware.

pub mod hardware;
pub mod world;

pub use hardware::{SimButton, SimChassis, SimDisplay, SimSonar, SpinDelay, render_icon};
pub use world::{Arena, Frame, World, WorldState, new_world, snapshot};

use crate::config::Settings;
use crate::control::ProximityDriveLoop;
use crate::error::ConfigError;

pub type SimDriveLoop = ProximityDriveLoop<SimButton, SimSonar, SimDisplay, SimChassis, SpinDelay>;

/// Wires a drive loop to simulated peripherals acting on `world`.
pub fn build_drive_loop(settings: &Settings, world: &World) -> Result<SimDriveLoop, ConfigError> {
    let geometry = settings.geometry.build()?;
    let control = settings.control.to_drive_config();
    let delay = SpinDelay::new(settings.sim.time_scale);

    Ok(ProximityDriveLoop::new(
        SimButton::new(settings.sim.button, control.trigger),
        SimSonar::new(world.clone()),
        SimDisplay::new(world.clone()),
        SimChassis::new(world.clone(), geometry, delay),
        delay,
        control,
    ))
}
