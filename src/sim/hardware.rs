//! Simulated rover peripherals. They act on the shared [`World`] instead of pins.

use std::convert::Infallible;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use rover_devices::devices::car::DEFAULT_TURN_SPEED;
use rover_devices::devices::hcsr04::{MAX_RANGE_CM, SOUND_CM_PER_US, echo_to_unit};
use rover_devices::icon::MATRIX_SIZE;
use rover_devices::{
    ButtonId, ButtonInput, DistanceUnit, DriveError, DriveTrain, Icon, LedDisplay,
    RangingDevice, StepperId, Turn,
};
use rover_kinematics::{StepperGeometry, WheelSide};
use spin_sleep::SpinSleeper;
use tracing::{debug, trace, warn};

use super::world::{Frame, World};
use crate::config::ButtonScript;

/// `DelayNs` backed by `spin_sleep`, stretched by a time scale.
#[derive(Clone, Copy)]
pub struct SpinDelay {
    sleeper: SpinSleeper,
    time_scale: f64,
}

impl SpinDelay {
    pub fn new(time_scale: f64) -> Self {
        SpinDelay {
            sleeper: SpinSleeper::new(1_000),
            time_scale,
        }
    }

    fn sleep_ns(&self, ns: f64) {
        let scaled = ns * self.time_scale;
        if scaled >= 1.0 {
            self.sleeper.sleep(Duration::from_nanos(scaled as u64));
        }
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleep_ns(ns as f64);
    }

    fn delay_us(&mut self, us: u32) {
        self.sleep_ns(us as f64 * 1e3);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleep_ns(ms as f64 * 1e6);
    }
}

/// Button replaying a [`ButtonScript`] on one wired button; the other never reads pressed.
#[derive(Debug, Clone)]
pub struct SimButton {
    script: ButtonScript,
    wired: ButtonId,
    polls: u64,
}

impl SimButton {
    pub fn new(script: ButtonScript, wired: ButtonId) -> Self {
        SimButton {
            script,
            wired,
            polls: 0,
        }
    }
}

impl ButtonInput for SimButton {
    type Error = Infallible;

    fn is_pressed(&mut self, button: ButtonId) -> Result<bool, Self::Error> {
        if button != self.wired {
            return Ok(false);
        }
        let poll = self.polls;
        self.polls += 1;
        Ok(match self.script {
            ButtonScript::Always => true,
            ButtonScript::Never => false,
            ButtonScript::Alternate { on, off } => {
                let period = u64::from(on) + u64::from(off);
                period > 0 && poll % period < u64::from(on)
            }
        })
    }
}

/// Sonar looking straight ahead from the chassis centre.
pub struct SimSonar {
    world: World,
}

impl SimSonar {
    pub fn new(world: World) -> Self {
        SimSonar { world }
    }
}

impl RangingDevice for SimSonar {
    type Error = Infallible;

    fn ping(&mut self, unit: DistanceUnit) -> Result<Option<f32>, Self::Error> {
        let mut guard = self.world.write();
        let w = &mut *guard;
        w.pings += 1;
        let centimeters = w.arena.distance_to_wall(&w.pose) as f32;
        if centimeters > MAX_RANGE_CM {
            trace!(centimeters, "Wall out of sonar range");
            return Ok(None);
        }
        // Quantise through the echo width like the real sensor does.
        let echo_us = (centimeters * 2.0 / SOUND_CM_PER_US).round() as u64;
        Ok(Some(echo_to_unit(echo_us, unit)))
    }
}

pub struct SimDisplay {
    world: World,
}

impl SimDisplay {
    pub fn new(world: World) -> Self {
        SimDisplay { world }
    }

    fn set(&mut self, frame: Option<Frame>) {
        let mut w = self.world.write();
        w.frame = frame;
        w.display_updates += 1;
    }
}

/// Draws `icon` as five rows of `#` and `.`.
pub fn render_icon(icon: Icon) -> String {
    let mut out = String::with_capacity(MATRIX_SIZE * (MATRIX_SIZE + 1));
    for row in 0..MATRIX_SIZE {
        for col in 0..MATRIX_SIZE {
            out.push(if icon.is_lit(row, col) { '#' } else { '.' });
        }
        if row + 1 < MATRIX_SIZE {
            out.push('\n');
        }
    }
    out
}

impl LedDisplay for SimDisplay {
    type Error = Infallible;

    fn show_icon(&mut self, icon: Icon) -> Result<(), Self::Error> {
        debug!(?icon, "Display icon");
        trace!("\n{}", render_icon(icon));
        self.set(Some(Frame::Icon(icon)));
        Ok(())
    }

    fn show_number(&mut self, value: i32) -> Result<(), Self::Error> {
        debug!(value, "Display number");
        self.set(Some(Frame::Number(value)));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.set(None);
        Ok(())
    }
}

/// Two-stepper chassis that moves the simulated pose.
///
/// Wheel motion is quantised to whole phases, and each command blocks for as long as the
/// motors would take at the requested phase rate.
pub struct SimChassis {
    world: World,
    geometry: StepperGeometry,
    delay: SpinDelay,
    turn_speed: u32,
}

impl SimChassis {
    pub fn new(world: World, geometry: StepperGeometry, delay: SpinDelay) -> Self {
        SimChassis {
            world,
            geometry,
            delay,
            turn_speed: DEFAULT_TURN_SPEED,
        }
    }

    pub fn geometry(&self) -> &StepperGeometry {
        &self.geometry
    }

    fn run_for(&mut self, phases: u32, speed: u32) {
        let micros = u64::from(phases) * 1_000_000 / u64::from(speed.max(1));
        self.delay.delay_us(u32::try_from(micros).unwrap_or(u32::MAX));
    }
}

impl DriveTrain for SimChassis {
    type Error = DriveError<Infallible>;

    fn move_forward(&mut self, speed: u32, distance_cm: f64) -> Result<(), Self::Error> {
        if speed == 0 {
            return Err(DriveError::ZeroSpeed);
        }
        let phases = self.geometry.steps_for_distance(distance_cm)?;
        let travel = self.geometry.distance_for_steps(phases);
        {
            let mut guard = self.world.write();
            let w = &mut *guard;
            let target = self.geometry.advance(w.pose, travel);
            let (pose, bumped) = w.arena.clamp(target);
            w.odometer_cm += (pose.x - w.pose.x).hypot(pose.y - w.pose.y);
            w.pose = pose;
            w.forward_moves += 1;
            if bumped {
                w.bumps += 1;
                warn!(%pose, "Chassis ran into a wall");
            }
            debug!(%pose, travel, "Moved forward");
        }
        self.run_for(phases, speed);
        Ok(())
    }

    fn turn_stepper(&mut self, motor: StepperId, turn: Turn) -> Result<(), Self::Error> {
        let travel = self.geometry.wheel_travel_cm(turn);
        // M2 is mirrored: its forward shaft rotation rolls the right wheel backwards.
        let (side, wheel_travel) = match motor {
            StepperId::M1 => (WheelSide::Left, travel),
            StepperId::M2 => (WheelSide::Right, -travel),
        };
        {
            let mut guard = self.world.write();
            let w = &mut *guard;
            let target = self.geometry.pivot(w.pose, side, wheel_travel);
            let (pose, bumped) = w.arena.clamp(target);
            w.odometer_cm += (pose.x - w.pose.x).hypot(pose.y - w.pose.y);
            w.pose = pose;
            w.stepper_turns += 1;
            if bumped {
                w.bumps += 1;
                warn!(%pose, "Chassis swung into a wall");
            }
            debug!(?motor, ?turn, %pose, "Turned stepper");
        }
        let phases = self.geometry.steps_for_turn(turn);
        self.run_for(phases, self.turn_speed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimSettings;
    use crate::sim::world::{new_world, snapshot};
    use rover_kinematics::Pose;

    fn world_at(x: f64, y: f64, heading_deg: f64) -> World {
        new_world(&SimSettings {
            arena_width_cm: 200.0,
            arena_height_cm: 100.0,
            start_x_cm: x,
            start_y_cm: y,
            start_heading_deg: heading_deg,
            time_scale: 0.0,
            ..SimSettings::default()
        })
    }

    fn chassis(world: &World) -> SimChassis {
        SimChassis::new(world.clone(), StepperGeometry::default(), SpinDelay::new(0.0))
    }

    #[test]
    fn test_alternate_script() {
        let mut button = SimButton::new(ButtonScript::Alternate { on: 2, off: 1 }, ButtonId::A);
        let seen: Vec<bool> = (0..6).map(|_| button.is_pressed(ButtonId::A).unwrap()).collect();
        assert_eq!(seen, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_unwired_button_is_never_pressed() {
        let mut button = SimButton::new(ButtonScript::Always, ButtonId::A);
        assert!(!button.is_pressed(ButtonId::B).unwrap());
        assert!(button.is_pressed(ButtonId::A).unwrap());
    }

    #[test]
    fn test_sonar_reads_wall_ahead() {
        let world = world_at(170.0, 50.0, 0.0);
        let mut sonar = SimSonar::new(world.clone());

        let cm = sonar.ping(DistanceUnit::Centimeters).unwrap().unwrap();
        assert!((cm - 30.0).abs() < 0.05, "{}", cm);
        let inches = sonar.ping(DistanceUnit::Inches).unwrap().unwrap();
        assert!((inches - 30.0 / 2.54).abs() < 0.05);
        assert_eq!(snapshot(&world).pings, 2);
    }

    #[test]
    fn test_sonar_out_of_range_is_no_echo() {
        let world = new_world(&SimSettings {
            arena_width_cm: 1_000.0,
            start_x_cm: 10.0,
            ..SimSettings::default()
        });
        let mut sonar = SimSonar::new(world);
        assert_eq!(sonar.ping(DistanceUnit::Centimeters).unwrap(), None);
    }

    #[test]
    fn test_forward_moves_pose() {
        let world = world_at(50.0, 50.0, 0.0);
        let mut chassis = chassis(&world);

        chassis.move_forward(200, 10.0).unwrap();

        let w = snapshot(&world);
        assert!((w.pose.x - 60.0).abs() < 0.01, "{}", w.pose);
        assert_eq!(w.pose.y, 50.0);
        assert_eq!(w.forward_moves, 1);
        assert!((w.odometer_cm - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_forward_stops_at_wall() {
        let world = world_at(195.0, 50.0, 0.0);
        chassis(&world).move_forward(200, 10.0).unwrap();

        let w = snapshot(&world);
        assert_eq!(w.pose.x, 200.0);
        assert_eq!(w.bumps, 1);
    }

    #[test]
    fn test_zero_speed_is_rejected() {
        let world = world_at(50.0, 50.0, 0.0);
        let err = chassis(&world).move_forward(0, 10.0).unwrap_err();
        assert_eq!(err, DriveError::ZeroSpeed);
        assert_eq!(snapshot(&world).forward_moves, 0);
    }

    #[test]
    fn test_both_turns_rotate_clockwise() {
        let world = world_at(100.0, 50.0, 0.0);
        let mut chassis = chassis(&world);
        let geometry = *chassis.geometry();
        let per_turn = geometry.wheel_travel_cm(Turn::Quarter) / (geometry.axle_track_mm() / 10.0);

        chassis.turn_stepper(StepperId::M1, Turn::Quarter).unwrap();
        let after_m1 = snapshot(&world).pose;
        assert!((after_m1.theta + per_turn).abs() < 1e-9);

        chassis.turn_stepper(StepperId::M2, Turn::Quarter).unwrap();
        let w = snapshot(&world);
        assert!((w.pose.theta + 2.0 * per_turn).abs() < 1e-9);
        assert_eq!(w.stepper_turns, 2);
        assert_ne!(w.pose, Pose::new(100.0, 50.0, 0.0));
    }

    #[test]
    fn test_display_tracks_frames() {
        let world = world_at(50.0, 50.0, 0.0);
        let mut display = SimDisplay::new(world.clone());

        display.show_number(12).unwrap();
        assert_eq!(snapshot(&world).frame, Some(Frame::Number(12)));
        display.show_icon(Icon::Heart).unwrap();
        assert_eq!(snapshot(&world).frame, Some(Frame::Icon(Icon::Heart)));
        display.clear().unwrap();

        let w = snapshot(&world);
        assert_eq!(w.frame, None);
        assert_eq!(w.display_updates, 3);
    }

    #[test]
    fn test_render_heart() {
        assert_eq!(render_icon(Icon::Heart), ".#.#.\n#####\n#####\n.###.\n..#..");
    }
}
