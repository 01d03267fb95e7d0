//! Proximity-triggered drive loop.
//!
//! While the trigger button is held, every cycle takes one sonar reading, shows it, and
//! issues one motion command depending on which side of the threshold the reading falls.

use std::fmt;
use std::ops::ControlFlow;

use embedded_hal::delay::DelayNs;
use rover_devices::{
    ButtonId, ButtonInput, DistanceUnit, DriveTrain, Icon, LedDisplay, RangingDevice, StepperId,
    Turn,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::ControlError;

/// Obstacle distance separating "near" from "far" (cm).
pub const THRESHOLD_CM: f32 = 10.0;
/// Distance covered by one forward command (cm).
pub const FORWARD_DISTANCE_CM: f64 = 10.0;
/// Wheel phase rate for forward moves (phases per second).
pub const DRIVE_SPEED: u32 = 200;

/// Which side of the threshold an exact match belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// `d <= threshold` is near.
    NearInclusive,
    /// `d >= threshold` is far.
    FarInclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Near,
    Far,
}

impl BoundaryPolicy {
    pub fn classify(self, reading: DistanceReading, threshold_cm: f32) -> Zone {
        let d = reading.centimeters();
        // Written as "not far" so an unordered reading lands on the near side.
        let far = match self {
            BoundaryPolicy::NearInclusive => d > threshold_cm,
            BoundaryPolicy::FarInclusive => d >= threshold_cm,
        };
        if far { Zone::Far } else { Zone::Near }
    }
}

/// What the rover does when the reading is near.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearRangeAction {
    /// Show the stop icon and stay put.
    Stop,
    /// Turn each stepper once, wait, then drive forward anyway.
    TurnThenForward,
}

/// How a fresh reading is shown before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Icon,
    Number,
}

/// The sample a decision is made on. Lives for exactly one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceReading {
    Echo { centimeters: f32 },
    /// No echo before the sensor timed out.
    NoEcho,
}

impl DistanceReading {
    /// Distance used for the threshold comparison. A missing echo counts as 0 cm.
    pub fn centimeters(self) -> f32 {
        match self {
            DistanceReading::Echo { centimeters } => centimeters,
            DistanceReading::NoEcho => 0.0,
        }
    }
}

impl fmt::Display for DistanceReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceReading::Echo { centimeters } => write!(f, "{:.1} cm", centimeters),
            DistanceReading::NoEcho => write!(f, "no echo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveLoopConfig {
    pub trigger: ButtonId,
    pub threshold_cm: f32,
    pub boundary: BoundaryPolicy,
    pub near_action: NearRangeAction,
    pub feedback: Feedback,
    /// How long the reading feedback stays visible (ms).
    pub display_dwell_ms: u32,
    /// Pause between the turn and the forward move of the near maneuver (ms).
    pub turn_dwell_ms: u32,
    pub forward_distance_cm: f64,
    pub speed: u32,
    pub turn: Turn,
}

impl DriveLoopConfig {
    /// First script revision: exact 10 cm is near, and near means stop.
    pub fn variant_a() -> Self {
        DriveLoopConfig {
            trigger: ButtonId::A,
            threshold_cm: THRESHOLD_CM,
            boundary: BoundaryPolicy::NearInclusive,
            near_action: NearRangeAction::Stop,
            feedback: Feedback::Icon,
            display_dwell_ms: 1000,
            turn_dwell_ms: 0,
            forward_distance_cm: FORWARD_DISTANCE_CM,
            speed: DRIVE_SPEED,
            turn: Turn::Quarter,
        }
    }

    /// Second script revision: exact 10 cm is far, and near means turn then go.
    pub fn variant_b() -> Self {
        DriveLoopConfig {
            trigger: ButtonId::A,
            threshold_cm: THRESHOLD_CM,
            boundary: BoundaryPolicy::FarInclusive,
            near_action: NearRangeAction::TurnThenForward,
            feedback: Feedback::Number,
            display_dwell_ms: 500,
            turn_dwell_ms: 500,
            forward_distance_cm: FORWARD_DISTANCE_CM,
            speed: DRIVE_SPEED,
            turn: Turn::Quarter,
        }
    }
}

impl Default for DriveLoopConfig {
    fn default() -> Self {
        Self::variant_b()
    }
}

/// Result of one call to [`ProximityDriveLoop::evaluate_cycle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Trigger not held; nothing was touched.
    Idle,
    Forward { reading: DistanceReading },
    Stopped { reading: DistanceReading },
    TurnedThenForward { reading: DistanceReading },
}

impl CycleOutcome {
    pub fn reading(&self) -> Option<DistanceReading> {
        match *self {
            CycleOutcome::Idle => None,
            CycleOutcome::Forward { reading }
            | CycleOutcome::Stopped { reading }
            | CycleOutcome::TurnedThenForward { reading } => Some(reading),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Idle => "idle",
            CycleOutcome::Forward { .. } => "forward",
            CycleOutcome::Stopped { .. } => "stopped",
            CycleOutcome::TurnedThenForward { .. } => "turned_then_forward",
        }
    }
}

pub struct ProximityDriveLoop<B, R, L, M, D> {
    button: B,
    sonar: R,
    display: L,
    drive: M,
    delay: D,
    config: DriveLoopConfig,
}

impl<B, R, L, M, D> ProximityDriveLoop<B, R, L, M, D>
where
    B: ButtonInput,
    R: RangingDevice,
    L: LedDisplay,
    M: DriveTrain,
    D: DelayNs,
{
    pub fn new(button: B, sonar: R, display: L, drive: M, delay: D, config: DriveLoopConfig) -> Self {
        ProximityDriveLoop {
            button,
            sonar,
            display,
            drive,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &DriveLoopConfig {
        &self.config
    }

    /// Shows the start-up icon once, before the first cycle.
    pub fn announce_ready(&mut self) -> Result<(), ControlError> {
        self.show_icon(Icon::Happy)
    }

    /// One sense-decide-act pass.
    ///
    /// Reads the trigger first; if it is released nothing else happens. Otherwise takes a
    /// fresh reading, shows it for the dwell time, and issues the motion for its zone.
    pub fn evaluate_cycle(&mut self) -> Result<CycleOutcome, ControlError> {
        let pressed = self
            .button
            .is_pressed(self.config.trigger)
            .map_err(|e| ControlError::Trigger(format!("{:?}", e)))?;
        if !pressed {
            return Ok(CycleOutcome::Idle);
        }

        self.clear_display()?;
        let reading = self.sample();
        self.show_feedback(reading)?;
        self.delay.delay_ms(self.config.display_dwell_ms);
        self.clear_display()?;

        let zone = self.config.boundary.classify(reading, self.config.threshold_cm);
        let outcome = match (zone, self.config.near_action) {
            (Zone::Far, _) => {
                self.forward()?;
                self.show_icon(Icon::Heart)?;
                CycleOutcome::Forward { reading }
            }
            (Zone::Near, NearRangeAction::Stop) => {
                self.show_icon(Icon::Duck)?;
                CycleOutcome::Stopped { reading }
            }
            (Zone::Near, NearRangeAction::TurnThenForward) => {
                self.turn(StepperId::M1)?;
                self.turn(StepperId::M2)?;
                self.delay.delay_ms(self.config.turn_dwell_ms);
                self.forward()?;
                self.show_icon(Icon::Heart)?;
                CycleOutcome::TurnedThenForward { reading }
            }
        };

        debug!(%reading, ?zone, outcome = outcome.label(), "Cycle complete");
        Ok(outcome)
    }

    /// Repeats [`Self::evaluate_cycle`] every `tick_ms` until `after_cycle` breaks.
    ///
    /// A failed cycle is logged and handed to `after_cycle`; the next tick runs as usual.
    pub fn run_blocking<F>(&mut self, tick_ms: u32, mut after_cycle: F) -> Result<(), ControlError>
    where
        F: FnMut(&Result<CycleOutcome, ControlError>) -> ControlFlow<()>,
    {
        self.announce_ready()?;
        info!(tick_ms, config = ?self.config, "Drive loop running");

        loop {
            let result = self.evaluate_cycle();
            if let Err(e) = &result {
                error!(error = %e, "Drive cycle failed");
            }
            if after_cycle(&result).is_break() {
                info!("Drive loop stopped");
                return Ok(());
            }
            self.delay.delay_ms(tick_ms);
        }
    }

    pub fn into_parts(self) -> (B, R, L, M, D) {
        (self.button, self.sonar, self.display, self.drive, self.delay)
    }

    fn sample(&mut self) -> DistanceReading {
        match self.sonar.ping(DistanceUnit::Centimeters) {
            Ok(Some(centimeters)) if centimeters.is_finite() => {
                DistanceReading::Echo { centimeters }
            }
            Ok(Some(centimeters)) => {
                warn!(centimeters, "Sonar returned a non-finite distance, treating as no echo");
                DistanceReading::NoEcho
            }
            Ok(None) => {
                warn!("Sonar returned no echo, treating as near");
                DistanceReading::NoEcho
            }
            Err(e) => {
                warn!(error = ?e, "Sonar ping failed, treating as no echo");
                DistanceReading::NoEcho
            }
        }
    }

    fn show_feedback(&mut self, reading: DistanceReading) -> Result<(), ControlError> {
        match self.config.feedback {
            Feedback::Icon => self.show_icon(Icon::Yes),
            Feedback::Number => self
                .display
                .show_number(reading.centimeters().round() as i32)
                .map_err(|e| ControlError::Display(format!("{:?}", e))),
        }
    }

    fn show_icon(&mut self, icon: Icon) -> Result<(), ControlError> {
        self.display
            .show_icon(icon)
            .map_err(|e| ControlError::Display(format!("{:?}", e)))
    }

    fn clear_display(&mut self) -> Result<(), ControlError> {
        self.display
            .clear()
            .map_err(|e| ControlError::Display(format!("{:?}", e)))
    }

    fn forward(&mut self) -> Result<(), ControlError> {
        self.drive
            .move_forward(self.config.speed, self.config.forward_distance_cm)
            .map_err(|e| ControlError::Drive(format!("{:?}", e)))
    }

    fn turn(&mut self, motor: StepperId) -> Result<(), ControlError> {
        self.drive
            .turn_stepper(motor, self.config.turn)
            .map_err(|e| ControlError::Drive(format!("{:?}", e)))
    }
}
