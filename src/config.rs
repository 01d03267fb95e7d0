//! Layered settings for the host binary.
//!
//! Built-in defaults, then the TOML file, then `ROVER__*` environment variables.

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use rover_devices::{ButtonId, Turn};
use rover_kinematics::{
    BYJ48_HALF_STEPS_PER_REVOLUTION, DEFAULT_AXLE_TRACK_MM, DEFAULT_WHEEL_DIAMETER_MM,
    StepperGeometry,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::control::{BoundaryPolicy, DriveLoopConfig, Feedback, NearRangeAction};
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming an alternative settings file.
pub const CONFIG_PATH_ENV: &str = "ROVER_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pause between two drive cycles (ms).
    pub tick_ms: u32,
    /// Stop after this many cycles. Runs until Ctrl-C when unset.
    pub max_cycles: Option<u64>,
    /// Period of the status report (ms).
    pub report_interval_ms: u64,
    /// Warn when no cycle has completed for this long (ms).
    pub stall_timeout_ms: u64,
    pub control: ControlSettings,
    pub geometry: GeometrySettings,
    pub sim: SimSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tick_ms: 20,
            max_cycles: None,
            report_interval_ms: 2_000,
            stall_timeout_ms: 10_000,
            control: ControlSettings::default(),
            geometry: GeometrySettings::default(),
            sim: SimSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    A,
    #[default]
    B,
}

/// Drive loop tuning. Fields left unset keep the value of the chosen variant preset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub variant: Variant,
    pub trigger: Option<ButtonId>,
    pub threshold_cm: Option<f32>,
    pub boundary: Option<BoundaryPolicy>,
    pub near_action: Option<NearRangeAction>,
    pub feedback: Option<Feedback>,
    pub display_dwell_ms: Option<u32>,
    pub turn_dwell_ms: Option<u32>,
    pub forward_distance_cm: Option<f64>,
    pub speed: Option<u32>,
    pub turn: Option<Turn>,
}

impl ControlSettings {
    pub fn to_drive_config(&self) -> DriveLoopConfig {
        let preset = match self.variant {
            Variant::A => DriveLoopConfig::variant_a(),
            Variant::B => DriveLoopConfig::variant_b(),
        };
        DriveLoopConfig {
            trigger: self.trigger.unwrap_or(preset.trigger),
            threshold_cm: self.threshold_cm.unwrap_or(preset.threshold_cm),
            boundary: self.boundary.unwrap_or(preset.boundary),
            near_action: self.near_action.unwrap_or(preset.near_action),
            feedback: self.feedback.unwrap_or(preset.feedback),
            display_dwell_ms: self.display_dwell_ms.unwrap_or(preset.display_dwell_ms),
            turn_dwell_ms: self.turn_dwell_ms.unwrap_or(preset.turn_dwell_ms),
            forward_distance_cm: self.forward_distance_cm.unwrap_or(preset.forward_distance_cm),
            speed: self.speed.unwrap_or(preset.speed),
            turn: self.turn.unwrap_or(preset.turn),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    pub wheel_diameter_mm: f64,
    pub axle_track_mm: f64,
    pub steps_per_revolution: u32,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        GeometrySettings {
            wheel_diameter_mm: DEFAULT_WHEEL_DIAMETER_MM,
            axle_track_mm: DEFAULT_AXLE_TRACK_MM,
            steps_per_revolution: BYJ48_HALF_STEPS_PER_REVOLUTION,
        }
    }
}

impl GeometrySettings {
    pub fn build(&self) -> Result<StepperGeometry, ConfigError> {
        Ok(StepperGeometry::new(
            self.wheel_diameter_mm,
            self.axle_track_mm,
            self.steps_per_revolution,
        )?)
    }
}

/// How the simulated trigger button behaves over successive polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ButtonScript {
    #[default]
    Always,
    Never,
    /// Held for `on` polls, then released for `off` polls, repeating.
    Alternate { on: u32, off: u32 },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub arena_width_cm: f64,
    pub arena_height_cm: f64,
    pub start_x_cm: f64,
    pub start_y_cm: f64,
    /// Counter-clockwise from the +x wall normal (degrees).
    pub start_heading_deg: f64,
    pub button: ButtonScript,
    /// Wall-clock seconds per simulated second. `0` runs without sleeping.
    pub time_scale: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings {
            arena_width_cm: 200.0,
            arena_height_cm: 120.0,
            start_x_cm: 30.0,
            start_y_cm: 60.0,
            start_heading_deg: 0.0,
            button: ButtonScript::Always,
            time_scale: 1.0,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, reason| Err(ConfigError::Invalid { key, reason });
        let control = self.control.to_drive_config();

        if !(control.threshold_cm.is_finite() && control.threshold_cm > 0.0) {
            return invalid("control.threshold_cm", "must be a positive number");
        }
        if control.speed == 0 {
            return invalid("control.speed", "must be at least 1 phase per second");
        }
        if !(control.forward_distance_cm.is_finite() && control.forward_distance_cm >= 0.0) {
            return invalid("control.forward_distance_cm", "must not be negative");
        }
        if self.tick_ms == 0 {
            return invalid("tick_ms", "must be at least 1 ms");
        }
        if self.report_interval_ms == 0 {
            return invalid("report_interval_ms", "must be at least 1 ms");
        }
        if !(self.sim.arena_width_cm > 0.0 && self.sim.arena_height_cm > 0.0) {
            return invalid("sim.arena_*_cm", "arena must have a positive size");
        }
        let inside_x = (0.0..=self.sim.arena_width_cm).contains(&self.sim.start_x_cm);
        let inside_y = (0.0..=self.sim.arena_height_cm).contains(&self.sim.start_y_cm);
        if !(inside_x && inside_y) {
            return invalid("sim.start_*_cm", "start position must be inside the arena");
        }
        if !(self.sim.time_scale.is_finite() && self.sim.time_scale >= 0.0) {
            return invalid("sim.time_scale", "must not be negative");
        }
        if let ButtonScript::Alternate { on, off } = self.sim.button {
            if on == 0 && off == 0 {
                return invalid("sim.button", "alternate script needs a non-empty period");
            }
        }
        self.geometry.build()?;
        Ok(())
    }
}

/// Loads settings from the file named by [`CONFIG_PATH_ENV`], or [`DEFAULT_CONFIG_PATH`].
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_settings_from(&path)
}

/// Loads settings from `path` if it exists, overridden by `ROVER__*` variables.
pub fn load_settings_from(path: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let builder = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("ROVER")
                .separator("__")
                .try_parsing(true),
        );

    match build_settings(builder) {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

/// Parses settings from an in-memory TOML document.
pub fn parse_settings(toml: &str) -> Result<Settings, ConfigError> {
    build_settings(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

fn build_settings(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_variant_b() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.control.to_drive_config(), DriveLoopConfig::variant_b());
        assert_eq!(settings.tick_ms, 20);
        assert_eq!(settings.max_cycles, None);
        assert_eq!(settings.sim.button, ButtonScript::Always);
    }

    #[test]
    fn test_variant_a_with_overrides() {
        let settings = parse_settings(
            r#"
            max_cycles = 12

            [control]
            variant = "a"
            threshold_cm = 15.0
            near_action = "turn_then_forward"
            turn = "half"
            "#,
        )
        .unwrap();

        let control = settings.control.to_drive_config();
        assert_eq!(control.boundary, BoundaryPolicy::NearInclusive);
        assert_eq!(control.feedback, Feedback::Icon);
        assert_eq!(control.display_dwell_ms, 1000);
        assert_eq!(control.threshold_cm, 15.0);
        assert_eq!(control.near_action, NearRangeAction::TurnThenForward);
        assert_eq!(control.turn, Turn::Half);
        assert_eq!(settings.max_cycles, Some(12));
    }

    #[test]
    fn test_alternate_button_script() {
        let settings = parse_settings(
            r#"
            [sim]
            time_scale = 0.0
            button = { mode = "alternate", on = 3, off = 2 }
            "#,
        )
        .unwrap();
        assert_eq!(settings.sim.button, ButtonScript::Alternate { on: 3, off: 2 });
        assert_eq!(settings.sim.time_scale, 0.0);
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let err = parse_settings("[control]\nthreshold_cm = 0.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "control.threshold_cm",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_speed_is_rejected() {
        let err = parse_settings("[control]\nspeed = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "control.speed", .. }));
    }

    #[test]
    fn test_bad_geometry_is_rejected() {
        let err = parse_settings("[geometry]\naxle_track_mm = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Geometry(_)));
    }

    #[test]
    fn test_start_outside_arena_is_rejected() {
        let err = parse_settings("[sim]\nstart_x_cm = 500.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "sim.start_*_cm", .. }));
    }

    #[test]
    fn test_unknown_boundary_fails_to_load() {
        let err = parse_settings("[control]\nboundary = \"sideways\"").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = load_settings_from("does/not/exist.toml").unwrap();
        assert_eq!(settings.geometry.steps_per_revolution, BYJ48_HALF_STEPS_PER_REVOLUTION);
    }
}
