use parking_lot::RwLock;
use rover_devices::Icon;
use rover_kinematics::Pose;
use std::sync::Arc;

use crate::config::SimSettings;

/// What the simulated LED matrix currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Icon(Icon),
    Number(i32),
}

/// Rectangular walled arena with its corner at the origin (cm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Arena {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width_cm).contains(&x) && (0.0..=self.height_cm).contains(&y)
    }

    /// Distance from `pose` along its heading to the first wall it faces.
    ///
    /// Poses on or outside a wall they face report 0.
    pub fn distance_to_wall(&self, pose: &Pose) -> f64 {
        const EPS: f64 = 1e-9;
        let (dx, dy) = (pose.theta.cos(), pose.theta.sin());

        let mut nearest = f64::INFINITY;
        if dx > EPS {
            nearest = nearest.min((self.width_cm - pose.x) / dx);
        } else if dx < -EPS {
            nearest = nearest.min(-pose.x / dx);
        }
        if dy > EPS {
            nearest = nearest.min((self.height_cm - pose.y) / dy);
        } else if dy < -EPS {
            nearest = nearest.min(-pose.y / dy);
        }
        nearest.max(0.0)
    }

    /// Pushes `pose` back inside the walls. Returns whether it had to.
    pub fn clamp(&self, pose: Pose) -> (Pose, bool) {
        let x = pose.x.clamp(0.0, self.width_cm);
        let y = pose.y.clamp(0.0, self.height_cm);
        let bumped = x != pose.x || y != pose.y;
        (Pose::new(x, y, pose.theta), bumped)
    }
}

#[derive(Debug, Clone)]
pub struct WorldState {
    pub arena: Arena,
    pub pose: Pose,
    pub frame: Option<Frame>,
    /// Every show or clear on the display.
    pub display_updates: u64,
    pub pings: u64,
    pub forward_moves: u64,
    pub stepper_turns: u64,
    /// Path length of the chassis centre (cm).
    pub odometer_cm: f64,
    pub bumps: u64,
}

pub type World = Arc<RwLock<WorldState>>;

pub fn new_world(settings: &SimSettings) -> World {
    let theta = Pose::normalize_angle(settings.start_heading_deg.to_radians());
    Arc::new(RwLock::new(WorldState {
        arena: Arena {
            width_cm: settings.arena_width_cm,
            height_cm: settings.arena_height_cm,
        },
        pose: Pose::new(settings.start_x_cm, settings.start_y_cm, theta),
        frame: None,
        display_updates: 0,
        pings: 0,
        forward_moves: 0,
        stepper_turns: 0,
        odometer_cm: 0.0,
        bumps: 0,
    }))
}

pub fn snapshot(world: &World) -> WorldState {
    (*world.read()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const ARENA: Arena = Arena {
        width_cm: 200.0,
        height_cm: 100.0,
    };

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_distance_along_axes() {
        assert_close(ARENA.distance_to_wall(&Pose::new(50.0, 40.0, 0.0)), 150.0);
        assert_close(ARENA.distance_to_wall(&Pose::new(50.0, 40.0, FRAC_PI_2)), 60.0);
        assert_close(ARENA.distance_to_wall(&Pose::new(50.0, 40.0, -PI)), 50.0);
        assert_close(ARENA.distance_to_wall(&Pose::new(50.0, 40.0, -FRAC_PI_2)), 40.0);
    }

    #[test]
    fn test_diagonal_hits_nearest_wall() {
        // Heading 45°: the top wall is 60 cm up, reached after 60·√2 of travel.
        let d = ARENA.distance_to_wall(&Pose::new(50.0, 40.0, FRAC_PI_4));
        assert_close(d, 60.0 * 2f64.sqrt());
    }

    #[test]
    fn test_on_wall_reads_zero() {
        assert_close(ARENA.distance_to_wall(&Pose::new(200.0, 40.0, 0.0)), 0.0);
        assert_close(ARENA.distance_to_wall(&Pose::new(250.0, 40.0, 0.0)), 0.0);
    }

    #[test]
    fn test_clamp() {
        let (pose, bumped) = ARENA.clamp(Pose::new(205.0, -1.0, 0.3));
        assert!(bumped);
        assert_eq!(pose, Pose::new(200.0, 0.0, 0.3));

        let inside = Pose::new(10.0, 10.0, 0.0);
        assert_eq!(ARENA.clamp(inside), (inside, false));
    }

    #[test]
    fn test_new_world_from_settings() {
        let settings = SimSettings {
            start_heading_deg: 90.0,
            ..SimSettings::default()
        };
        let world = snapshot(&new_world(&settings));
        assert_close(world.pose.theta, FRAC_PI_2);
        assert!(world.arena.contains(world.pose.x, world.pose.y));
        assert_eq!(world.frame, None);
    }
}
