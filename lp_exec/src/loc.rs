//! # Localisation types
//!
//! Planar pose and velocity of the robot, both expressed in the planning
//! frame (the frame of the global plan and the cost map).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the planning frame) of the robot.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    /// The position in the planning frame
    pub position_m: Vector2<f64>,

    /// The heading (angle to the positive X axis) in radians
    pub heading_rad: f64,
}

/// A body-frame velocity of the robot.
///
/// `linear_ms[0]` is along the robot's heading, `linear_ms[1]` is to the
/// robot's left.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Velocity {
    /// Linear velocity in the body frame
    pub linear_ms: Vector2<f64>,

    /// Angular velocity, positive anticlockwise
    pub angular_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }

    /// Euclidian distance between the positions of two poses.
    pub fn distance(&self, other: &Pose) -> f64 {
        (other.position_m - self.position_m).norm()
    }

    /// Squared distance between the positions of two poses.
    pub fn sq_distance(&self, other: &Pose) -> f64 {
        (other.position_m - self.position_m).norm_squared()
    }

    /// Transform a point in the planning frame into this pose's body frame.
    pub fn to_body(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(-self.heading_rad) * (point_m - self.position_m)
    }

    /// Transform a point in this pose's body frame into the planning frame.
    pub fn to_parent(&self, point_m: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(self.heading_rad) * point_m + self.position_m
    }

    /// Integrate a body-frame velocity over `dt_s` seconds with a single
    /// forward Euler step, returning the new pose.
    pub fn integrate(&self, vel: &Velocity, dt_s: f64) -> Pose {
        let (sin, cos) = self.heading_rad.sin_cos();
        let vx = vel.linear_ms[0];
        let vy = vel.linear_ms[1];

        Pose {
            position_m: Vector2::new(
                self.position_m[0] + (vx * cos - vy * sin) * dt_s,
                self.position_m[1] + (vx * sin + vy * cos) * dt_s,
            ),
            heading_rad: self.heading_rad + vel.angular_rads * dt_s,
        }
    }
}

impl Velocity {
    pub fn new(vx_ms: f64, vy_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms: Vector2::new(vx_ms, vy_ms),
            angular_rads,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Magnitude of the translational velocity.
    pub fn trans_speed_ms(&self) -> f64 {
        self.linear_ms.norm()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_distances() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(3.0, 4.0, 1.0);

        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.sq_distance(&b), 25.0);
        assert_eq!(b.distance(&a), 5.0);
    }

    #[test]
    fn test_frames() {
        let p = Pose::new(1.0, 1.0, FRAC_PI_2);

        let body = p.to_body(&Vector2::new(1.0, 2.0));
        assert!((body - Vector2::new(1.0, 0.0)).norm() < 1e-9);

        let parent = p.to_parent(&body);
        assert!((parent - Vector2::new(1.0, 2.0)).norm() < 1e-9);
    }

    #[test]
    fn test_integrate() {
        let p = Pose::new(0.0, 0.0, FRAC_PI_2);
        let q = p.integrate(&Velocity::new(1.0, 0.0, 0.5), 2.0);

        // One Euler step moves along the starting heading, the turn is not
        // followed
        assert!(q.position_m[0].abs() < 1e-9);
        assert!((q.position_m[1] - 2.0).abs() < 1e-9);
        assert!((q.heading_rad - (FRAC_PI_2 + 1.0)).abs() < 1e-9);
    }
}
