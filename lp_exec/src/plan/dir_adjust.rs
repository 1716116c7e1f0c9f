//! Direction adjust planner, rotates the robot in place to face along the
//! plan.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::get_direction_error;

use super::{PlanInput, TrajPlanner};
use crate::loc::{Pose, Velocity};
use crate::traj::{TrajCost, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DirAdjustPlanner {
    /// Proportional gain from heading error to rotation rate
    gain: f64,

    /// Maximum rotation rate
    max_rot_vel_rads: f64,

    /// Minimum rotation rate while there is any heading error
    min_rot_vel_rads: f64,

    sim_time_s: f64,
    angular_sim_granularity_rad: f64,

    /// Heading the robot is turning towards
    target_heading_rad: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DirAdjustPlanner {
    pub fn new(
        gain: f64,
        max_rot_vel_rads: f64,
        min_rot_vel_rads: f64,
        sim_time_s: f64,
        angular_sim_granularity_rad: f64,
    ) -> Self {
        Self {
            gain,
            max_rot_vel_rads,
            min_rot_vel_rads: min_rot_vel_rads.min(max_rot_vel_rads),
            sim_time_s,
            angular_sim_granularity_rad,
            target_heading_rad: None,
        }
    }

    pub fn set_sim(&mut self, sim_time_s: f64, angular_sim_granularity_rad: f64) {
        self.sim_time_s = sim_time_s;
        self.angular_sim_granularity_rad = angular_sim_granularity_rad;
    }

    /// Set the heading to turn towards. With no target the robot does not turn.
    pub fn set_target_heading(&mut self, target_heading_rad: Option<f64>) {
        self.target_heading_rad = target_heading_rad;
    }

    /// Rotation rate to turn from `heading_rad` towards the target.
    pub fn rot_vel_rads(&self, heading_rad: f64) -> f64 {
        let err = match self.target_heading_rad {
            Some(t) => get_direction_error(heading_rad, t),
            None => return 0.0,
        };

        if err == 0.0 {
            return 0.0;
        }

        let rate = (self.gain * err).abs().max(self.min_rot_vel_rads).min(self.max_rot_vel_rads);

        rate.copysign(err)
    }

    /// Generate the in-place rotation from the given pose.
    ///
    /// The trajectory is legal with zero cost, the cost functions are not consulted.
    pub fn generate(&self, pose: &Pose, _vel: &Velocity) -> Trajectory {
        let omega = self.rot_vel_rads(pose.heading_rad);
        let num_steps = (omega.abs() * self.sim_time_s / self.angular_sim_granularity_rad).ceil() as usize;

        Trajectory::constant(pose, Velocity::new(0.0, 0.0, omega), self.sim_time_s, num_steps)
            .with_cost(TrajCost::Legal(0.0))
    }
}

impl TrajPlanner for DirAdjustPlanner {
    fn find_best(
        &self,
        input: &PlanInput<'_>,
        explored: Option<&mut Vec<Trajectory>>,
    ) -> Option<Trajectory> {
        let traj = self.generate(&input.pose, &input.vel);

        if let Some(e) = explored {
            e.push(traj.clone());
        }

        Some(traj)
    }

    fn name(&self) -> &'static str {
        "direction adjust"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn planner() -> DirAdjustPlanner {
        DirAdjustPlanner::new(1.0, 0.8, 0.3, 1.0, 0.1)
    }

    #[test]
    fn test_rot_vel() {
        let mut p = planner();
        assert_eq!(p.rot_vel_rads(0.0), 0.0);

        p.set_target_heading(Some(FRAC_PI_2));
        assert_eq!(p.rot_vel_rads(0.0), 0.8);
        assert_eq!(p.rot_vel_rads(PI), -0.8);
        assert!((p.rot_vel_rads(FRAC_PI_2 - 0.5) - 0.5).abs() < 1e-9);
        assert_eq!(p.rot_vel_rads(FRAC_PI_2 - 0.1), 0.3);
        assert_eq!(p.rot_vel_rads(FRAC_PI_2), 0.0);
    }

    #[test]
    fn test_in_place() {
        let mut p = planner();
        p.set_target_heading(Some(-FRAC_PI_2));

        let pose = Pose::new(2.0, -1.0, 0.0);
        let traj = p.generate(&pose, &Velocity::zero());

        assert_eq!(traj.cost(), TrajCost::Legal(0.0));
        assert_eq!(traj.vel.linear_ms.norm(), 0.0);
        assert!(traj.vel.angular_rads < 0.0);

        for point in &traj.points {
            assert_eq!(point.pose.position_m, pose.position_m);
        }
        assert!(traj.end().unwrap().heading_rad < 0.0);
    }
}
