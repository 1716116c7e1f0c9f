//! Backup planner, reverses the robot in a straight line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{PlanInput, TrajPlanner};
use crate::loc::{Pose, Velocity};
use crate::traj::{TrajCost, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BackupPlanner {
    /// Reversing speed, always negative
    backup_vel_ms: f64,

    sim_time_s: f64,
    sim_granularity_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BackupPlanner {
    /// Create a new planner. The sign of `backup_vel_ms` is ignored, the robot always reverses.
    pub fn new(backup_vel_ms: f64, sim_time_s: f64, sim_granularity_m: f64) -> Self {
        Self {
            backup_vel_ms: -backup_vel_ms.abs(),
            sim_time_s,
            sim_granularity_m,
        }
    }

    pub fn set_sim(&mut self, sim_time_s: f64, sim_granularity_m: f64) {
        self.sim_time_s = sim_time_s;
        self.sim_granularity_m = sim_granularity_m;
    }

    /// Generate the reversing trajectory from the given pose.
    ///
    /// The trajectory is legal with zero cost, the cost functions are not consulted.
    pub fn generate(&self, pose: &Pose, _vel: &Velocity) -> Trajectory {
        let num_steps =
            (self.backup_vel_ms.abs() * self.sim_time_s / self.sim_granularity_m).ceil() as usize;

        Trajectory::constant(
            pose,
            Velocity::new(self.backup_vel_ms, 0.0, 0.0),
            self.sim_time_s,
            num_steps,
        )
        .with_cost(TrajCost::Legal(0.0))
    }
}

impl TrajPlanner for BackupPlanner {
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
        "backup"
    }
}
