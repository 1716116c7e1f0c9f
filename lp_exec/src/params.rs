//! # Local Planner Executable Parameters
//!
//! This module provide parameters for the local planner executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::sim::SimParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpExecParams {
    /// Starting position of the robot
    pub start_position_m: Vector2<f64>,

    /// Starting heading of the robot
    pub start_heading_rad: f64,

    /// Final position of the global plan
    pub goal_position_m: Vector2<f64>,

    /// Maximum separation between global plan points
    pub plan_separation_m: f64,

    /// Outline of the robot in the body frame
    pub footprint_m: Vec<Vector2<f64>>,

    /// The run ends once the robot is this close to the goal
    pub goal_tolerance_m: f64,

    /// The run is abandoned after this much simulated time
    pub max_run_time_s: f64,

    /// If true each cycle is paced to the planner's period
    pub real_time: bool,

    pub sim: SimParams,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_toml() {
        let p: LpExecParams =
            util::params::from_str(include_str!("../../params/lp_exec.toml")).unwrap();

        assert_eq!(p.footprint_m.len(), 4);
        assert_eq!(p.sim.map.num_cells, Vector2::new(200, 200));
        assert!(p.goal_tolerance_m > 0.0);
    }
}
