//! Local planner parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::cost::CostWeights;
use crate::plan::CurvSamplingParams;
use crate::status::RecoveryParams;
use crate::traj::{SamplingParams, VelLimits};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the local planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPlannerParams {
    /// Period of the control loop driving the planner
    pub sim_period_s: f64,

    /// Distance along the plan to the local goal
    pub local_goal_distance_m: f64,

    /// Distance along the plan used to measure the plan's direction
    pub forward_point_distance_m: f64,

    /// Number of plan points either side of the last nearest point which are
    /// searched for the new nearest point
    pub nearest_search_window: usize,

    /// If true cells with no information are treated as lethal
    pub unknown_is_lethal: bool,

    /// If true every explored trajectory is kept for diagnostics
    pub publish_traj_cloud: bool,

    pub limits: VelLimits,

    pub weights: CostWeights,

    pub sampling: SamplingParams,

    pub curv_sampling: CurvSamplingParams,

    pub recovery: RecoveryParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LocalPlannerParams {
    fn default() -> Self {
        Self {
            sim_period_s: 0.1,
            local_goal_distance_m: 2.0,
            forward_point_distance_m: 0.325,
            nearest_search_window: 20,
            unknown_is_lethal: true,
            publish_traj_cloud: false,
            limits: VelLimits::default(),
            weights: CostWeights::default(),
            sampling: SamplingParams::default(),
            curv_sampling: CurvSamplingParams::default(),
            recovery: RecoveryParams::default(),
        }
    }
}

impl LocalPlannerParams {
    /// Describe the first invalid parameter, if any.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sim_period_s > 0.0) {
            return Err(format!("sim_period_s must be positive, got {}", self.sim_period_s));
        }
        if !(self.local_goal_distance_m > 0.0) {
            return Err(format!(
                "local_goal_distance_m must be positive, got {}",
                self.local_goal_distance_m
            ));
        }
        if !(self.forward_point_distance_m >= 0.0) {
            return Err(format!(
                "forward_point_distance_m must not be negative, got {}",
                self.forward_point_distance_m
            ));
        }

        self.limits.validate()?;
        self.weights.validate()?;
        self.sampling.validate()?;
        self.curv_sampling.validate()?;
        self.recovery.validate()
    }
}
