//! Trajectory generation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity and acceleration limits of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelLimits {
    /// Maximum forward velocity
    pub max_vel_x_ms: f64,

    /// Minimum forward velocity, negative values allow reversing
    pub min_vel_x_ms: f64,

    /// Maximum sideways velocity, zero for non-holonomic robots
    pub max_vel_y_ms: f64,

    /// Minimum sideways velocity
    pub min_vel_y_ms: f64,

    /// Maximum magnitude of the translational velocity
    pub max_trans_vel_ms: f64,

    /// Minimum magnitude of the translational velocity, below which the
    /// robot must be turning at least `min_rot_vel_rads`
    pub min_trans_vel_ms: f64,

    /// Maximum magnitude of the angular velocity
    pub max_rot_vel_rads: f64,

    /// Minimum magnitude of the angular velocity when not translating
    pub min_rot_vel_rads: f64,

    pub acc_lim_x_mss: f64,

    pub acc_lim_y_mss: f64,

    pub acc_lim_theta_radss: f64,
}

/// Parameters controlling how the velocity space is sampled and simulated.
///
/// These can be changed while the planner is running.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Number of forward velocity samples
    pub vx_samples: usize,

    /// Number of sideways velocity samples
    pub vy_samples: usize,

    /// Number of angular velocity samples
    pub vth_samples: usize,

    /// Length of the simulation horizon
    pub sim_time_s: f64,

    /// Distance between simulated points
    pub sim_granularity_m: f64,

    /// Angle between simulated points
    pub angular_sim_granularity_rad: f64,

    /// If true the number of simulation steps is set by time rather than distance
    pub discretize_by_time: bool,

    /// If true only velocities reachable within one control period are
    /// sampled and simulated at constant velocity, otherwise velocities
    /// reachable over the whole horizon are sampled and ramped towards.
    pub use_dwa: bool,

    /// Try the curvature sampler before the scored sampler
    pub prefer_secondary: bool,

    /// Stop the scored sampler after this many candidates
    #[serde(default)]
    pub max_samples: Option<usize>,

    /// Stop the scored sampler on the first legal trajectory with a cost at
    /// or below this value
    #[serde(default)]
    pub good_enough_cost: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VelLimits {
    fn default() -> Self {
        Self {
            max_vel_x_ms: 0.55,
            min_vel_x_ms: 0.0,
            max_vel_y_ms: 0.0,
            min_vel_y_ms: 0.0,
            max_trans_vel_ms: 0.55,
            min_trans_vel_ms: 0.1,
            max_rot_vel_rads: 1.0,
            min_rot_vel_rads: 0.4,
            acc_lim_x_mss: 2.5,
            acc_lim_y_mss: 2.5,
            acc_lim_theta_radss: 3.2,
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            vx_samples: 6,
            vy_samples: 1,
            vth_samples: 20,
            sim_time_s: 1.7,
            sim_granularity_m: 0.025,
            angular_sim_granularity_rad: 0.1,
            discretize_by_time: false,
            use_dwa: true,
            prefer_secondary: false,
            max_samples: None,
            good_enough_cost: None,
        }
    }
}

impl VelLimits {
    /// Describe the first invalid limit, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_vel_x_ms > self.max_vel_x_ms || self.min_vel_y_ms > self.max_vel_y_ms {
            return Err("minimum velocity limits exceed the maximums".into());
        }
        if self.max_trans_vel_ms < 0.0 || self.min_trans_vel_ms < 0.0 {
            return Err("translational velocity limits must not be negative".into());
        }
        if self.max_rot_vel_rads <= 0.0 || self.min_rot_vel_rads < 0.0 {
            return Err("rotational velocity limits must be positive".into());
        }
        if self.acc_lim_x_mss < 0.0 || self.acc_lim_y_mss < 0.0 || self.acc_lim_theta_radss < 0.0 {
            return Err("acceleration limits must not be negative".into());
        }

        Ok(())
    }
}

impl SamplingParams {
    /// Describe the first invalid parameter, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.vx_samples == 0 || self.vy_samples == 0 || self.vth_samples == 0 {
            return Err("at least one sample is needed in every dimension".into());
        }
        if !(self.sim_time_s > 0.0) {
            return Err(format!("sim_time_s must be positive, got {}", self.sim_time_s));
        }
        if !(self.sim_granularity_m > 0.0) || !(self.angular_sim_granularity_rad > 0.0) {
            return Err("simulation granularities must be positive".into());
        }
        if let Some(c) = self.good_enough_cost {
            if c < 0.0 {
                return Err(format!("good_enough_cost must not be negative, got {}", c));
            }
        }

        Ok(())
    }
}
