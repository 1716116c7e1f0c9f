//! Recovery parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of stuck detection and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryParams {
    /// Time without measurable progress after which the robot is stuck
    pub stuck_timeout_s: f64,

    /// Distance the robot must move from the progress anchor for the move
    /// to count as progress
    pub progress_dist_m: f64,

    /// Time spent backing up
    pub backup_time_s: f64,

    /// Speed at which to back up, negative
    pub backup_vel_ms: f64,

    /// Heading error under which a direction adjustment is complete
    pub adjust_tolerance_rad: f64,

    /// Maximum time spent adjusting direction
    pub max_adjust_time_s: f64,

    /// Proportional gain from heading error to rotation rate while adjusting
    pub adjust_gain: f64,

    /// Maximum rotation rate while adjusting
    pub adjust_rot_vel_rads: f64,

    /// How long after recovering the robot is kept from backing up again,
    /// unless it makes progress first
    pub latch_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RecoveryParams {
    fn default() -> Self {
        Self {
            stuck_timeout_s: 5.0,
            progress_dist_m: 0.1,
            backup_time_s: 2.0,
            backup_vel_ms: -0.1,
            adjust_tolerance_rad: 0.15,
            max_adjust_time_s: 8.0,
            adjust_gain: 1.0,
            adjust_rot_vel_rads: 0.6,
            latch_time_s: 3.0,
        }
    }
}

impl RecoveryParams {
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("stuck_timeout_s", self.stuck_timeout_s),
            ("progress_dist_m", self.progress_dist_m),
            ("backup_time_s", self.backup_time_s),
            ("adjust_tolerance_rad", self.adjust_tolerance_rad),
            ("max_adjust_time_s", self.max_adjust_time_s),
            ("adjust_gain", self.adjust_gain),
            ("adjust_rot_vel_rads", self.adjust_rot_vel_rads),
            ("latch_time_s", self.latch_time_s),
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }

        if !(self.backup_vel_ms < 0.0) {
            return Err(format!(
                "backup_vel_ms must be negative, got {}",
                self.backup_vel_ms
            ));
        }

        Ok(())
    }
}
