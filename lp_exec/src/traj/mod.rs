//! # Trajectories
//!
//! A trajectory is the forward simulation of one velocity sample from the
//! robot's current pose, together with the cost given to it by the cost
//! functions.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod generator;
mod params;

pub use generator::{sample_range, Candidates, TrajGenerator, VelWindow};
pub use params::{SamplingParams, VelLimits};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::loc::{Pose, Velocity};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Numeric value reported for illegal trajectories in diagnostics.
pub const ILLEGAL_COST: f64 = -1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single simulated point of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajPoint {
    pub pose: Pose,

    /// Time since the start of the trajectory
    pub time_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// The commanded velocity sample
    pub vel: Velocity,

    /// Time between consecutive points
    pub time_delta_s: f64,

    /// Simulated points, starting with the start pose
    pub points: Vec<TrajPoint>,

    cost: TrajCost,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The cost of a trajectory.
///
/// Legal costs are never negative. Illegal trajectories have no numeric cost
/// and must never be compared against legal ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrajCost {
    Legal(f64),
    Illegal(IllegalReason),
}

/// Why a trajectory is illegal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IllegalReason {
    /// The trajectory has not been scored
    Unscored,

    /// Part of the trajectory hits a lethal obstacle
    Lethal,

    /// Part of the trajectory is in unobserved space
    Unknown,

    /// Part of the trajectory is outside the map
    OffMap,

    /// The trajectory ends in a cell the target cannot be reached from
    Unreachable,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trajectory {
    /// Build an unscored trajectory.
    pub fn new(vel: Velocity, time_delta_s: f64, points: Vec<TrajPoint>) -> Self {
        Self {
            vel,
            time_delta_s,
            points,
            cost: TrajCost::Illegal(IllegalReason::Unscored),
        }
    }

    /// Simulate a constant velocity from `start` for `sim_time_s` seconds in `num_steps` steps.
    pub fn constant(start: &Pose, vel: Velocity, sim_time_s: f64, num_steps: usize) -> Self {
        let num_steps = num_steps.max(1);
        let dt = sim_time_s / num_steps as f64;

        let mut pose = *start;
        let mut points = Vec::with_capacity(num_steps + 1);
        points.push(TrajPoint { pose, time_s: 0.0 });

        for i in 1..=num_steps {
            pose = pose.integrate(&vel, dt);
            points.push(TrajPoint {
                pose,
                time_s: i as f64 * dt,
            });
        }

        Self::new(vel, dt, points)
    }

    pub fn with_cost(mut self, cost: TrajCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn cost(&self) -> TrajCost {
        self.cost
    }

    pub fn is_legal(&self) -> bool {
        self.cost.is_legal()
    }

    pub fn start(&self) -> Option<&Pose> {
        self.points.first().map(|p| &p.pose)
    }

    pub fn end(&self) -> Option<&Pose> {
        self.points.last().map(|p| &p.pose)
    }
}

impl TrajCost {
    pub fn is_legal(&self) -> bool {
        matches!(self, TrajCost::Legal(_))
    }

    /// The numeric cost of a legal trajectory.
    pub fn legal(&self) -> Option<f64> {
        match self {
            TrajCost::Legal(c) => Some(*c),
            TrajCost::Illegal(_) => None,
        }
    }

    /// Numeric value for diagnostics, with illegal costs reported as [`ILLEGAL_COST`].
    pub fn as_f64(&self) -> f64 {
        self.legal().unwrap_or(ILLEGAL_COST)
    }
}
