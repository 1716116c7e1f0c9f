//! # Trajectory planners
//!
//! Each planner selects one trajectory for the current cycle. The sampling
//! planners search the velocity space and score candidates with the cost
//! functions, the recovery planners produce a fixed manoeuvre which bypasses
//! the cost functions.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod backup;
mod curv_sampling;
mod dir_adjust;
mod scored_sampling;

pub use backup::BackupPlanner;
pub use curv_sampling::{CurvSamplingParams, CurvSamplingPlanner};
pub use dir_adjust::DirAdjustPlanner;
pub use scored_sampling::ScoredSamplingPlanner;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use ordered_float::OrderedFloat;

use crate::cost::TrajCostFunction;
use crate::loc::{Pose, Velocity};
use crate::traj::{TrajGenerator, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything a planner needs for one cycle.
pub struct PlanInput<'a> {
    pub pose: Pose,
    pub vel: Velocity,

    /// Generator initialised with the current pose and velocity
    pub generator: &'a TrajGenerator,

    /// Cost functions, in evaluation order
    pub critics: &'a [&'a dyn TrajCostFunction],

    /// Point on the plan ahead of the robot
    pub lookahead_m: Option<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait TrajPlanner {
    /// Find the best trajectory for this cycle.
    ///
    /// Returns `None` if no legal trajectory could be found, an illegal
    /// trajectory is never returned. Every trajectory which was scored is
    /// pushed into `explored` if it is given.
    fn find_best(
        &self,
        input: &PlanInput<'_>,
        explored: Option<&mut Vec<Trajectory>>,
    ) -> Option<Trajectory>;

    /// Name of the planner used in logs.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Returns true if a legal `cost` is strictly cheaper than the current best.
///
/// Ties keep the current best, so the earliest sample wins.
fn is_better(cost: f64, best: &Option<Trajectory>) -> bool {
    match best.as_ref().and_then(|b| b.cost().legal()) {
        Some(b) => OrderedFloat(cost) < OrderedFloat(b),
        None => true,
    }
}
