//! Path and goal distance cost functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::TrajCostFunction;
use crate::loc::Pose;
use crate::map::{CostMap, GridCell, MapGrid};
use crate::traj::{IllegalReason, TrajCost, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Scores a trajectory by the propagated distance of its final point from a
/// set of target cells.
#[derive(Debug, Clone)]
pub struct MapGridCostFunction {
    target: MapGridTarget,
    grid: MapGrid,
    scale: f64,
    unknown_is_lethal: bool,

    /// Geometry of the map the grid was built on
    cell_size_m: f64,
    origin_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Which cells of a plan the grid is propagated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapGridTarget {
    /// Every cell of the plan
    Path,

    /// The last cell of the plan within the map
    LocalGoal,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MapGridCostFunction {
    pub fn new(target: MapGridTarget, scale: f64, unknown_is_lethal: bool) -> Self {
        Self {
            target,
            grid: MapGrid::default(),
            scale,
            unknown_is_lethal,
            cell_size_m: 1.0,
            origin_m: Vector2::zeros(),
        }
    }

    /// Rebuild the distance grid for the given map and plan.
    ///
    /// Must be called whenever the map or plan changes, scoring against an
    /// outdated grid is not detected.
    pub fn set_target_poses(&mut self, cost_map: &CostMap, plan: &[Pose]) {
        match self.target {
            MapGridTarget::Path => self.grid.set_target_cells(cost_map, plan, self.unknown_is_lethal),
            MapGridTarget::LocalGoal => self.grid.set_local_goal(cost_map, plan, self.unknown_is_lethal),
        }

        self.cell_size_m = cost_map.cell_size_m();
        self.origin_m = cost_map.params().origin_m;
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    /// Numeric cost of a cell, for diagnostics.
    pub fn cell_cost(&self, cx: usize, cy: usize) -> Option<f64> {
        self.grid.get(cx, cy).map(|c| self.grid.cell_cost(c))
    }

    fn grid_cell(&self, pose: &Pose) -> Option<GridCell> {
        let rel = (pose.position_m - self.origin_m) / self.cell_size_m;
        if !(rel.x >= 0.0 && rel.y >= 0.0) {
            return None;
        }

        self.grid.get(rel.x.floor() as usize, rel.y.floor() as usize)
    }
}

impl TrajCostFunction for MapGridCostFunction {
    fn score(&self, traj: &Trajectory) -> TrajCost {
        let end = match traj.end() {
            Some(p) => p,
            None => return TrajCost::Legal(0.0),
        };

        match self.grid_cell(end) {
            Some(GridCell::Dist(d)) => TrajCost::Legal(d as f64),
            Some(GridCell::Obstacle) => TrajCost::Illegal(IllegalReason::Lethal),
            Some(GridCell::Unreachable) => TrajCost::Illegal(IllegalReason::Unreachable),
            None => TrajCost::Illegal(IllegalReason::OffMap),
        }
    }

    fn scale(&self) -> f64 {
        self.scale
    }
}
