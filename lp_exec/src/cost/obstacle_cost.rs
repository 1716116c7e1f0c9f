//! Obstacle cost function

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use nalgebra::Vector2;

use super::TrajCostFunction;
use crate::map::CostMap;
use crate::traj::{IllegalReason, TrajCost, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Scores a trajectory by the highest cost map cost along it.
///
/// A trajectory is illegal if any point (or the footprint at that point) hits
/// a lethal cell, leaves the map, or touches unknown space when unknown space
/// is treated as lethal.
#[derive(Debug, Clone)]
pub struct ObstacleCostFunction {
    cost_map: Option<Arc<CostMap>>,
    footprint_m: Vec<Vector2<f64>>,
    scale: f64,
    unknown_is_lethal: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleCostFunction {
    pub fn new(scale: f64, unknown_is_lethal: bool) -> Self {
        Self {
            cost_map: None,
            footprint_m: Vec::new(),
            scale,
            unknown_is_lethal,
        }
    }

    pub fn set_cost_map(&mut self, cost_map: Arc<CostMap>) {
        self.cost_map = Some(cost_map);
    }

    /// Set the robot's footprint polygon, in the body frame. Footprints with
    /// fewer than three points are treated as a single point.
    pub fn set_footprint(&mut self, footprint_m: &[Vector2<f64>]) {
        self.footprint_m.clear();
        self.footprint_m.extend_from_slice(footprint_m);
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }
}

impl TrajCostFunction for ObstacleCostFunction {
    fn score(&self, traj: &Trajectory) -> TrajCost {
        let cost_map = match self.cost_map {
            Some(ref m) => m,
            None => return TrajCost::Illegal(IllegalReason::OffMap),
        };

        let mut max_cost = 0u8;
        for point in &traj.points {
            let summary = match cost_map.footprint_cost(&point.pose, &self.footprint_m) {
                Some(s) => s,
                None => return TrajCost::Illegal(IllegalReason::OffMap),
            };

            if summary.is_lethal() {
                return TrajCost::Illegal(IllegalReason::Lethal);
            }
            if summary.has_unknown && self.unknown_is_lethal {
                return TrajCost::Illegal(IllegalReason::Unknown);
            }

            max_cost = max_cost.max(summary.max_cost);
        }

        TrajCost::Legal(max_cost as f64)
    }

    fn scale(&self) -> f64 {
        self.scale
    }
}
