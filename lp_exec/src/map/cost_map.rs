//! # Cost Map
//!
//! A single layer grid of traversal costs in the planning frame. Cell `(0, 0)`
//! has its lower-left corner at `origin_m`, cell indices increase along the
//! positive X and Y axes.
//!
//! Costs are `u8` values with four reserved levels:
//! ```text
//!   0 ........... 252   253        254      255
//!   FREE_SPACE  (cost)  INSCRIBED  LETHAL   NO_INFORMATION
//! ```

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::line_cells;
use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cost of a cell which is known to be free.
pub const FREE_SPACE: u8 = 0;

/// Cost of a cell within the robot's inscribed radius of an obstacle.
pub const INSCRIBED_INFLATED_OBSTACLE: u8 = 253;

/// Cost of a cell containing an obstacle.
pub const LETHAL_OBSTACLE: u8 = 254;

/// Cost of a cell which has not been observed.
pub const NO_INFORMATION: u8 = 255;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cost Map
#[derive(Clone, Debug)]
pub struct CostMap {
    params: CostMapParams,

    /// Raw cost data, dimension order x cell, y cell
    data: Array2<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostMapParams {
    /// The size of each (square) cell in meters
    pub cell_size_m: f64,

    /// The number of cells in each axis of the map
    pub num_cells: Vector2<usize>,

    /// Position of the lower-left corner of cell (0, 0)
    pub origin_m: Vector2<f64>,
}

/// Summary of the costs of a set of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCostSummary {
    /// Highest cost among the observed cells, `FREE_SPACE` if there were none
    pub max_cost: u8,

    /// True if any of the cells had no information
    pub has_unknown: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can arise from processing costs maps.
#[derive(Debug, thiserror::Error)]
pub enum CostMapError {
    #[error("Requested position or cell outside map bounds")]
    OutsideMap,

    #[error("Cell size must be positive and the map must contain cells, got {0:?}")]
    InvalidParams(CostMapParams),

    #[error("Cannot build the map, expected data of shape {0}, but got {1}")]
    ShapeMismatch(Vector2<usize>, Vector2<usize>),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CostMap {
    /// Create a new map in which every cell is free.
    pub fn new(params: CostMapParams) -> Result<Self, CostMapError> {
        Self::filled(params, FREE_SPACE)
    }

    /// Create a new map with every cell set to `cost`.
    pub fn filled(params: CostMapParams, cost: u8) -> Result<Self, CostMapError> {
        params.validate()?;

        Ok(Self {
            data: Array2::from_elem((params.num_cells.x, params.num_cells.y), cost),
            params,
        })
    }

    /// Create a map from existing data, which must be of shape `params.num_cells`.
    pub fn from_array(params: CostMapParams, data: Array2<u8>) -> Result<Self, CostMapError> {
        params.validate()?;

        let shape = Vector2::new(data.nrows(), data.ncols());
        if shape != params.num_cells {
            return Err(CostMapError::ShapeMismatch(params.num_cells, shape));
        }

        Ok(Self { params, data })
    }

    pub fn params(&self) -> &CostMapParams {
        &self.params
    }

    pub fn cell_size_m(&self) -> f64 {
        self.params.cell_size_m
    }

    pub fn num_cells(&self) -> Vector2<usize> {
        self.params.num_cells
    }

    pub fn cell_in_map(&self, cx: usize, cy: usize) -> bool {
        cx < self.params.num_cells.x && cy < self.params.num_cells.y
    }

    /// Get the cell containing the given position, or `None` if the position is outside the map.
    pub fn position_to_cell(&self, position_m: &Vector2<f64>) -> Option<Vector2<usize>> {
        self.signed_cell(position_m).and_then(|c| self.checked_cell(&c))
    }

    /// Get the position of the centre of a cell.
    pub fn cell_position(&self, cx: usize, cy: usize) -> Option<Vector2<f64>> {
        if !self.cell_in_map(cx, cy) {
            return None;
        }

        Some(
            self.params.origin_m
                + Vector2::new(cx as f64 + 0.5, cy as f64 + 0.5) * self.params.cell_size_m,
        )
    }

    /// Cost of a cell, or `None` outside the map.
    pub fn get(&self, cx: usize, cy: usize) -> Option<u8> {
        self.data.get((cx, cy)).copied()
    }

    /// Cost of the cell containing a position, or `None` outside the map.
    pub fn get_position(&self, position_m: &Vector2<f64>) -> Option<u8> {
        let cell = self.position_to_cell(position_m)?;
        self.get(cell.x, cell.y)
    }

    pub fn set(&mut self, cx: usize, cy: usize, cost: u8) -> Result<(), CostMapError> {
        match self.data.get_mut((cx, cy)) {
            Some(c) => {
                *c = cost;
                Ok(())
            }
            None => Err(CostMapError::OutsideMap),
        }
    }

    pub fn set_position(&mut self, position_m: &Vector2<f64>, cost: u8) -> Result<(), CostMapError> {
        let cell = self
            .position_to_cell(position_m)
            .ok_or(CostMapError::OutsideMap)?;
        self.set(cell.x, cell.y, cost)
    }

    /// Set every cell whose centre lies within the axis-aligned rectangle to `cost`.
    pub fn fill_rect(&mut self, min_m: Vector2<f64>, max_m: Vector2<f64>, cost: u8) {
        let params = self.params;
        for ((cx, cy), c) in self.data.indexed_iter_mut() {
            let centre = params.origin_m
                + Vector2::new(cx as f64 + 0.5, cy as f64 + 0.5) * params.cell_size_m;

            if centre.x >= min_m.x && centre.x <= max_m.x && centre.y >= min_m.y && centre.y <= max_m.y
            {
                *c = cost;
            }
        }
    }

    /// Set every cell whose centre lies within `radius_m` of `centre_m` to `cost`.
    pub fn fill_circle(&mut self, centre_m: Vector2<f64>, radius_m: f64, cost: u8) {
        let params = self.params;
        for ((cx, cy), c) in self.data.indexed_iter_mut() {
            let pos = params.origin_m
                + Vector2::new(cx as f64 + 0.5, cy as f64 + 0.5) * params.cell_size_m;

            if (pos - centre_m).norm() <= radius_m {
                *c = cost;
            }
        }
    }

    /// Summarise the cost along the line between two positions.
    ///
    /// Returns `None` if any part of the line leaves the map.
    pub fn line_cost(&self, from_m: &Vector2<f64>, to_m: &Vector2<f64>) -> Option<CellCostSummary> {
        let from = self.signed_cell(from_m)?;
        let to = self.signed_cell(to_m)?;

        let mut summary = CellCostSummary::default();
        for cell in line_cells(from, to) {
            let cell = self.checked_cell(&cell)?;
            summary.add(self.data[(cell.x, cell.y)]);
        }

        Some(summary)
    }

    /// Summarise the cost of the footprint outline placed at the given pose.
    ///
    /// The footprint is a polygon in the robot's body frame. Each edge, including the closing
    /// edge, is rasterised. Returns `None` if any part of the outline leaves the map. Footprints
    /// with fewer than three points reduce to the cell under the pose.
    pub fn footprint_cost(&self, pose: &Pose, footprint_m: &[Vector2<f64>]) -> Option<CellCostSummary> {
        if footprint_m.len() < 3 {
            let mut summary = CellCostSummary::default();
            summary.add(self.get_position(&pose.position_m)?);
            return Some(summary);
        }

        let vertices: Vec<Vector2<f64>> = footprint_m.iter().map(|v| pose.to_parent(v)).collect();

        let mut summary = CellCostSummary::default();
        for i in 0..vertices.len() {
            let next = (i + 1) % vertices.len();
            summary.merge(&self.line_cost(&vertices[i], &vertices[next])?);
        }

        Some(summary)
    }

    /// Cell containing a position, without bounds checking.
    fn signed_cell(&self, position_m: &Vector2<f64>) -> Option<Vector2<isize>> {
        let rel = (position_m - self.params.origin_m) / self.params.cell_size_m;

        if !rel.x.is_finite() || !rel.y.is_finite() {
            return None;
        }

        Some(Vector2::new(rel.x.floor() as isize, rel.y.floor() as isize))
    }

    fn checked_cell(&self, cell: &Vector2<isize>) -> Option<Vector2<usize>> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }

        let cell = Vector2::new(cell.x as usize, cell.y as usize);
        if self.cell_in_map(cell.x, cell.y) {
            Some(cell)
        } else {
            None
        }
    }
}

impl CostMapParams {
    fn validate(&self) -> Result<(), CostMapError> {
        if self.cell_size_m > 0.0 && self.num_cells.x > 0 && self.num_cells.y > 0 {
            Ok(())
        } else {
            Err(CostMapError::InvalidParams(*self))
        }
    }
}

impl Default for CellCostSummary {
    fn default() -> Self {
        Self {
            max_cost: FREE_SPACE,
            has_unknown: false,
        }
    }
}

impl CellCostSummary {
    /// Add a cell's cost into the summary.
    pub fn add(&mut self, cost: u8) {
        if cost == NO_INFORMATION {
            self.has_unknown = true;
        } else {
            self.max_cost = self.max_cost.max(cost);
        }
    }

    pub fn merge(&mut self, other: &CellCostSummary) {
        self.max_cost = self.max_cost.max(other.max_cost);
        self.has_unknown |= other.has_unknown;
    }

    pub fn is_lethal(&self) -> bool {
        self.max_cost >= LETHAL_OBSTACLE
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> CostMapParams {
        CostMapParams {
            cell_size_m: 0.1,
            num_cells: Vector2::new(40, 20),
            origin_m: Vector2::new(-1.0, -1.0),
        }
    }

    #[test]
    fn test_conversions() {
        let map = CostMap::new(params()).unwrap();

        assert_eq!(map.position_to_cell(&Vector2::new(-1.0, -1.0)), Some(Vector2::new(0, 0)));
        assert_eq!(map.position_to_cell(&Vector2::new(0.05, 0.05)), Some(Vector2::new(10, 10)));
        assert_eq!(map.position_to_cell(&Vector2::new(-1.01, 0.0)), None);
        assert_eq!(map.position_to_cell(&Vector2::new(0.0, 1.0)), None);

        let centre = map.cell_position(10, 10).unwrap();
        assert!((centre - Vector2::new(0.05, 0.05)).norm() < 1e-9);
        assert_eq!(map.cell_position(40, 0), None);
    }

    #[test]
    fn test_invalid() {
        let mut p = params();
        p.cell_size_m = 0.0;
        assert!(matches!(CostMap::new(p), Err(CostMapError::InvalidParams(_))));

        let data = Array2::from_elem((3, 3), FREE_SPACE);
        assert!(matches!(
            CostMap::from_array(params(), data),
            Err(CostMapError::ShapeMismatch(_, _))
        ));
    }

    #[test]
    fn test_get_set() {
        let mut map = CostMap::new(params()).unwrap();

        map.set_position(&Vector2::new(0.0, 0.0), LETHAL_OBSTACLE).unwrap();
        assert_eq!(map.get(10, 10), Some(LETHAL_OBSTACLE));
        assert_eq!(map.get_position(&Vector2::new(0.01, 0.09)), Some(LETHAL_OBSTACLE));
        assert_eq!(map.get(40, 0), None);
        assert!(map.set(0, 20, FREE_SPACE).is_err());
    }

    #[test]
    fn test_fill() {
        let mut map = CostMap::new(params()).unwrap();

        map.fill_rect(Vector2::new(0.0, 0.0), Vector2::new(0.2, 0.2), 100);
        assert_eq!(map.get(10, 10), Some(100));
        assert_eq!(map.get(11, 11), Some(100));
        assert_eq!(map.get(12, 12), Some(FREE_SPACE));
        assert_eq!(map.get(9, 10), Some(FREE_SPACE));

        map.fill_circle(Vector2::new(1.0, 0.0), 0.1, LETHAL_OBSTACLE);
        assert_eq!(map.get_position(&Vector2::new(1.0, 0.0)), Some(LETHAL_OBSTACLE));
        assert_eq!(map.get_position(&Vector2::new(1.3, 0.0)), Some(FREE_SPACE));
    }

    #[test]
    fn test_footprint_cost() {
        let mut map = CostMap::new(params()).unwrap();
        let footprint = vec![
            Vector2::new(0.2, 0.1),
            Vector2::new(0.2, -0.1),
            Vector2::new(-0.2, -0.1),
            Vector2::new(-0.2, 0.1),
        ];
        let pose = Pose::new(0.0, 0.0, 0.0);

        let summary = map.footprint_cost(&pose, &footprint).unwrap();
        assert_eq!(summary.max_cost, FREE_SPACE);
        assert!(!summary.has_unknown);

        // Cost under the front edge is seen by the footprint but not the centre
        map.set_position(&Vector2::new(0.2, 0.0), LETHAL_OBSTACLE).unwrap();
        assert!(map.footprint_cost(&pose, &footprint).unwrap().is_lethal());
        assert!(!map.footprint_cost(&pose, &[]).unwrap().is_lethal());

        // Unknown cells do not hide lethal ones
        map.set_position(&Vector2::new(-0.2, 0.0), NO_INFORMATION).unwrap();
        let summary = map.footprint_cost(&pose, &footprint).unwrap();
        assert!(summary.is_lethal());
        assert!(summary.has_unknown);

        // Footprint hanging off the map
        assert_eq!(map.footprint_cost(&Pose::new(-0.9, 0.0, 0.0), &footprint), None);
    }
}
