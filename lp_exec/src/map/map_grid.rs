//! # Map Grid
//!
//! A grid of distances (in cells) propagated outwards from a set of target
//! cells over the traversable part of a [`CostMap`]. The path cost function
//! targets every plan cell, the goal cost function targets the local goal.

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use log::trace;
use nalgebra::Vector2;
use ndarray::Array2;

use super::{CostMap, INSCRIBED_INFLATED_OBSTACLE, NO_INFORMATION};
use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MapGrid {
    /// Dimension order x cell, y cell
    cells: Array2<GridCell>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Value of a single cell in a [`MapGrid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCell {
    /// The cell was not reached from any target
    Unreachable,

    /// The cell cannot be traversed
    Obstacle,

    /// Number of cells between this one and the nearest target
    Dist(u32),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for MapGrid {
    fn default() -> Self {
        Self::new(Vector2::new(0, 0))
    }
}

impl MapGrid {
    /// Create a new grid where every cell is unreachable.
    pub fn new(num_cells: Vector2<usize>) -> Self {
        Self {
            cells: Array2::from_elem((num_cells.x, num_cells.y), GridCell::Unreachable),
        }
    }

    pub fn num_cells(&self) -> Vector2<usize> {
        Vector2::new(self.cells.nrows(), self.cells.ncols())
    }

    pub fn get(&self, cx: usize, cy: usize) -> Option<GridCell> {
        self.cells.get((cx, cy)).copied()
    }

    /// Numeric cost of obstacle cells, larger than any propagated distance.
    pub fn obstacle_cost(&self) -> f64 {
        self.cells.len() as f64
    }

    /// Numeric cost of unreachable cells.
    pub fn unreachable_cost(&self) -> f64 {
        self.cells.len() as f64 + 1.0
    }

    /// Numeric cost of a cell, used for diagnostics.
    pub fn cell_cost(&self, cell: GridCell) -> f64 {
        match cell {
            GridCell::Unreachable => self.unreachable_cost(),
            GridCell::Obstacle => self.obstacle_cost(),
            GridCell::Dist(d) => d as f64,
        }
    }

    /// Rebuild the grid with every in-map cell of the plan as a target.
    ///
    /// Targets stop being added once the plan leaves the map after having
    /// entered it.
    pub fn set_target_cells(&mut self, cost_map: &CostMap, plan: &[Pose], unknown_is_lethal: bool) {
        self.reset(cost_map.num_cells());

        let mut queue = VecDeque::new();
        for cell in plan_cells(cost_map, plan) {
            if is_obstacle(cost_map, &cell, unknown_is_lethal) {
                continue;
            }

            if self.cells[(cell.x, cell.y)] == GridCell::Unreachable {
                self.cells[(cell.x, cell.y)] = GridCell::Dist(0);
                queue.push_back(cell);
            }
        }

        trace!("Path grid seeded with {} cells", queue.len());

        self.propagate(cost_map, queue, unknown_is_lethal);
    }

    /// Rebuild the grid with the local goal as the only target.
    ///
    /// The local goal is the last traversable cell of the plan before it leaves the map.
    pub fn set_local_goal(&mut self, cost_map: &CostMap, plan: &[Pose], unknown_is_lethal: bool) {
        self.reset(cost_map.num_cells());

        let goal = plan_cells(cost_map, plan)
            .into_iter()
            .rev()
            .find(|c| !is_obstacle(cost_map, c, unknown_is_lethal));

        let mut queue = VecDeque::new();
        if let Some(cell) = goal {
            trace!("Local goal at cell ({}, {})", cell.x, cell.y);
            self.cells[(cell.x, cell.y)] = GridCell::Dist(0);
            queue.push_back(cell);
        }

        self.propagate(cost_map, queue, unknown_is_lethal);
    }

    fn reset(&mut self, num_cells: Vector2<usize>) {
        if self.num_cells() == num_cells {
            self.cells.fill(GridCell::Unreachable);
        } else {
            *self = Self::new(num_cells);
        }
    }

    /// Breadth first propagation of distances from the queued target cells over 4-connected
    /// neighbours.
    fn propagate(&mut self, cost_map: &CostMap, mut queue: VecDeque<Vector2<usize>>, unknown_is_lethal: bool) {
        let num_cells = self.num_cells();

        while let Some(cell) = queue.pop_front() {
            let dist = match self.cells[(cell.x, cell.y)] {
                GridCell::Dist(d) => d,
                _ => continue,
            };

            let mut neighbours = Vec::with_capacity(4);
            if cell.x > 0 {
                neighbours.push(Vector2::new(cell.x - 1, cell.y));
            }
            if cell.x + 1 < num_cells.x {
                neighbours.push(Vector2::new(cell.x + 1, cell.y));
            }
            if cell.y > 0 {
                neighbours.push(Vector2::new(cell.x, cell.y - 1));
            }
            if cell.y + 1 < num_cells.y {
                neighbours.push(Vector2::new(cell.x, cell.y + 1));
            }

            for n in neighbours {
                if self.cells[(n.x, n.y)] != GridCell::Unreachable {
                    continue;
                }

                if is_obstacle(cost_map, &n, unknown_is_lethal) {
                    self.cells[(n.x, n.y)] = GridCell::Obstacle;
                } else {
                    self.cells[(n.x, n.y)] = GridCell::Dist(dist + 1);
                    queue.push_back(n);
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Cells covered by the plan, interpolated to the map resolution, up to the point where the plan
/// leaves the map after having entered it.
fn plan_cells(cost_map: &CostMap, plan: &[Pose]) -> Vec<Vector2<usize>> {
    let mut cells: Vec<Vector2<usize>> = Vec::new();
    let mut started = false;

    for position in adjust_plan_resolution(plan, cost_map.cell_size_m()) {
        match cost_map.position_to_cell(&position) {
            Some(cell) => {
                started = true;
                if cells.last() != Some(&cell) {
                    cells.push(cell);
                }
            }
            None if started => break,
            None => (),
        }
    }

    cells
}

/// Insert points into the plan so that no two consecutive points are further apart than
/// `resolution_m`.
fn adjust_plan_resolution(plan: &[Pose], resolution_m: f64) -> Vec<Vector2<f64>> {
    let mut points = Vec::with_capacity(plan.len());

    if let Some(first) = plan.first() {
        points.push(first.position_m);
    }

    for w in plan.windows(2) {
        let diff = w[1].position_m - w[0].position_m;
        let steps = (diff.norm() / resolution_m).ceil().max(1.0) as usize;

        for i in 1..=steps {
            points.push(w[0].position_m + diff * (i as f64 / steps as f64));
        }
    }

    points
}

fn is_obstacle(cost_map: &CostMap, cell: &Vector2<usize>, unknown_is_lethal: bool) -> bool {
    match cost_map.get(cell.x, cell.y) {
        Some(NO_INFORMATION) => unknown_is_lethal,
        Some(c) => c >= INSCRIBED_INFLATED_OBSTACLE,
        None => true,
    }
}
