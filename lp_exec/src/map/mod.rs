//! # Maps
//!
//! The cost map consumed by the local planner and the distance grids derived
//! from it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod cost_map;
mod map_grid;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cost_map::*;
pub use map_grid::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Cells crossed by the straight line between two cells, both ends included.
///
/// Uses Bresenham's algorithm, so every returned cell shares an edge or a
/// corner with the previous one.
pub fn line_cells(from: Vector2<isize>, to: Vector2<isize>) -> Vec<Vector2<isize>> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut err = dx + dy;
    let mut cell = from;
    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);

    loop {
        cells.push(cell);

        if cell == to {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            cell.x += sx;
        }
        if e2 <= dx {
            err += dx;
            cell.y += sy;
        }
    }

    cells
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_cells() {
        let cells = line_cells(Vector2::new(0, 0), Vector2::new(3, 0));
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[3], Vector2::new(3, 0));

        let cells = line_cells(Vector2::new(2, 2), Vector2::new(-1, -1));
        assert_eq!(
            cells,
            vec![
                Vector2::new(2, 2),
                Vector2::new(1, 1),
                Vector2::new(0, 0),
                Vector2::new(-1, -1)
            ]
        );

        let cells = line_cells(Vector2::new(0, 0), Vector2::new(1, 5));
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], Vector2::new(0, 0));
        assert_eq!(cells[5], Vector2::new(1, 5));

        assert_eq!(line_cells(Vector2::new(4, 4), Vector2::new(4, 4)).len(), 1);
    }
}
