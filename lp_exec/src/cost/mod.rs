//! # Trajectory cost functions
//!
//! Each cost function maps a trajectory onto a non-negative cost or rejects
//! it as illegal. The total cost of a trajectory is the sum of the weighted
//! costs of each function.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod map_grid_cost;
mod obstacle_cost;

pub use map_grid_cost::{MapGridCostFunction, MapGridTarget};
pub use obstacle_cost::ObstacleCostFunction;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::traj::{TrajCost, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Weights applied to each cost function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostWeights {
    /// Weight of the distance from the end of the trajectory to the path
    pub pdist_scale: f64,

    /// Weight of the distance from the end of the trajectory to the local goal
    pub gdist_scale: f64,

    /// Weight of the highest obstacle cost along the trajectory
    pub occdist_scale: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait TrajCostFunction {
    /// Score a trajectory, without applying the scale.
    fn score(&self, traj: &Trajectory) -> TrajCost;

    /// Weight applied to this function's cost.
    fn scale(&self) -> f64;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            pdist_scale: 0.6,
            gdist_scale: 0.8,
            occdist_scale: 0.01,
        }
    }
}

impl CostWeights {
    pub fn validate(&self) -> Result<(), String> {
        let all = [self.pdist_scale, self.gdist_scale, self.occdist_scale];

        if all.iter().all(|w| w.is_finite() && *w >= 0.0) {
            Ok(())
        } else {
            Err(format!("cost weights must be finite and non-negative, got {:?}", self))
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Score a trajectory with every cost function.
///
/// Functions are evaluated in order and the first illegal result is returned
/// without evaluating the rest. Functions with a zero scale are skipped.
pub fn score_trajectory(critics: &[&dyn TrajCostFunction], traj: &Trajectory) -> TrajCost {
    let mut total = 0.0;

    for critic in critics {
        let scale = critic.scale();
        if scale == 0.0 {
            continue;
        }

        match critic.score(traj) {
            TrajCost::Legal(c) => total += scale * c,
            illegal => return illegal,
        }
    }

    TrajCost::Legal(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::{Pose, Velocity};
    use crate::traj::IllegalReason;
    use std::cell::Cell;

    struct Fixed {
        cost: TrajCost,
        scale: f64,
        calls: Cell<usize>,
    }

    impl Fixed {
        fn new(cost: TrajCost, scale: f64) -> Self {
            Self {
                cost,
                scale,
                calls: Cell::new(0),
            }
        }
    }

    impl TrajCostFunction for Fixed {
        fn score(&self, _traj: &Trajectory) -> TrajCost {
            self.calls.set(self.calls.get() + 1);
            self.cost
        }

        fn scale(&self) -> f64 {
            self.scale
        }
    }

    fn traj() -> Trajectory {
        Trajectory::constant(&Pose::default(), Velocity::new(0.1, 0.0, 0.0), 1.0, 1)
    }

    #[test]
    fn test_weighted_sum() {
        let a = Fixed::new(TrajCost::Legal(2.0), 0.5);
        let b = Fixed::new(TrajCost::Legal(3.0), 2.0);

        assert_eq!(score_trajectory(&[&a, &b], &traj()), TrajCost::Legal(7.0));
        assert_eq!(score_trajectory(&[], &traj()), TrajCost::Legal(0.0));
    }

    #[test]
    fn test_short_circuit() {
        let a = Fixed::new(TrajCost::Illegal(IllegalReason::Lethal), 1.0);
        let b = Fixed::new(TrajCost::Legal(3.0), 2.0);

        assert_eq!(
            score_trajectory(&[&a, &b], &traj()),
            TrajCost::Illegal(IllegalReason::Lethal)
        );
        assert_eq!(a.calls.get(), 1);
        assert_eq!(b.calls.get(), 0);
    }

    #[test]
    fn test_zero_scale_skipped() {
        let a = Fixed::new(TrajCost::Illegal(IllegalReason::OffMap), 0.0);
        let b = Fixed::new(TrajCost::Legal(3.0), 1.0);

        assert_eq!(score_trajectory(&[&a, &b], &traj()), TrajCost::Legal(3.0));
        assert_eq!(a.calls.get(), 0);
    }

    #[test]
    fn test_weights() {
        assert!(CostWeights::default().validate().is_ok());
        assert!(CostWeights {
            pdist_scale: -1.0,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
