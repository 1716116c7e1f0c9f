//! Scored sampling planner, the primary planner which scores every sample of
//! the dynamic window.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};

use super::{is_better, PlanInput, TrajPlanner};
use crate::cost::score_trajectory;
use crate::traj::{SamplingParams, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ScoredSamplingPlanner {
    /// Maximum number of candidates to score
    max_samples: Option<usize>,

    /// Stop on the first legal candidate at or below this cost
    good_enough_cost: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScoredSamplingPlanner {
    pub fn new(sampling: &SamplingParams) -> Self {
        Self {
            max_samples: sampling.max_samples,
            good_enough_cost: sampling.good_enough_cost,
        }
    }

    pub fn set_params(&mut self, sampling: &SamplingParams) {
        *self = Self::new(sampling);
    }
}

impl TrajPlanner for ScoredSamplingPlanner {
    fn find_best(
        &self,
        input: &PlanInput<'_>,
        mut explored: Option<&mut Vec<Trajectory>>,
    ) -> Option<Trajectory> {
        let mut best: Option<Trajectory> = None;
        let mut num_scored = 0usize;
        let mut num_legal = 0usize;

        for traj in input.generator.candidates() {
            if self.max_samples.map_or(false, |m| num_scored >= m) {
                break;
            }
            num_scored += 1;

            let cost = score_trajectory(input.critics, &traj);
            let traj = traj.with_cost(cost);

            trace!("Sample {:?}: {:?}", traj.vel, cost);

            let mut good_enough = false;
            let mut new_best = false;
            if let Some(c) = cost.legal() {
                num_legal += 1;
                new_best = is_better(c, &best);
                good_enough = self.good_enough_cost.map_or(false, |g| c <= g);
            }

            if let Some(e) = explored.as_mut() {
                e.push(traj.clone());
            }

            if new_best {
                best = Some(traj);
            }

            if good_enough {
                break;
            }
        }

        debug!(
            "Scored sampling: {} candidates, {} legal, best cost {:?}",
            num_scored,
            num_legal,
            best.as_ref().map(|b| b.cost().as_f64())
        );

        best
    }

    fn name(&self) -> &'static str {
        "scored sampling"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cost::TrajCostFunction;
    use crate::loc::{Pose, Velocity};
    use crate::map::LETHAL_OBSTACLE;
    use crate::plan::test_utils::*;
    use nalgebra::Vector2;

    #[test]
    fn test_forward_on_clear_map() {
        let pose = Pose::default();
        let f = Fixture::new(clear_map(), &straight_plan(), &pose, &Velocity::zero());
        let critics: [&dyn TrajCostFunction; 3] = [&f.obstacle, &f.path, &f.goal];
        let input = PlanInput {
            pose,
            vel: Velocity::zero(),
            generator: &f.generator,
            critics: &critics,
            lookahead_m: None,
        };

        let mut explored = Vec::new();
        let best = ScoredSamplingPlanner::default()
            .find_best(&input, Some(&mut explored))
            .unwrap();

        assert!(best.is_legal());
        assert!(best.cost().legal().unwrap() >= 0.0);
        assert!(best.vel.linear_ms[0] > 0.0);
        assert!(best.end().unwrap().position_m[0] > 0.0);

        // Every candidate was recorded, and nothing legal is cheaper than the best
        assert_eq!(explored.len(), f.generator.candidates().count());
        let best_cost = best.cost().legal().unwrap();
        assert!(explored
            .iter()
            .filter_map(|t| t.cost().legal())
            .all(|c| c >= best_cost));
    }

    #[test]
    fn test_earliest_on_ties() {
        let pose = Pose::default();
        let f = Fixture::new(clear_map(), &straight_plan(), &pose, &Velocity::zero());

        // With no cost functions every trajectory costs zero
        let input = PlanInput {
            pose,
            vel: Velocity::zero(),
            generator: &f.generator,
            critics: &[],
            lookahead_m: None,
        };

        let best = ScoredSamplingPlanner::default().find_best(&input, None).unwrap();
        let first = f.generator.candidates().next().unwrap();
        assert_eq!(best.vel, first.vel);
    }

    #[test]
    fn test_limits() {
        let pose = Pose::default();
        let f = Fixture::new(clear_map(), &straight_plan(), &pose, &Velocity::zero());
        let critics: [&dyn TrajCostFunction; 3] = [&f.obstacle, &f.path, &f.goal];
        let input = PlanInput {
            pose,
            vel: Velocity::zero(),
            generator: &f.generator,
            critics: &critics,
            lookahead_m: None,
        };

        let planner = ScoredSamplingPlanner::new(&SamplingParams {
            max_samples: Some(5),
            ..Default::default()
        });
        let mut explored = Vec::new();
        planner.find_best(&input, Some(&mut explored));
        assert_eq!(explored.len(), 5);

        let planner = ScoredSamplingPlanner::new(&SamplingParams {
            good_enough_cost: Some(1e9),
            ..Default::default()
        });
        let mut explored = Vec::new();
        let best = planner.find_best(&input, Some(&mut explored)).unwrap();
        assert_eq!(explored.iter().filter(|t| t.is_legal()).count(), 1);
        assert_eq!(explored.last().unwrap(), &best);
    }

    #[test]
    fn test_none_when_blocked() {
        let pose = Pose::default();
        let mut map = clear_map();
        // Robot sits inside a lethal region
        map.fill_circle(Vector2::zeros(), 0.2, LETHAL_OBSTACLE);

        let f = Fixture::new(map, &straight_plan(), &pose, &Velocity::zero());
        let critics: [&dyn TrajCostFunction; 3] = [&f.obstacle, &f.path, &f.goal];
        let input = PlanInput {
            pose,
            vel: Velocity::zero(),
            generator: &f.generator,
            critics: &critics,
            lookahead_m: None,
        };

        assert!(ScoredSamplingPlanner::default().find_best(&input, None).is_none());
    }
}
