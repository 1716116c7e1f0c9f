//! Curvature sampling planner
//!
//! A secondary planner used when the scored sampler cannot find a legal
//! trajectory. Rather than sampling the velocity window uniformly it tests a
//! fan of curvatures centred on the curvature needed to reach the plan's
//! lookahead point, at decreasing speeds, and takes the fastest speed at
//! which any curvature is legal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use util::maths::lin_map;

use super::{is_better, PlanInput, TrajPlanner};
use crate::cost::score_trajectory;
use crate::loc::Velocity;
use crate::traj::Trajectory;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvSamplingParams {
    /// Number of forward speeds to test, from the top of the window down
    pub speed_samples: usize,

    /// Curvatures to test relative to the curvature towards the lookahead
    /// point, in 1/meters.
    pub curv_offsets_m: Vec<f64>,

    /// Distance along the plan to the lookahead point
    pub lookahead_dist_m: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CurvSamplingPlanner {
    params: CurvSamplingParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CurvSamplingParams {
    fn default() -> Self {
        Self {
            speed_samples: 4,
            curv_offsets_m: vec![0.0, -0.5, 0.5, -1.0, 1.0, -2.0, 2.0],
            lookahead_dist_m: 0.6,
        }
    }
}

impl CurvSamplingParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.speed_samples == 0 {
            return Err("at least one curvature sampler speed is needed".into());
        }
        if !(self.lookahead_dist_m > 0.0) {
            return Err("the lookahead distance must be positive".into());
        }

        Ok(())
    }
}

impl CurvSamplingPlanner {
    pub fn new(params: CurvSamplingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CurvSamplingParams {
        &self.params
    }

    /// Forward speeds to test, fastest first.
    fn speeds(&self, min_ms: f64, max_ms: f64) -> Vec<f64> {
        let n = self.params.speed_samples.max(1);

        if n == 1 || max_ms - min_ms < 1e-6 {
            return vec![max_ms];
        }

        (0..n)
            .map(|i| lin_map((0.0, (n - 1) as f64), (max_ms, min_ms), i as f64))
            .collect()
    }
}

impl TrajPlanner for CurvSamplingPlanner {
    fn find_best(
        &self,
        input: &PlanInput<'_>,
        mut explored: Option<&mut Vec<Trajectory>>,
    ) -> Option<Trajectory> {
        let window = input.generator.window();

        let max_ms = window.max.linear_ms[0];
        let min_ms = window.min.linear_ms[0].max(0.0);
        if max_ms <= 0.0 {
            debug!("Curvature sampling: no forward speed in the window");
            return None;
        }

        // Pure pursuit curvature towards the lookahead point
        let path_curv_m = input
            .lookahead_m
            .map(|p| {
                let local = input.pose.to_body(&p);
                let dist_sq = local.norm_squared();
                if dist_sq > 1e-9 {
                    2.0 * local.y / dist_sq
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);

        let offsets: &[f64] = if self.params.curv_offsets_m.is_empty() {
            &[0.0]
        } else {
            &self.params.curv_offsets_m
        };

        let vy_ms = 0f64.max(window.min.linear_ms[1]).min(window.max.linear_ms[1]);

        for speed_ms in self.speeds(min_ms, max_ms) {
            let mut best: Option<Trajectory> = None;

            for offset in offsets {
                let curv_m = path_curv_m + offset;
                let omega = (speed_ms * curv_m)
                    .max(window.min.angular_rads)
                    .min(window.max.angular_rads);

                let traj = match input.generator.generate(&Velocity::new(speed_ms, vy_ms, omega)) {
                    Some(t) => t,
                    None => continue,
                };

                let cost = score_trajectory(input.critics, &traj);
                let traj = traj.with_cost(cost);

                trace!("Curvature {:.3} at {:.3} m/s: {:?}", curv_m, speed_ms, cost);

                let new_best = cost.legal().map_or(false, |c| is_better(c, &best));

                if let Some(e) = explored.as_mut() {
                    e.push(traj.clone());
                }

                if new_best {
                    best = Some(traj);
                }
            }

            if best.is_some() {
                debug!(
                    "Curvature sampling: found trajectory at {:.3} m/s (path curvature {:.3})",
                    speed_ms, path_curv_m
                );
                return best;
            }
        }

        debug!("Curvature sampling: no legal trajectory");
        None
    }

    fn name(&self) -> &'static str {
        "curvature sampling"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cost::TrajCostFunction;
    use crate::loc::Pose;
    use crate::map::LETHAL_OBSTACLE;
    use crate::plan::test_utils::*;
    use nalgebra::Vector2;

    #[test]
    fn test_speeds() {
        let p = CurvSamplingPlanner::default();
        let speeds = p.speeds(0.1, 0.4);

        assert_eq!(speeds.len(), 4);
        assert!((speeds[0] - 0.4).abs() < 1e-9);
        assert!((speeds[3] - 0.1).abs() < 1e-9);
        assert!(speeds.windows(2).all(|w| w[0] > w[1]));

        assert_eq!(p.speeds(0.3, 0.3), vec![0.3]);
    }

    #[test]
    fn test_fastest_legal() {
        let pose = Pose::default();
        let vel = Velocity::new(0.3, 0.0, 0.0);
        let f = Fixture::new(clear_map(), &straight_plan(), &pose, &vel);
        let critics: [&dyn TrajCostFunction; 3] = [&f.obstacle, &f.path, &f.goal];
        let input = PlanInput {
            pose,
            vel,
            generator: &f.generator,
            critics: &critics,
            lookahead_m: Some(Vector2::new(0.6, 0.0)),
        };

        let best = CurvSamplingPlanner::default().find_best(&input, None).unwrap();

        assert!(best.is_legal());
        assert!((best.vel.linear_ms[0] - f.generator.window().max.linear_ms[0]).abs() < 1e-9);
    }

    #[test]
    fn test_slows_for_obstacle() {
        let pose = Pose::default();
        let vel = Velocity::new(0.3, 0.0, 0.0);

        // Wall ahead which the fastest trajectories reach, with room to pass at either end
        let mut map = clear_map();
        map.fill_rect(Vector2::new(0.75, -0.5), Vector2::new(0.9, 0.5), LETHAL_OBSTACLE);

        let f = Fixture::new(map, &straight_plan(), &pose, &vel);
        let critics: [&dyn TrajCostFunction; 3] = [&f.obstacle, &f.path, &f.goal];
        let input = PlanInput {
            pose,
            vel,
            generator: &f.generator,
            critics: &critics,
            lookahead_m: Some(Vector2::new(0.6, 0.0)),
        };

        let mut explored = Vec::new();
        let best = CurvSamplingPlanner::default()
            .find_best(&input, Some(&mut explored))
            .unwrap();

        assert!(best.is_legal());
        assert!(best.vel.linear_ms[0] < f.generator.window().max.linear_ms[0]);
        assert!(explored.iter().any(|t| !t.is_legal()));
        for p in &best.points {
            assert!(p.pose.position_m[0] < 0.75);
        }
    }

    #[test]
    fn test_curvature_towards_lookahead() {
        let pose = Pose::default();
        let vel = Velocity::new(0.3, 0.0, 0.0);
        let f = Fixture::new(clear_map(), &straight_plan(), &pose, &vel);
        let input = PlanInput {
            pose,
            vel,
            generator: &f.generator,
            critics: &[],
            lookahead_m: Some(Vector2::new(1.0, 1.0)),
        };

        // Only the zero offset, so the sample steers straight at the lookahead point
        let planner = CurvSamplingPlanner::new(CurvSamplingParams {
            curv_offsets_m: vec![0.0],
            ..Default::default()
        });
        let best = planner.find_best(&input, None).unwrap();

        assert!(best.vel.angular_rads > 0.0);
    }
}
