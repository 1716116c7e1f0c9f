//! # Simulation
//!
//! A minimal world for running the local planner without a robot. Obstacles are generated from
//! Perlin noise, and the robot is moved by a forward Euler step of the commanded velocity.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, warn};
use nalgebra::Vector2;
use noise::{NoiseFn, Perlin, Seedable};
use serde::{Deserialize, Serialize};

use crate::{
    loc::{Pose, Velocity},
    map::{CostMap, CostMapError, CostMapParams, FREE_SPACE, INSCRIBED_INFLATED_OBSTACLE, LETHAL_OBSTACLE},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    pub map: CostMapParams,

    /// Seed of the noise generator
    pub seed: u32,

    /// Scale applied to positions before sampling the noise, larger values give smaller obstacles
    pub noise_scale: f64,

    /// Noise values above this are lethal obstacles
    pub obstacle_threshold: f64,

    /// Width of the band of noise values below the threshold which are given a graded cost
    pub cost_band: f64,

    /// Radius around the start and goal which is kept clear of obstacles
    pub clear_radius_m: f64,
}

/// The simulated world
#[derive(Debug, Clone)]
pub struct SimWorld {
    cost_map: Arc<CostMap>,

    pose: Pose,

    vel: Velocity,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimWorld {
    /// Generate a new world with the robot at `start`.
    pub fn generate(params: &SimParams, start: Pose, goal_m: Vector2<f64>) -> Result<Self, CostMapError> {
        let mut cost_map = CostMap::new(params.map)?;
        let perlin = Perlin::new().set_seed(params.seed);

        let num_cells = cost_map.num_cells();
        for cx in 0..num_cells.x {
            for cy in 0..num_cells.y {
                let pos = match cost_map.cell_position(cx, cy) {
                    Some(p) => p,
                    None => continue,
                };

                let value = perlin.get([pos.x * params.noise_scale, pos.y * params.noise_scale]);
                cost_map.set(cx, cy, noise_to_cost(value, params))?;
            }
        }

        for centre in &[start.position_m, goal_m] {
            cost_map.fill_circle(*centre, params.clear_radius_m, FREE_SPACE);
        }

        debug!("Generated world with seed {}", params.seed);

        Ok(Self {
            cost_map: Arc::new(cost_map),
            pose: start,
            vel: Velocity::zero(),
        })
    }

    /// Shared handle to the world's cost map.
    pub fn cost_map(&self) -> Arc<CostMap> {
        Arc::clone(&self.cost_map)
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn vel(&self) -> Velocity {
        self.vel
    }

    /// Execute `cmd` for `dt_s` seconds.
    pub fn step(&mut self, cmd: &Velocity, dt_s: f64) {
        self.vel = *cmd;
        self.pose = self.pose.integrate(cmd, dt_s);

        if self.in_collision() {
            warn!("Robot in collision at {:?}", self.pose.position_m);
        }
    }

    /// True if the robot's centre is on a lethal cell or off the map.
    pub fn in_collision(&self) -> bool {
        self.cost_map
            .get_position(&self.pose.position_m)
            .map_or(true, |c| c >= LETHAL_OBSTACLE)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map a noise value in [-1, 1] to a cell cost.
fn noise_to_cost(value: f64, params: &SimParams) -> u8 {
    if value > params.obstacle_threshold {
        return LETHAL_OBSTACLE;
    }

    let band_start = params.obstacle_threshold - params.cost_band;
    if params.cost_band <= 0.0 || value <= band_start {
        return FREE_SPACE;
    }

    let frac = (value - band_start) / params.cost_band;
    util::maths::lin_map((0.0, 1.0), (1.0, (INSCRIBED_INFLATED_OBSTACLE - 1) as f64), frac) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> SimParams {
        SimParams {
            map: CostMapParams {
                cell_size_m: 0.1,
                num_cells: Vector2::new(50, 50),
                origin_m: Vector2::new(0.0, 0.0),
            },
            seed: 7,
            noise_scale: 0.8,
            obstacle_threshold: 0.3,
            cost_band: 0.2,
            clear_radius_m: 0.5,
        }
    }

    #[test]
    fn test_noise_to_cost() {
        let p = params();

        assert_eq!(noise_to_cost(0.31, &p), LETHAL_OBSTACLE);
        assert_eq!(noise_to_cost(0.0, &p), FREE_SPACE);

        let graded = noise_to_cost(0.2, &p);
        assert!(graded > FREE_SPACE && graded < INSCRIBED_INFLATED_OBSTACLE);
    }

    #[test]
    fn test_generate() {
        let start = Pose::new(1.0, 1.0, 0.0);
        let goal = Vector2::new(4.0, 4.0);

        let world = SimWorld::generate(&params(), start, goal).unwrap();

        assert_eq!(world.cost_map().get_position(&start.position_m), Some(FREE_SPACE));
        assert_eq!(world.cost_map().get_position(&goal), Some(FREE_SPACE));
        assert!(!world.in_collision());

        // Same seed, same world
        let other = SimWorld::generate(&params(), start, goal).unwrap();
        for cx in 0..50 {
            for cy in 0..50 {
                assert_eq!(world.cost_map().get(cx, cy), other.cost_map().get(cx, cy));
            }
        }
    }

    #[test]
    fn test_step() {
        let mut world = SimWorld::generate(&params(), Pose::new(1.0, 1.0, 0.0), Vector2::new(4.0, 4.0)).unwrap();

        world.step(&Velocity::new(0.5, 0.0, 0.0), 0.2);

        assert!((world.pose().position_m.x - 1.1).abs() < 1e-9);
        assert_eq!(world.vel(), Velocity::new(0.5, 0.0, 0.0));

        // Driving off the map counts as a collision
        world.step(&Velocity::new(-10.0, 0.0, 0.0), 1.0);
        assert!(world.in_collision());
    }
}
