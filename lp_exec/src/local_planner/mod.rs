//! # Local planner
//!
//! Selects the velocity command for each control cycle. Each cycle the caller
//! first refreshes the cost grids with [`LocalPlanner::update_plan_and_local_costs`]
//! and then asks for a trajectory with [`LocalPlanner::find_best_path`].
//!
//! In normal operation the scored sampling planner searches the dynamic
//! window, falling back on the curvature sampling planner. If neither finds a
//! legal trajectory the robot backs up, then turns to face along the plan,
//! before trying again. Shortly after a recovery it only turns, see
//! [`crate::status`].
//!
//! Weights and sampling parameters can be changed from another thread through
//! a [`ReconfigureHandle`], changes are picked up at the start of the next
//! cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;


pub use params::LocalPlannerParams;
pub use state::{CycleInput, CycleReport};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;
use util::archive::Archiver;

use crate::cost::{
    score_trajectory, CostWeights, MapGridCostFunction, MapGridTarget, ObstacleCostFunction,
    TrajCostFunction,
};
use crate::loc::{Pose, Velocity};
use crate::map::{CostMap, GridCell, LETHAL_OBSTACLE};
use crate::path::{Path, PlanTracker};
use crate::plan::{
    BackupPlanner, CurvSamplingPlanner, DirAdjustPlanner, PlanInput, ScoredSamplingPlanner,
    TrajPlanner,
};
use crate::status::{RobotStatus, StatusMgr};
use crate::traj::{SamplingParams, TrajGenerator, Trajectory};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct LocalPlanner {
    params: LocalPlannerParams,

    generator: TrajGenerator,

    obstacle_costs: ObstacleCostFunction,
    path_costs: MapGridCostFunction,
    goal_costs: MapGridCostFunction,

    tracker: PlanTracker,
    status_mgr: StatusMgr,

    scored_planner: ScoredSamplingPlanner,
    curv_planner: CurvSamplingPlanner,
    backup_planner: BackupPlanner,
    dir_adjust_planner: DirAdjustPlanner,

    cost_map: Option<Arc<CostMap>>,

    /// Trajectory selected in the last cycle
    result_traj: Option<Trajectory>,

    /// End points of every trajectory explored in the last cycle
    traj_cloud: Option<Vec<TrajCloudPoint>>,

    config: Arc<Mutex<PlannerConfig>>,
    applied_revision: u64,

    report: CycleReport,
    arch_report: Archiver,
}

/// The parameters which can be changed while the planner is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicParams {
    pub weights: CostWeights,
    pub sampling: SamplingParams,
}

/// Handle used to reconfigure a planner from any thread.
#[derive(Clone)]
pub struct ReconfigureHandle {
    config: Arc<Mutex<PlannerConfig>>,
}

/// Costs of a single cost map cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCosts {
    pub path_cost: f64,
    pub goal_cost: f64,
    pub occ_cost: f64,

    /// Weighted sum of the individual costs
    pub total_cost: f64,

    /// False if the cell is lethal or unreachable from the plan
    pub traversable: bool,
}

/// The end of an explored trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajCloudPoint {
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,

    /// Trajectory cost, negative for illegal trajectories
    pub cost: f64,
}

#[derive(Debug)]
struct PlannerConfig {
    params: DynamicParams,

    /// Incremented on every reconfiguration
    revision: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LocalPlannerError {
    #[error("Invalid planner parameters: {0}")]
    InvalidParams(String),

    #[error("Attempted to set an empty plan")]
    EmptyPlan,

    #[error("No plan has been set")]
    NoPlan,

    #[error("No cost map has been set")]
    NoCostMap,

    #[error("The planner configuration lock is poisoned")]
    PoisonError,

    #[error("Could not load the planner parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Could not create the planner archive: {0}")]
    ArchiveError(#[from] util::archive::ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LocalPlanner {
    fn default() -> Self {
        Self::build(LocalPlannerParams::default())
    }
}

impl LocalPlanner {
    /// Create a new planner, checking the parameters.
    pub fn new(params: LocalPlannerParams) -> Result<Self, LocalPlannerError> {
        params.validate().map_err(LocalPlannerError::InvalidParams)?;

        Ok(Self::build(params))
    }

    fn build(params: LocalPlannerParams) -> Self {
        let p = &params;

        let generator = TrajGenerator::new(p.limits, p.sampling, p.sim_period_s);

        let obstacle_costs =
            ObstacleCostFunction::new(p.weights.occdist_scale, p.unknown_is_lethal);
        let path_costs = MapGridCostFunction::new(
            MapGridTarget::Path,
            p.weights.pdist_scale,
            p.unknown_is_lethal,
        );
        let goal_costs = MapGridCostFunction::new(
            MapGridTarget::LocalGoal,
            p.weights.gdist_scale,
            p.unknown_is_lethal,
        );

        let backup_planner = BackupPlanner::new(
            p.recovery.backup_vel_ms,
            p.sampling.sim_time_s,
            p.sampling.sim_granularity_m,
        );
        let dir_adjust_planner = DirAdjustPlanner::new(
            p.recovery.adjust_gain,
            p.recovery.adjust_rot_vel_rads,
            p.limits.min_rot_vel_rads,
            p.sampling.sim_time_s,
            p.sampling.angular_sim_granularity_rad,
        );

        let config = PlannerConfig {
            params: DynamicParams {
                weights: p.weights,
                sampling: p.sampling,
            },
            revision: 0,
        };

        Self {
            generator,
            obstacle_costs,
            path_costs,
            goal_costs,
            tracker: PlanTracker::new(p.nearest_search_window, p.forward_point_distance_m),
            status_mgr: StatusMgr::new(p.recovery),
            scored_planner: ScoredSamplingPlanner::new(&p.sampling),
            curv_planner: CurvSamplingPlanner::new(p.curv_sampling.clone()),
            backup_planner,
            dir_adjust_planner,
            cost_map: None,
            result_traj: None,
            traj_cloud: None,
            config: Arc::new(Mutex::new(config)),
            applied_revision: 0,
            report: CycleReport::default(),
            arch_report: Archiver::default(),
            params,
        }
    }

    /// The parameters currently in use.
    ///
    /// Reconfigured weights and sampling parameters appear here once a cycle
    /// has applied them.
    pub fn params(&self) -> &LocalPlannerParams {
        &self.params
    }

    /// Period of the control loop the planner expects to be run at.
    pub fn sim_period_s(&self) -> f64 {
        self.params.sim_period_s
    }

    pub fn status(&self) -> RobotStatus {
        self.status_mgr.status()
    }

    pub fn global_plan(&self) -> Option<&Path> {
        self.tracker.plan()
    }

    /// The trajectory selected in the last cycle.
    pub fn result_traj(&self) -> Option<&Trajectory> {
        self.result_traj.as_ref()
    }

    /// End points of the trajectories explored in the last cycle, if enabled.
    pub fn traj_cloud(&self) -> Option<&[TrajCloudPoint]> {
        self.traj_cloud.as_deref()
    }

    /// Report on the last cycle.
    pub fn report(&self) -> &CycleReport {
        &self.report
    }

    /// Get a handle which can reconfigure this planner from another thread.
    pub fn reconfigure_handle(&self) -> ReconfigureHandle {
        ReconfigureHandle {
            config: Arc::clone(&self.config),
        }
    }

    /// Replace the cost weights and sampling parameters.
    ///
    /// The new values are applied at the start of the next cycle.
    pub fn reconfigure(
        &self,
        weights: CostWeights,
        sampling: SamplingParams,
    ) -> Result<(), LocalPlannerError> {
        self.reconfigure_handle().reconfigure(weights, sampling)
    }

    /// Set the cost map used from the next cycle on.
    pub fn set_cost_map(&mut self, cost_map: Arc<CostMap>) {
        self.obstacle_costs.set_cost_map(Arc::clone(&cost_map));
        self.cost_map = Some(cost_map);
    }

    /// Replace the global plan.
    ///
    /// An empty plan is rejected and leaves the planner unchanged. Otherwise
    /// the status returns to `Normal` and the nearest point search restarts.
    pub fn set_plan(&mut self, plan: &[Pose]) -> Result<(), LocalPlannerError> {
        let path = Path::new(plan.to_vec()).map_err(|_| {
            warn!("Rejected an empty plan");
            LocalPlannerError::EmptyPlan
        })?;

        info!(
            "New plan with {} points ({:.2} m)",
            path.get_num_points(),
            path.get_length()
        );

        self.tracker.set_plan(path);
        self.status_mgr.reset();

        Ok(())
    }

    /// Rebuild the path and goal cost grids for the current pose.
    ///
    /// `plan` is the part of the global plan to follow, for instance the plan
    /// cropped to the local map. If it is empty the global plan is used. The
    /// local goal is taken along the global plan, `local_goal_distance_m` from
    /// the point nearest the robot.
    pub fn update_plan_and_local_costs(&mut self, pose: &Pose, plan: &[Pose]) {
        let cost_map = match self.cost_map {
            Some(ref m) => Arc::clone(m),
            None => {
                warn!("Cannot update the local costs without a cost map");
                return;
            }
        };

        self.tracker.set_pose(*pose);

        let mut goal_plan = self.tracker.shortened_plan(self.params.local_goal_distance_m);
        if goal_plan.is_empty() {
            goal_plan = plan.to_vec();
        }

        let path_plan: &[Pose] = if plan.is_empty() {
            self.tracker.plan().map(|p| p.poses()).unwrap_or(&[])
        } else {
            plan
        };

        if path_plan.is_empty() {
            warn!("No plan to build the local costs from");
        }

        self.path_costs.set_target_poses(&cost_map, path_plan);
        self.goal_costs.set_target_poses(&cost_map, &goal_plan);

        debug!(
            "Local costs updated, local goal {:?}",
            goal_plan.last().map(|p| p.position_m)
        );
    }

    /// Select the trajectory to follow in this cycle.
    ///
    /// # Inputs
    /// - `pose`: Current pose of the robot
    /// - `vel`: Current velocity of the robot
    /// - `footprint_m`: Outline of the robot in the body frame, may be empty
    /// - `time_s`: Current time, used for stuck detection and recovery
    ///
    /// # Outputs
    /// - The selected trajectory, which is always legal
    /// - An error if there is no plan or no cost map
    pub fn find_best_path(
        &mut self,
        pose: &Pose,
        vel: &Velocity,
        footprint_m: &[Vector2<f64>],
        time_s: f64,
    ) -> Result<Trajectory, LocalPlannerError> {
        // Hold the configuration for the whole cycle
        let config = Arc::clone(&self.config);
        let config = config.lock()?;
        self.apply_config(&config);

        if self.tracker.plan().is_none() {
            return Err(LocalPlannerError::NoPlan);
        }
        if self.cost_map.is_none() {
            return Err(LocalPlannerError::NoCostMap);
        }

        self.obstacle_costs.set_footprint(footprint_m);
        self.generator.init(pose, vel);
        self.tracker.set_pose(*pose);

        let direction_error_rad = self.tracker.direction_error();
        let progress_m = self.tracker.progress_m();
        let prev_status = self.status_mgr.status();
        let mut status = self.status_mgr.update(progress_m, time_s, direction_error_rad);

        let mut explored = if self.params.publish_traj_cloud {
            Some(Vec::new())
        } else {
            None
        };

        let (traj, planner) = match status {
            RobotStatus::Normal => match self.run_samplers(pose, vel, explored.as_mut()) {
                Some(found) => found,
                None => {
                    status = self.status_mgr.force_backup(time_s);
                    self.run_recovery(status, pose, vel, explored.as_mut())
                }
            },
            _ => self.run_recovery(status, pose, vel, explored.as_mut()),
        };

        drop(config);

        if status != prev_status {
            info!("Status changed from {:?} to {:?}", prev_status, status);
        }

        debug!(
            "Selected {:?} from the {} planner, cost {:.3}",
            traj.vel,
            planner,
            traj.cost().as_f64()
        );

        self.traj_cloud = explored.map(|e| e.iter().filter_map(TrajCloudPoint::from_traj).collect());

        self.report = CycleReport {
            time_s,
            status,
            planner,
            cmd_vx_ms: traj.vel.linear_ms[0],
            cmd_vy_ms: traj.vel.linear_ms[1],
            cmd_angular_rads: traj.vel.angular_rads,
            cost: traj.cost().as_f64(),
            direction_error_rad,
            num_explored: self.traj_cloud.as_ref().map(|c| c.len()),
        };
        self.result_traj = Some(traj.clone());

        Ok(traj)
    }

    /// Get the path, goal, and obstacle costs of a single cell.
    ///
    /// Returns `None` if there is no cost map or the cell is outside it.
    pub fn get_cell_costs(&self, cx: usize, cy: usize) -> Option<CellCosts> {
        let cost_map = self.cost_map.as_ref()?;
        let occ = cost_map.get(cx, cy)?;

        let path_grid = self.path_costs.grid();
        let goal_grid = self.goal_costs.grid();
        let path_cell = path_grid.get(cx, cy).unwrap_or(GridCell::Unreachable);
        let goal_cell = goal_grid.get(cx, cy).unwrap_or(GridCell::Unreachable);

        let path_cost = path_grid.cell_cost(path_cell);
        let goal_cost = goal_grid.cell_cost(goal_cell);
        let occ_cost = occ as f64;

        let w = &self.params.weights;

        Some(CellCosts {
            path_cost,
            goal_cost,
            occ_cost,
            total_cost: w.pdist_scale * path_cost + w.gdist_scale * goal_cost + w.occdist_scale * occ_cost,
            traversable: matches!(path_cell, GridCell::Dist(_)) && occ < LETHAL_OBSTACLE,
        })
    }

    /// Check whether a velocity sample gives a legal trajectory from the given state.
    ///
    /// Samples outside the velocity limits are never legal.
    pub fn check_trajectory(&mut self, pose: &Pose, vel: &Velocity, vel_sample: &Velocity) -> bool {
        match Arc::clone(&self.config).lock() {
            Ok(config) => self.apply_config(&config),
            Err(_) => warn!("Configuration lock poisoned, checking with the last applied parameters"),
        }

        self.generator.init(pose, vel);

        let traj = match self.generator.generate(vel_sample) {
            Some(t) => t,
            None => return false,
        };

        let critics: [&dyn TrajCostFunction; 3] =
            [&self.path_costs, &self.goal_costs, &self.obstacle_costs];

        let cost = score_trajectory(&critics, &traj);
        debug!("Checked {:?}: {:?}", vel_sample, cost);

        cost.is_legal()
    }

    /// Run the sampling planners in order of preference.
    fn run_samplers(
        &mut self,
        pose: &Pose,
        vel: &Velocity,
        mut explored: Option<&mut Vec<Trajectory>>,
    ) -> Option<(Trajectory, &'static str)> {
        let lookahead_m = self
            .tracker
            .lookahead_point(self.curv_planner.params().lookahead_dist_m);

        // Cheapest first, scoring stops at the first illegal cost
        let critics: [&dyn TrajCostFunction; 3] =
            [&self.path_costs, &self.goal_costs, &self.obstacle_costs];

        let input = PlanInput {
            pose: *pose,
            vel: *vel,
            generator: &self.generator,
            critics: &critics,
            lookahead_m,
        };

        let order: [&dyn TrajPlanner; 2] = if self.generator.sampling().prefer_secondary {
            [&self.curv_planner, &self.scored_planner]
        } else {
            [&self.scored_planner, &self.curv_planner]
        };

        for planner in order.iter() {
            match planner.find_best(&input, explored.as_mut().map(|e| &mut **e)) {
                Some(traj) => return Some((traj, planner.name())),
                None => warn!("No legal trajectory from the {} planner", planner.name()),
            }
        }

        None
    }

    /// Run the recovery planner for the given status.
    ///
    /// Recovery manoeuvres bypass the cost functions and are always legal.
    fn run_recovery(
        &mut self,
        status: RobotStatus,
        pose: &Pose,
        vel: &Velocity,
        explored: Option<&mut Vec<Trajectory>>,
    ) -> (Trajectory, &'static str) {
        if status == RobotStatus::DirectionAdjusting {
            let target = self.tracker.nearest_direction();
            self.dir_adjust_planner.set_target_heading(target);
        }

        let input = PlanInput {
            pose: *pose,
            vel: *vel,
            generator: &self.generator,
            critics: &[],
            lookahead_m: None,
        };

        let planner: &dyn TrajPlanner = match status {
            RobotStatus::DirectionAdjusting => &self.dir_adjust_planner,
            _ => &self.backup_planner,
        };

        match planner.find_best(&input, explored) {
            Some(traj) => (traj, planner.name()),
            None => (self.backup_planner.generate(pose, vel), self.backup_planner.name()),
        }
    }

    /// Apply any reconfiguration made since the last cycle.
    fn apply_config(&mut self, config: &PlannerConfig) {
        if config.revision == self.applied_revision {
            return;
        }

        let DynamicParams { weights, sampling } = config.params;

        self.path_costs.set_scale(weights.pdist_scale);
        self.goal_costs.set_scale(weights.gdist_scale);
        self.obstacle_costs.set_scale(weights.occdist_scale);

        self.generator.set_sampling(sampling);
        self.scored_planner.set_params(&sampling);
        self.backup_planner.set_sim(sampling.sim_time_s, sampling.sim_granularity_m);
        self.dir_adjust_planner
            .set_sim(sampling.sim_time_s, sampling.angular_sim_granularity_rad);

        self.params.weights = weights;
        self.params.sampling = sampling;
        self.applied_revision = config.revision;

        info!("Applied planner reconfiguration {}", config.revision);
    }
}

impl ReconfigureHandle {
    /// Replace the cost weights and sampling parameters.
    ///
    /// Invalid values are rejected and leave the current configuration in place.
    pub fn reconfigure(
        &self,
        weights: CostWeights,
        sampling: SamplingParams,
    ) -> Result<(), LocalPlannerError> {
        weights.validate().map_err(LocalPlannerError::InvalidParams)?;
        sampling.validate().map_err(LocalPlannerError::InvalidParams)?;

        let mut config = self.config.lock()?;
        config.params = DynamicParams { weights, sampling };
        config.revision += 1;

        debug!("Reconfiguration {} queued", config.revision);

        Ok(())
    }
}

impl TrajCloudPoint {
    fn from_traj(traj: &Trajectory) -> Option<Self> {
        traj.end().map(|end| Self {
            x_m: end.position_m[0],
            y_m: end.position_m[1],
            heading_rad: end.heading_rad,
            cost: traj.cost().as_f64(),
        })
    }
}

impl<T> From<PoisonError<T>> for LocalPlannerError {
    fn from(_: PoisonError<T>) -> Self {
        LocalPlannerError::PoisonError
    }
}
