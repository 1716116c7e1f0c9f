//! Local planner module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use log::warn;
use nalgebra::Vector2;
use serde::Serialize;
use util::{archive::Archiver, module::State, params, session::Session};

use super::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Path of the cycle report archive, relative to the session archive root.
const REPORT_ARCHIVE_PATH: &str = "local_planner/cycle_report.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Input data for one planning cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleInput {
    pub time_s: f64,

    pub pose: Pose,

    pub vel: Velocity,

    /// Outline of the robot in the body frame
    pub footprint_m: Vec<Vector2<f64>>,

    /// Part of the global plan to follow, if empty the global plan is used
    pub local_plan: Vec<Pose>,

    /// New cost map, if one is available this cycle
    pub cost_map: Option<Arc<CostMap>>,
}

/// Summary of one planning cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub time_s: f64,

    pub status: RobotStatus,

    /// Name of the planner which produced the trajectory
    pub planner: &'static str,

    pub cmd_vx_ms: f64,
    pub cmd_vy_ms: f64,
    pub cmd_angular_rads: f64,

    /// Cost of the selected trajectory, always zero for recovery manoeuvres
    pub cost: f64,

    /// Heading error to the plan direction
    pub direction_error_rad: Option<f64>,

    /// Number of explored trajectories, if they are being kept
    pub num_explored: Option<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LocalPlanner {
    type InitData = &'static str;
    type InitError = LocalPlannerError;

    type InputData = CycleInput;
    type OutputData = Trajectory;
    type StatusReport = CycleReport;
    type ProcError = LocalPlannerError;

    /// Initialise the planner.
    ///
    /// Expected init data is a path to the parameter file. Any plan or cost
    /// map already set is discarded.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session,
    ) -> Result<(), Self::InitError> {
        let params: LocalPlannerParams = params::load(init_data)?;

        *self = LocalPlanner::new(params)?;
        self.arch_report = Archiver::from_path(session, REPORT_ARCHIVE_PATH)?;

        Ok(())
    }

    /// Run one planning cycle.
    ///
    /// Processing involves:
    ///  1. Taking the new cost map if there is one
    ///  1. Rebuilding the path and goal costs around the current pose
    ///  1. Selecting the trajectory to follow
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if let Some(ref map) = input_data.cost_map {
            self.set_cost_map(Arc::clone(map));
        }

        self.update_plan_and_local_costs(&input_data.pose, &input_data.local_plan);

        let traj = self.find_best_path(
            &input_data.pose,
            &input_data.vel,
            &input_data.footprint_m,
            input_data.time_s,
        )?;

        if self.arch_report.is_init() {
            if let Err(e) = self.arch_report.serialise(&self.report) {
                warn!("Could not archive the cycle report: {}", e);
            }
        }

        Ok((traj, self.report.clone()))
    }
}
