//! Local planner executable entry point.
//!
//! # Architecture
//!
//! The executable drives the local planner around a simulated obstacle field:
//!
//!     - Initialise the session, logging, and the planner
//!     - Generate the world and a direct global plan to the goal
//!     - Main loop:
//!         - Local planner processing
//!         - Simulation step with the selected command
//!     - Save the executed path into the session directory

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::File,
    thread,
    time::{Duration, Instant},
};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};

use lp_lib::{
    loc::Pose,
    local_planner::{CycleInput, LocalPlanner},
    params::LpExecParams,
    path::Path,
    sim::SimWorld,
    status::RobotStatus,
};
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the executed path file in the session directory
const EXECUTED_PATH_FILE: &str = "executed_path.json";

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("lp_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Local Planner Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: LpExecParams =
        util::params::load("lp_exec.toml").wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- MODULE INIT ----

    let mut local_planner = LocalPlanner::default();
    local_planner
        .init("local_planner.toml", &session)
        .wrap_err("Failed to initialise the local planner")?;
    info!("LocalPlanner init complete");

    let start = Pose {
        position_m: params.start_position_m,
        heading_rad: params.start_heading_rad,
    };

    let mut world = SimWorld::generate(&params.sim, start, params.goal_position_m)
        .wrap_err("Failed to generate the simulated world")?;

    let plan = Path::direct(
        params.start_position_m,
        params.goal_position_m,
        params.plan_separation_m,
    )
    .wrap_err("Failed to build the global plan")?;

    local_planner
        .set_plan(plan.poses())
        .wrap_err("Failed to set the global plan")?;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let period_s = local_planner.sim_period_s();
    let mut executed = vec![world.pose()];
    let mut cost_map = Some(world.cost_map());
    let mut time_s = 0.0;
    let mut reached = false;

    while time_s < params.max_run_time_s {
        let cycle_start_instant = Instant::now();

        // ---- PLANNING ----

        let input = CycleInput {
            time_s,
            pose: world.pose(),
            vel: world.vel(),
            footprint_m: params.footprint_m.clone(),
            local_plan: Vec::new(),
            // The world is static, so the map is only given on the first cycle
            cost_map: cost_map.take(),
        };

        let (traj, report) = local_planner
            .proc(&input)
            .wrap_err("Error processing the local planner")?;

        debug!(
            "t = {:.2}: {:?} via {}, cmd {:?}",
            time_s, report.status, report.planner, traj.vel
        );

        // ---- SIMULATION ----

        world.step(&traj.vel, period_s);
        executed.push(world.pose());

        if world.in_collision() {
            warn!("Collision at t = {:.2} s", time_s);
        }

        let dist_to_goal = (params.goal_position_m - world.pose().position_m).norm();
        if dist_to_goal < params.goal_tolerance_m && report.status == RobotStatus::Normal {
            reached = true;
            break;
        }

        time_s += period_s;

        // ---- CYCLE MANAGEMENT ----

        if params.real_time {
            let cycle_dur = Instant::now() - cycle_start_instant;
            match Duration::from_secs_f64(period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - period_s
                ),
            }
        }
    }

    // ---- SHUTDOWN ----

    let path_file = session.session_root.join(EXECUTED_PATH_FILE);
    let file = File::create(&path_file).wrap_err("Could not create the executed path file")?;
    serde_json::to_writer_pretty(file, &executed).wrap_err("Could not write the executed path")?;
    info!("Executed path saved to {:?}", path_file);

    if reached {
        info!("Goal reached after {:.2} s", time_s);
        Ok(())
    } else {
        Err(eyre!(
            "Goal not reached within {:.2} s, stopped at {:?}",
            params.max_run_time_s,
            world.pose().position_m
        ))
    }
}
