//! # Robot status manager
//!
//! Detects when the robot has stopped making progress along the plan and
//! drives the recovery sequence:
//!
//! ```text
//!            stuck for stuck_timeout_s
//!   Normal ----------------------------> BackingUp
//!     ^                                      |
//!     |  heading aligned, no plan            | backup_time_s elapsed
//!     |  or max_adjust_time_s elapsed        v
//!     +------------------------------ DirectionAdjusting
//! ```
//!
//! Progress is the length of the plan up to the point nearest the robot, so
//! moving backwards or oscillating about one place never counts.
//!
//! The latch is set on entering `BackingUp` and held after the return to
//! `Normal` until the robot makes progress or `latch_time_s` passes. While it
//! is held the robot cannot back up again, escalation turns it towards the
//! plan instead.
//!
//! A new plan returns the manager to `Normal` immediately.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

pub use params::RecoveryParams;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatusMgr {
    params: RecoveryParams,

    status: RobotStatus,

    /// Furthest progress along the plan and the time it was reached
    progress_anchor: Option<ProgressAnchor>,

    backup_start_time_s: f64,
    adjust_start_time_s: f64,

    /// Set on entering `BackingUp`, see the module docs for its release.
    latch: bool,

    /// Time after which a held latch is released, set on the first return to
    /// `Normal` after backing up
    latch_expiry_s: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct ProgressAnchor {
    progress_m: Option<f64>,
    time_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RobotStatus {
    /// Following the plan with the sampling planners
    Normal,

    /// Reversing away from whatever stopped the robot
    BackingUp,

    /// Turning in place to face along the plan
    DirectionAdjusting,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RobotStatus {
    fn default() -> Self {
        RobotStatus::Normal
    }
}

impl StatusMgr {
    pub fn new(params: RecoveryParams) -> Self {
        Self {
            params,
            status: RobotStatus::Normal,
            progress_anchor: None,
            backup_start_time_s: 0.0,
            adjust_start_time_s: 0.0,
            latch: false,
            latch_expiry_s: None,
        }
    }

    pub fn status(&self) -> RobotStatus {
        self.status
    }

    pub fn is_latched(&self) -> bool {
        self.latch
    }

    /// Return to `Normal` and forget all progress history.
    pub fn reset(&mut self) {
        if self.status != RobotStatus::Normal {
            info!("Status reset from {:?} to Normal", self.status);
        }

        self.status = RobotStatus::Normal;
        self.progress_anchor = None;
        self.release_latch();
    }

    /// Update the status for this cycle.
    ///
    /// # Inputs
    /// - `progress_m`: Distance along the plan to the point nearest the robot, if there is a plan
    /// - `time_s`: Current time
    /// - `direction_error_rad`: Heading error from the robot to the plan, if there is a plan
    pub fn update(
        &mut self,
        progress_m: Option<f64>,
        time_s: f64,
        direction_error_rad: Option<f64>,
    ) -> RobotStatus {
        if self.latch_expiry_s.map_or(false, |e| time_s > e) {
            debug!("Latch expired");
            self.release_latch();
        }

        match self.status {
            RobotStatus::Normal => self.update_normal(progress_m, time_s),
            RobotStatus::BackingUp => {
                if time_s - self.backup_start_time_s > self.params.backup_time_s {
                    info!("Backup complete, adjusting direction");
                    self.status = RobotStatus::DirectionAdjusting;
                    self.adjust_start_time_s = time_s;
                }
            }
            RobotStatus::DirectionAdjusting => {
                let aligned = direction_error_rad
                    .map_or(true, |e| e.abs() < self.params.adjust_tolerance_rad);
                let timed_out = time_s - self.adjust_start_time_s > self.params.max_adjust_time_s;

                if aligned || timed_out {
                    if timed_out && !aligned {
                        warn!("Direction adjustment timed out, resuming");
                    } else {
                        info!("Direction adjusted, resuming");
                    }

                    self.status = RobotStatus::Normal;
                    self.progress_anchor = Some(ProgressAnchor { progress_m, time_s });

                    if self.latch && self.latch_expiry_s.is_none() {
                        self.latch_expiry_s = Some(time_s + self.params.latch_time_s);
                    }
                }
            }
        }

        self.status
    }

    /// Escalate when no legal trajectory can be found.
    ///
    /// Backs up, or while the latch is held turns towards the plan instead.
    /// Only has an effect in `Normal`.
    pub fn force_backup(&mut self, time_s: f64) -> RobotStatus {
        if self.status != RobotStatus::Normal {
            debug!("Escalation requested while in {:?}, ignoring", self.status);
        } else if self.latch {
            warn!("No legal trajectory but recently backed up, adjusting direction");
            self.status = RobotStatus::DirectionAdjusting;
            self.adjust_start_time_s = time_s;
        } else {
            warn!("No legal trajectory, backing up");
            self.enter_backup(time_s);
        }

        self.status
    }

    fn update_normal(&mut self, progress_m: Option<f64>, time_s: f64) {
        let anchor = *self
            .progress_anchor
            .get_or_insert(ProgressAnchor { progress_m, time_s });

        let advanced = match (anchor.progress_m, progress_m) {
            (Some(a), Some(p)) => p - a >= self.params.progress_dist_m,
            (None, Some(_)) => true,
            _ => false,
        };

        if advanced {
            self.progress_anchor = Some(ProgressAnchor { progress_m, time_s });

            if self.latch {
                debug!("Progress made, latch released");
                self.release_latch();
            }
            return;
        }

        if self.latch {
            return;
        }

        if time_s - anchor.time_s > self.params.stuck_timeout_s {
            warn!(
                "No progress for {:.2} s, backing up",
                time_s - anchor.time_s
            );
            self.enter_backup(time_s);
        }
    }

    fn enter_backup(&mut self, time_s: f64) {
        self.status = RobotStatus::BackingUp;
        self.backup_start_time_s = time_s;
        self.latch = true;
        self.latch_expiry_s = None;
    }

    fn release_latch(&mut self) {
        self.latch = false;
        self.latch_expiry_s = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mgr() -> StatusMgr {
        StatusMgr::new(RecoveryParams {
            stuck_timeout_s: 2.0,
            progress_dist_m: 0.1,
            backup_time_s: 1.0,
            max_adjust_time_s: 3.0,
            adjust_tolerance_rad: 0.1,
            latch_time_s: 1.5,
            ..Default::default()
        })
    }

    #[test]
    fn test_progress_keeps_normal() {
        let mut m = mgr();

        for i in 0..100 {
            let t = i as f64 * 0.1;
            assert_eq!(m.update(Some(t * 0.5), t, Some(0.0)), RobotStatus::Normal);
        }
    }

    #[test]
    fn test_oscillation_is_stuck() {
        let mut m = mgr();

        // Swinging back and forth further than the progress distance only
        // counts the first forward swing
        let mut stuck_at = None;
        for i in 0..100 {
            let t = i as f64 * 0.5;
            let progress = if i % 2 == 0 { 0.0 } else { 0.15 };
            if m.update(Some(progress), t, Some(0.0)) != RobotStatus::Normal {
                stuck_at = Some(t);
                break;
            }
        }

        // Anchored at 0.15 m at t = 0.5
        assert_eq!(stuck_at, Some(3.0));
    }

    #[test]
    fn test_backwards_is_stuck() {
        let mut m = mgr();

        for i in 0..20 {
            let t = i as f64 * 0.1;
            assert_eq!(m.update(Some(1.0 - t), t, Some(0.0)), RobotStatus::Normal);
        }
        assert_eq!(m.update(Some(-1.0), 2.1, Some(0.0)), RobotStatus::BackingUp);
    }

    #[test]
    fn test_full_recovery() {
        let mut m = mgr();

        assert_eq!(m.update(Some(0.0), 0.0, Some(0.5)), RobotStatus::Normal);
        assert_eq!(m.update(Some(0.0), 2.0, Some(0.5)), RobotStatus::Normal);
        assert_eq!(m.update(Some(0.0), 2.1, Some(0.5)), RobotStatus::BackingUp);
        assert!(m.is_latched());

        // Progress while backing up is ignored
        assert_eq!(m.update(Some(0.5), 2.5, Some(0.5)), RobotStatus::BackingUp);
        assert_eq!(m.update(Some(0.5), 3.2, Some(0.5)), RobotStatus::DirectionAdjusting);
        assert!(m.is_latched());

        // Not yet aligned
        assert_eq!(m.update(Some(0.5), 3.5, Some(0.5)), RobotStatus::DirectionAdjusting);

        // Aligned, the latch is held after the return to normal
        assert_eq!(m.update(Some(0.5), 4.0, Some(0.05)), RobotStatus::Normal);
        assert!(m.is_latched());

        // Until the robot moves on along the plan
        assert_eq!(m.update(Some(0.55), 4.5, Some(0.0)), RobotStatus::Normal);
        assert!(m.is_latched());
        assert_eq!(m.update(Some(0.65), 4.6, Some(0.0)), RobotStatus::Normal);
        assert!(!m.is_latched());

        // The stuck timer restarts from that progress
        assert_eq!(m.update(Some(0.65), 6.6, Some(0.0)), RobotStatus::Normal);
        assert_eq!(m.update(Some(0.65), 6.7, Some(0.0)), RobotStatus::BackingUp);
    }

    #[test]
    fn test_latch_blocks_backup() {
        let mut m = mgr();

        assert_eq!(m.force_backup(0.0), RobotStatus::BackingUp);
        assert_eq!(m.update(Some(0.0), 1.1, Some(0.0)), RobotStatus::DirectionAdjusting);
        assert_eq!(m.update(Some(0.0), 1.2, Some(0.0)), RobotStatus::Normal);
        assert!(m.is_latched());

        // Escalating again turns instead of reversing
        assert_eq!(m.force_backup(1.2), RobotStatus::DirectionAdjusting);
        assert_eq!(m.update(Some(0.0), 1.3, Some(0.0)), RobotStatus::Normal);
        assert_eq!(m.force_backup(1.3), RobotStatus::DirectionAdjusting);

        // Repeated returns to normal do not extend the latch
        assert_eq!(m.update(Some(0.0), 2.6, Some(0.0)), RobotStatus::Normal);
        assert!(m.is_latched());
        assert_eq!(m.force_backup(2.6), RobotStatus::DirectionAdjusting);
        assert_eq!(m.update(Some(0.0), 2.8, Some(0.0)), RobotStatus::Normal);
        assert!(!m.is_latched());
        assert_eq!(m.force_backup(2.8), RobotStatus::BackingUp);
    }

    #[test]
    fn test_latch_suspends_stuck_timer() {
        let mut m = StatusMgr::new(RecoveryParams {
            stuck_timeout_s: 1.0,
            backup_time_s: 1.0,
            latch_time_s: 3.0,
            ..Default::default()
        });

        m.force_backup(0.0);
        m.update(Some(0.0), 1.1, None);
        assert_eq!(m.update(Some(0.0), 1.2, None), RobotStatus::Normal);

        // No progress, but no backup until the latch expires at 4.2
        assert_eq!(m.update(Some(0.0), 2.5, None), RobotStatus::Normal);
        assert_eq!(m.update(Some(0.0), 4.0, None), RobotStatus::Normal);
        assert!(m.is_latched());
        assert_eq!(m.update(Some(0.0), 4.3, None), RobotStatus::BackingUp);
    }

    #[test]
    fn test_adjust_timeout() {
        let mut m = mgr();

        m.update(None, 0.0, None);
        m.force_backup(0.0);
        assert_eq!(m.update(None, 1.1, Some(1.0)), RobotStatus::DirectionAdjusting);
        assert_eq!(m.update(None, 4.0, Some(1.0)), RobotStatus::DirectionAdjusting);
        assert_eq!(m.update(None, 4.2, Some(1.0)), RobotStatus::Normal);
    }

    #[test]
    fn test_no_plan_ends_adjust() {
        let mut m = mgr();

        m.force_backup(0.0);
        assert_eq!(m.update(None, 1.5, None), RobotStatus::DirectionAdjusting);
        assert_eq!(m.update(None, 1.6, None), RobotStatus::Normal);
    }

    #[test]
    fn test_force_backup_while_backing_up() {
        let mut m = mgr();

        assert_eq!(m.force_backup(1.0), RobotStatus::BackingUp);
        // A second request does not restart the backup timer
        assert_eq!(m.force_backup(1.9), RobotStatus::BackingUp);
        assert_eq!(m.update(None, 2.05, None), RobotStatus::DirectionAdjusting);
    }

    #[test]
    fn test_reset() {
        let mut m = mgr();

        m.force_backup(0.0);
        m.reset();
        assert_eq!(m.status(), RobotStatus::Normal);
        assert!(!m.is_latched());

        // Progress history is cleared so the next update only sets the anchor
        assert_eq!(m.update(Some(0.0), 100.0, None), RobotStatus::Normal);
    }

    #[test]
    fn test_backup_bounded() {
        // Whatever the progress, backing up never outlasts the backup time
        let mut m = mgr();
        m.force_backup(0.0);

        let mut t = 0.0;
        while m.status() == RobotStatus::BackingUp {
            t += 0.1;
            m.update(Some(t), t, Some(0.0));
            assert!(t <= 1.0 + 0.1 + 1e-9);
        }
        assert_eq!(m.status(), RobotStatus::DirectionAdjusting);
    }
}
