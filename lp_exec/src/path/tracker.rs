//! # Plan tracker
//!
//! Locates the robot along the global plan. The nearest plan index is cached
//! between cycles and later searches are restricted to a window around it,
//! which keeps the search cheap and stops the robot snapping to a distant
//! part of a self-crossing plan.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use util::maths::get_direction_error;

use super::{path_length, shorten, Path};
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The last nearest index found on a plan.
#[derive(Debug, Clone, Copy)]
pub struct NearestIndexCache {
    index: usize,
    valid: bool,

    /// Number of points either side of the cached index which are searched
    window: usize,
}

/// Tracks the robot's position along a plan.
#[derive(Debug, Clone)]
pub struct PlanTracker {
    plan: Option<Path>,
    pose: Option<Pose>,
    cache: NearestIndexCache,

    /// Distance along the plan ahead of the nearest point used to measure the
    /// plan's direction.
    forward_point_dist_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NearestIndexCache {
    pub fn new(window: usize) -> Self {
        Self {
            index: 0,
            valid: false,
            window,
        }
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The cached index, if valid.
    pub fn index(&self) -> Option<usize> {
        if self.valid {
            Some(self.index)
        } else {
            None
        }
    }
}

impl PlanTracker {
    pub fn new(search_window: usize, forward_point_dist_m: f64) -> Self {
        Self {
            plan: None,
            pose: None,
            cache: NearestIndexCache::new(search_window),
            forward_point_dist_m,
        }
    }

    /// Replace the tracked plan. The nearest index cache is invalidated.
    pub fn set_plan(&mut self, plan: Path) {
        self.plan = Some(plan);
        self.cache.invalidate();
    }

    pub fn plan(&self) -> Option<&Path> {
        self.plan.as_ref()
    }

    /// Set the robot's current pose.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = Some(pose);
    }

    pub fn cache(&self) -> &NearestIndexCache {
        &self.cache
    }

    /// Index of the plan point nearest the current pose.
    pub fn nearest_index(&mut self) -> Option<usize> {
        let pose = self.pose?;
        let plan = self.plan.as_ref()?;

        nearest_index(&pose, plan.poses(), &mut self.cache)
    }

    /// Length of the plan from its start to the nearest point.
    ///
    /// Only grows while the robot moves forward along the plan, moving
    /// sideways or backwards does not increase it.
    pub fn progress_m(&mut self) -> Option<f64> {
        let idx = self.nearest_index()?;
        let poses = self.plan.as_ref()?.poses();

        Some(path_length(&poses[..=idx]))
    }

    /// The part of the plan starting at the nearest point whose length does
    /// not exceed `distance_m`.
    pub fn shortened_plan(&mut self, distance_m: f64) -> Vec<Pose> {
        let idx = match self.nearest_index() {
            Some(i) => i,
            None => return Vec::new(),
        };

        match self.plan {
            Some(ref p) => shorten(&p.poses()[idx..], distance_m).to_vec(),
            None => Vec::new(),
        }
    }

    /// The first plan point at least `distance_m` along the plan from the
    /// nearest point, or the final point if the plan is shorter than that.
    pub fn lookahead_point(&mut self, distance_m: f64) -> Option<Vector2<f64>> {
        let idx = self.nearest_index()?;
        let poses = self.plan.as_ref()?.poses();

        let mut length_m = 0.0;
        for i in (idx + 1)..poses.len() {
            length_m += poses[i - 1].distance(&poses[i]);
            if length_m >= distance_m {
                return Some(poses[i].position_m);
            }
        }

        poses.last().map(|p| p.position_m)
    }

    /// Heading of the plan at the nearest point.
    ///
    /// Measured from the nearest point towards the plan point one forward
    /// point distance ahead of it. Near the end of the plan this is the
    /// heading of the final segment, and for single point plans the heading of
    /// the point itself.
    pub fn nearest_direction(&mut self) -> Option<f64> {
        let idx = self.nearest_index()?;
        let plan = self.plan.as_ref()?;
        let poses = plan.poses();

        if poses.len() == 1 {
            return Some(poses[0].heading_rad);
        }

        let start = poses[idx].position_m;
        let mut length_m = 0.0;
        for i in (idx + 1)..poses.len() {
            length_m += poses[i - 1].distance(&poses[i]);
            if length_m >= self.forward_point_dist_m {
                let d = poses[i].position_m - start;
                return Some(d[1].atan2(d[0]));
            }
        }

        plan.get_segment_heading(poses.len() - 1)
    }

    /// The robot's heading.
    pub fn robot_direction(&self) -> Option<f64> {
        self.pose.map(|p| p.heading_rad)
    }

    /// Signed heading error from the robot to the plan direction, in (-pi, pi].
    pub fn direction_error(&mut self) -> Option<f64> {
        let target = self.nearest_direction()?;
        let base = self.robot_direction()?;

        Some(get_direction_error(base, target))
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the index of the plan point closest to `pose`.
///
/// Ties go to the smallest index. With a valid cache only the window around
/// the cached index is searched, otherwise the whole plan is scanned and the
/// cache becomes valid.
pub fn nearest_index(
    pose: &Pose,
    plan: &[Pose],
    cache: &mut NearestIndexCache,
) -> Option<usize> {
    if plan.is_empty() {
        return None;
    }

    let (lo, hi) = if cache.valid && cache.index < plan.len() {
        (
            cache.index.saturating_sub(cache.window),
            (cache.index + cache.window).min(plan.len() - 1),
        )
    } else {
        (0, plan.len() - 1)
    };

    let mut best_idx = lo;
    let mut best_sq_dist = std::f64::INFINITY;
    for (i, p) in plan.iter().enumerate().take(hi + 1).skip(lo) {
        let sq_dist = pose.sq_distance(p);
        if sq_dist < best_sq_dist {
            best_sq_dist = sq_dist;
            best_idx = i;
        }
    }

    cache.index = best_idx;
    cache.valid = true;

    Some(best_idx)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn straight(n: usize) -> Path {
        Path::new((0..n).map(|i| Pose::new(i as f64, 0.0, 0.0)).collect()).unwrap()
    }

    #[test]
    fn test_nearest_index_ties() {
        let plan = vec![
            Pose::new(0.0, 1.0, 0.0),
            Pose::new(0.0, -1.0, 0.0),
            Pose::new(0.0, 1.0, 0.0),
        ];
        let mut cache = NearestIndexCache::new(5);

        assert_eq!(nearest_index(&Pose::default(), &plan, &mut cache), Some(0));
        assert!(cache.is_valid());
    }

    #[test]
    fn test_nearest_index_idempotent() {
        let plan = straight(50);
        let mut cache = NearestIndexCache::new(3);
        let pose = Pose::new(20.2, 0.5, 0.0);

        let first = nearest_index(&pose, plan.poses(), &mut cache);
        let second = nearest_index(&pose, plan.poses(), &mut cache);

        assert_eq!(first, Some(20));
        assert_eq!(first, second);
    }

    #[test]
    fn test_nearest_index_window() {
        let plan = straight(50);
        let mut cache = NearestIndexCache::new(3);

        assert_eq!(nearest_index(&Pose::new(10.0, 0.0, 0.0), plan.poses(), &mut cache), Some(10));

        // A jump far along the plan is limited to the window
        assert_eq!(nearest_index(&Pose::new(40.0, 0.0, 0.0), plan.poses(), &mut cache), Some(13));

        // Until the cache is invalidated
        cache.invalidate();
        assert_eq!(nearest_index(&Pose::new(40.0, 0.0, 0.0), plan.poses(), &mut cache), Some(40));
    }

    #[test]
    fn test_nearest_index_empty() {
        let mut cache = NearestIndexCache::new(3);
        assert_eq!(nearest_index(&Pose::default(), &[], &mut cache), None);
        assert!(!cache.is_valid());
    }

    #[test]
    fn test_set_plan_invalidates() {
        let mut tracker = PlanTracker::new(3, 0.5);
        tracker.set_plan(straight(10));
        tracker.set_pose(Pose::new(4.0, 0.0, 0.0));

        assert_eq!(tracker.nearest_index(), Some(4));
        assert!(tracker.cache().is_valid());

        tracker.set_plan(straight(10));
        assert!(!tracker.cache().is_valid());
    }

    #[test]
    fn test_shortened_plan() {
        let mut tracker = PlanTracker::new(3, 0.5);
        tracker.set_plan(straight(10));
        tracker.set_pose(Pose::new(2.1, 0.3, 0.0));

        let short = tracker.shortened_plan(3.0);
        assert_eq!(short.len(), 4);
        assert_eq!(short[0].position_m, Vector2::new(2.0, 0.0));
        assert_eq!(short[3].position_m, Vector2::new(5.0, 0.0));

        assert!(PlanTracker::new(3, 0.5).shortened_plan(3.0).is_empty());
    }

    #[test]
    fn test_direction() {
        let plan = Path::new(vec![
            Pose::new(0.0, 0.0, 0.0),
            Pose::new(1.0, 0.0, 0.0),
            Pose::new(1.0, 1.0, 0.0),
            Pose::new(1.0, 2.0, 0.0),
        ])
        .unwrap();
        let mut tracker = PlanTracker::new(3, 0.5);
        tracker.set_plan(plan);

        tracker.set_pose(Pose::new(0.0, 0.0, 0.0));
        assert_eq!(tracker.nearest_direction(), Some(0.0));
        assert_eq!(tracker.direction_error(), Some(0.0));

        tracker.set_pose(Pose::new(1.0, 1.1, 0.0));
        assert_eq!(tracker.nearest_direction(), Some(FRAC_PI_2));
        assert!((tracker.direction_error().unwrap() - FRAC_PI_2).abs() < 1e-9);

        // End of the plan uses the final segment
        tracker.set_pose(Pose::new(1.0, 2.5, FRAC_PI_2));
        assert_eq!(tracker.nearest_direction(), Some(FRAC_PI_2));
        assert_eq!(tracker.direction_error(), Some(0.0));
    }

    #[test]
    fn test_progress() {
        let mut tracker = PlanTracker::new(3, 0.5);
        assert_eq!(tracker.progress_m(), None);

        tracker.set_plan(straight(10));
        tracker.set_pose(Pose::new(0.1, 0.0, 0.0));
        assert_eq!(tracker.progress_m(), Some(0.0));

        tracker.set_pose(Pose::new(2.9, 0.4, 0.0));
        assert!((tracker.progress_m().unwrap() - 3.0).abs() < 1e-9);

        // Sideways moves do not change it
        tracker.set_pose(Pose::new(3.0, -0.4, 0.0));
        assert!((tracker.progress_m().unwrap() - 3.0).abs() < 1e-9);

        // Backwards moves reduce it
        tracker.set_pose(Pose::new(1.8, 0.0, 0.0));
        assert!((tracker.progress_m().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_lookahead_point() {
        let mut tracker = PlanTracker::new(3, 0.5);
        tracker.set_plan(straight(5));
        tracker.set_pose(Pose::new(1.0, 0.0, 0.0));

        assert_eq!(tracker.lookahead_point(1.5), Some(Vector2::new(3.0, 0.0)));
        assert_eq!(tracker.lookahead_point(10.0), Some(Vector2::new(4.0, 0.0)));
    }
}
