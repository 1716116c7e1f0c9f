//! # Path
//!
//! This module defines the global plan followed by the local planner, and the
//! tracker used to locate the robot along it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod tracker;

pub use tracker::{nearest_index, NearestIndexCache, PlanTracker};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A global plan, an ordered and non-empty sequence of poses.
///
/// A path is never modified once built, a new plan replaces the old one.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Path {
    poses: Vec<Pose>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Attempted to create a path from an empty sequence")]
    EmptySequence,

    #[error("The point separation must be positive, got {0}")]
    InvalidSeparation(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new path from a sequence of poses.
    pub fn new(poses: Vec<Pose>) -> Result<Self, PathError> {
        if poses.is_empty() {
            return Err(PathError::EmptySequence);
        }

        Ok(Self { poses })
    }

    /// Produces a direct path between the two positions, with each point in the path having
    /// at most the given separation. Every pose is headed along the path.
    pub fn direct(
        from: Vector2<f64>,
        to: Vector2<f64>,
        point_sep_m: f64,
    ) -> Result<Self, PathError> {
        if !(point_sep_m > 0.0) {
            return Err(PathError::InvalidSeparation(point_sep_m));
        }

        let diff_vec = to - from;
        let dist = diff_vec.norm();
        let heading_rad = diff_vec[1].atan2(diff_vec[0]);

        // Round up so that no two points end up more than the separation apart, the final point
        // is always the target
        let num_segs = ((dist / point_sep_m).ceil() as usize).max(1);
        let delta = diff_vec / num_segs as f64;

        let poses = (0..=num_segs)
            .map(|i| Pose {
                position_m: from + delta * i as f64,
                heading_rad,
            })
            .collect();

        Ok(Self { poses })
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn get_num_points(&self) -> usize {
        self.poses.len()
    }

    /// The final pose in the path.
    pub fn last(&self) -> &Pose {
        // Paths are never empty
        &self.poses[self.poses.len() - 1]
    }

    /// Return the length of the path in meters.
    pub fn get_length(&self) -> f64 {
        path_length(&self.poses)
    }

    /// Heading of the segment from `index` to the next point, or of the final segment if `index`
    /// is the last point.
    ///
    /// Returns `None` for single-point paths or an out of range index.
    pub fn get_segment_heading(&self, index: usize) -> Option<f64> {
        if self.poses.len() < 2 || index >= self.poses.len() {
            return None;
        }

        let start = index.min(self.poses.len() - 2);
        let d = self.poses[start + 1].position_m - self.poses[start].position_m;

        Some(d[1].atan2(d[0]))
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Cumulative length of a pose sequence.
pub fn path_length(poses: &[Pose]) -> f64 {
    poses.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Returns the prefix of `poses` whose cumulative length does not exceed `distance_m`.
///
/// The first pose is always included.
pub fn shorten(poses: &[Pose], distance_m: f64) -> &[Pose] {
    let mut length_m = 0.0;

    for i in 1..poses.len() {
        length_m += poses[i - 1].distance(&poses[i]);
        if length_m > distance_m {
            return &poses[..i];
        }
    }

    poses
}
