//! # Trajectory generator
//!
//! Samples the window of velocities reachable from the current velocity and
//! forward simulates each sample.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::{SamplingParams, TrajPoint, Trajectory, VelLimits};
use crate::loc::{Pose, Velocity};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const EPSILON: f64 = 1e-5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The range of velocities which can be sampled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelWindow {
    pub min: Velocity,
    pub max: Velocity,
}

#[derive(Debug, Clone)]
pub struct TrajGenerator {
    limits: VelLimits,
    sampling: SamplingParams,

    /// Control period of the planner
    sim_period_s: f64,

    pose: Pose,
    vel: Velocity,
    window: VelWindow,

    /// Every sample in the window, including those which break the limits
    samples: Vec<Velocity>,
}

/// Lazy sequence of the trajectories for each valid sample of a generator.
///
/// A new sequence can be started at any time with [`TrajGenerator::candidates`].
pub struct Candidates<'a> {
    generator: &'a TrajGenerator,
    next: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajGenerator {
    pub fn new(limits: VelLimits, sampling: SamplingParams, sim_period_s: f64) -> Self {
        Self {
            limits,
            sampling,
            sim_period_s,
            pose: Pose::default(),
            vel: Velocity::zero(),
            window: VelWindow::default(),
            samples: Vec::new(),
        }
    }

    /// Set new sampling parameters, which take effect on the next call to `init`.
    pub fn set_sampling(&mut self, sampling: SamplingParams) {
        self.sampling = sampling;
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    pub fn limits(&self) -> &VelLimits {
        &self.limits
    }

    pub fn sim_period_s(&self) -> f64 {
        self.sim_period_s
    }

    /// Prepare the generator for a new cycle from the robot's current state.
    pub fn init(&mut self, pose: &Pose, vel: &Velocity) {
        self.pose = *pose;
        self.vel = *vel;
        self.window = self.dynamic_window(vel);

        let vx = sample_range(
            self.window.min.linear_ms[0],
            self.window.max.linear_ms[0],
            self.sampling.vx_samples,
        );
        let vy = sample_range(
            self.window.min.linear_ms[1],
            self.window.max.linear_ms[1],
            self.sampling.vy_samples,
        );
        let vth = sample_range(
            self.window.min.angular_rads,
            self.window.max.angular_rads,
            self.sampling.vth_samples,
        );

        self.samples.clear();
        for x in &vx {
            for y in &vy {
                for th in &vth {
                    self.samples.push(Velocity::new(*x, *y, *th));
                }
            }
        }

        trace!(
            "Velocity window {:?} -> {:?}, {} samples",
            self.window.min,
            self.window.max,
            self.samples.len()
        );
    }

    pub fn window(&self) -> &VelWindow {
        &self.window
    }

    pub fn samples(&self) -> &[Velocity] {
        &self.samples
    }

    /// Velocities reachable from `vel` within the limits.
    ///
    /// With DWA the window covers one control period, otherwise the whole simulation horizon.
    pub fn dynamic_window(&self, vel: &Velocity) -> VelWindow {
        let dt = if self.sampling.use_dwa {
            self.sim_period_s
        } else {
            self.sampling.sim_time_s
        };
        let l = &self.limits;

        let axis = |v: f64, acc: f64, min: f64, max: f64| {
            let hi = max.min(v + acc * dt);
            let lo = min.max(v - acc * dt).min(hi);
            (lo, hi)
        };

        let (min_x, max_x) = axis(vel.linear_ms[0], l.acc_lim_x_mss, l.min_vel_x_ms, l.max_vel_x_ms);
        let (min_y, max_y) = axis(vel.linear_ms[1], l.acc_lim_y_mss, l.min_vel_y_ms, l.max_vel_y_ms);
        let (min_th, max_th) = axis(
            vel.angular_rads,
            l.acc_lim_theta_radss,
            -l.max_rot_vel_rads,
            l.max_rot_vel_rads,
        );

        VelWindow {
            min: Velocity::new(min_x, min_y, min_th),
            max: Velocity::new(max_x, max_y, max_th),
        }
    }

    /// Start a new sequence of candidate trajectories.
    pub fn candidates(&self) -> Candidates<'_> {
        Candidates {
            generator: self,
            next: 0,
        }
    }

    /// Check a velocity sample against the translational and rotational limits.
    pub fn is_sample_valid(&self, sample: &Velocity) -> bool {
        let l = &self.limits;
        let speed = sample.trans_speed_ms();

        if speed - EPSILON > l.max_trans_vel_ms {
            return false;
        }

        // The robot must be moving with at least one of the minimum velocities
        if speed + EPSILON < l.min_trans_vel_ms && sample.angular_rads.abs() + EPSILON < l.min_rot_vel_rads {
            return false;
        }

        true
    }

    /// Simulate a single velocity sample from the current state.
    ///
    /// Returns `None` if the sample breaks the limits.
    pub fn generate(&self, sample: &Velocity) -> Option<Trajectory> {
        if !self.is_sample_valid(sample) {
            return None;
        }

        let num_steps = self.num_steps(sample);
        let dt = self.sampling.sim_time_s / num_steps as f64;

        if self.sampling.use_dwa {
            return Some(Trajectory::constant(
                &self.pose,
                *sample,
                self.sampling.sim_time_s,
                num_steps,
            ));
        }

        let mut pose = self.pose;
        let mut vel = self.vel;
        let mut points = Vec::with_capacity(num_steps + 1);
        points.push(TrajPoint { pose, time_s: 0.0 });

        for i in 1..=num_steps {
            vel = self.ramp(&vel, sample, dt);
            pose = pose.integrate(&vel, dt);
            points.push(TrajPoint {
                pose,
                time_s: i as f64 * dt,
            });
        }

        Some(Trajectory::new(*sample, dt, points))
    }

    fn num_steps(&self, sample: &Velocity) -> usize {
        let s = &self.sampling;

        let steps = if s.discretize_by_time {
            (s.sim_time_s / s.sim_granularity_m).ceil()
        } else {
            let trans = (sample.trans_speed_ms() * s.sim_time_s / s.sim_granularity_m).ceil();
            let ang = (sample.angular_rads.abs() * s.sim_time_s / s.angular_sim_granularity_rad).ceil();
            trans.max(ang)
        };

        (steps as usize).max(1)
    }

    /// Step `vel` towards `target` at the acceleration limits.
    fn ramp(&self, vel: &Velocity, target: &Velocity, dt: f64) -> Velocity {
        let step = |v: f64, t: f64, acc: f64| {
            if t < v {
                t.max(v - acc * dt)
            } else {
                t.min(v + acc * dt)
            }
        };

        Velocity::new(
            step(vel.linear_ms[0], target.linear_ms[0], self.limits.acc_lim_x_mss),
            step(vel.linear_ms[1], target.linear_ms[1], self.limits.acc_lim_y_mss),
            step(vel.angular_rads, target.angular_rads, self.limits.acc_lim_theta_radss),
        )
    }
}

impl<'a> Iterator for Candidates<'a> {
    type Item = Trajectory;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.generator.samples.len() {
            let sample = self.generator.samples[self.next];
            self.next += 1;

            if let Some(traj) = self.generator.generate(&sample) {
                return Some(traj);
            }
        }

        None
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Evenly spaced samples over `[min, max]`.
///
/// A degenerate range gives a single sample. Otherwise at least two samples
/// are given, including both ends of the range, and zero is added if the
/// range crosses it.
pub fn sample_range(min: f64, max: f64, num_samples: usize) -> Vec<f64> {
    if (max - min).abs() < EPSILON {
        return vec![min];
    }

    let n = num_samples.max(2);
    let step = (max - min) / (n - 1) as f64;

    let mut samples: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
    if let Some(last) = samples.last_mut() {
        *last = max;
    }

    if min < 0.0 && max > 0.0 && samples.iter().all(|s| s.abs() > EPSILON) {
        let idx = samples.iter().position(|&s| s > 0.0).unwrap_or(samples.len());
        samples.insert(idx, 0.0);
    }

    samples
}

#[cfg(test)]
mod test {
    use super::*;

    fn generator(use_dwa: bool) -> TrajGenerator {
        let sampling = SamplingParams {
            vx_samples: 3,
            vy_samples: 1,
            vth_samples: 5,
            use_dwa,
            ..Default::default()
        };

        TrajGenerator::new(VelLimits::default(), sampling, 0.1)
    }

    #[test]
    fn test_sample_range() {
        assert_eq!(sample_range(0.5, 0.5, 4), vec![0.5]);
        assert_eq!(sample_range(0.0, 1.0, 1), vec![0.0, 1.0]);
        assert_eq!(sample_range(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(sample_range(-1.0, 1.0, 3), vec![-1.0, 0.0, 1.0]);
        assert_eq!(sample_range(-1.0, 2.0, 2), vec![-1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_dynamic_window() {
        let gen = generator(true);

        let w = gen.dynamic_window(&Velocity::zero());
        assert_eq!(w.min.linear_ms[0], 0.0);
        assert!((w.max.linear_ms[0] - 0.25).abs() < 1e-9);
        assert!((w.min.angular_rads + 0.32).abs() < 1e-9);
        assert!((w.max.angular_rads - 0.32).abs() < 1e-9);

        // Clamped to the limits
        let w = gen.dynamic_window(&Velocity::new(0.5, 0.0, 0.9));
        assert_eq!(w.max.linear_ms[0], 0.55);
        assert_eq!(w.max.angular_rads, 1.0);

        // Without DWA the window covers the whole horizon
        let w = generator(false).dynamic_window(&Velocity::zero());
        assert_eq!(w.max.linear_ms[0], 0.55);
        assert_eq!(w.min.angular_rads, -1.0);
    }

    #[test]
    fn test_sample_validity() {
        let gen = generator(true);

        assert!(!gen.is_sample_valid(&Velocity::zero()));
        assert!(!gen.is_sample_valid(&Velocity::new(0.05, 0.0, 0.1)));
        assert!(gen.is_sample_valid(&Velocity::new(0.05, 0.0, 0.5)));
        assert!(gen.is_sample_valid(&Velocity::new(0.2, 0.0, 0.0)));
        assert!(!gen.is_sample_valid(&Velocity::new(0.6, 0.0, 0.0)));
    }

    #[test]
    fn test_candidates() {
        let mut gen = generator(true);
        gen.init(&Pose::default(), &Velocity::new(0.2, 0.0, 0.0));

        assert_eq!(gen.samples().len(), 3 * 1 * 5);

        let trajs: Vec<Trajectory> = gen.candidates().collect();
        assert!(!trajs.is_empty());
        assert!(trajs.len() <= 15);
        for t in &trajs {
            assert!(gen.is_sample_valid(&t.vel));
            assert_eq!(t.start(), Some(&Pose::default()));
            assert!(!t.is_legal());
        }

        // Restartable
        assert_eq!(gen.candidates().count(), trajs.len());
    }

    #[test]
    fn test_generate_straight() {
        let mut gen = generator(true);
        gen.init(&Pose::new(1.0, 1.0, 0.0), &Velocity::new(0.2, 0.0, 0.0));

        let t = gen.generate(&Velocity::new(0.3, 0.0, 0.0)).unwrap();
        let end = t.end().unwrap();

        // 0.3 m/s over 1.7 s in 0.025 m steps
        assert_eq!(t.points.len(), 22);
        assert!((end.position_m[0] - 1.51).abs() < 1e-9);
        assert!((end.position_m[1] - 1.0).abs() < 1e-9);
        assert!((t.points.last().unwrap().time_s - 1.7).abs() < 1e-9);

        assert!(gen.generate(&Velocity::zero()).is_none());
    }

    #[test]
    fn test_generate_ramped() {
        let mut gen = generator(false);
        gen.init(&Pose::default(), &Velocity::zero());

        let ramped = gen.generate(&Velocity::new(0.5, 0.0, 0.0)).unwrap();
        let end = ramped.end().unwrap().position_m[0];

        // Accelerating from rest covers less ground than the constant velocity
        assert!(end > 0.0);
        assert!(end < 0.5 * 1.7);
    }
}
