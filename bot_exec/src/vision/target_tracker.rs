//! # Target tracker
//!
//! Aggregates field-frame target samples from all cameras into tracks. A track is a set of recent
//! samples which lie close to each other, its averaged pose is the best estimate of where that
//! target is.
//!
//! Samples expire after `max_lifetime_s`, and a track which has lost all of its samples is
//! removed. A track is only reported once it has held at least `min_samples` samples at the same
//! time, which rejects single-frame false positives.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};
use nalgebra::Vector2;
use serde::Serialize;
use util::maths::circular_mean;

use super::params::TrackerParams;
use crate::geom::Pose2d;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A store of tracked vision targets.
pub trait TargetTracker {
    /// Add a batch of field-frame samples all captured at `timestamp_s`.
    fn add_samples(&mut self, timestamp_s: f64, samples: Vec<Pose2d>);

    /// Expire old samples and update the robot-relative pose of every track.
    fn update(&mut self, now_s: f64, robot_pose: &Pose2d);

    /// The nearest live target in front of (`front = true`) or behind the robot.
    fn best_target(&self, front: bool) -> Option<TrackedTarget>;

    /// The nearest live target within the association tolerance of a field point.
    fn absolute_target(&self, point_m: &Vector2<f64>) -> Option<TrackedTarget>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A snapshot of one track, as returned by the tracker's queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackedTarget {
    /// Unique identifier of the track
    pub id: u64,

    /// Averaged field-frame pose, `None` if the track has no samples
    pub averaged_pose: Option<Pose2d>,

    /// Averaged pose expressed in the robot frame at the last update
    pub relative_pose: Option<Pose2d>,

    /// Time of the most recent sample
    pub last_seen_s: f64,

    /// Number of samples currently held
    pub num_samples: usize,
}

/// A single track.
#[derive(Debug, Clone)]
struct Track {
    id: u64,

    samples: VecDeque<(f64, Pose2d)>,

    /// Set once the track has held enough samples to be trusted
    is_real: bool,

    averaged_pose: Option<Pose2d>,

    relative_pose: Option<Pose2d>,
}

/// Single threaded target tracker.
#[derive(Debug, Clone)]
pub struct TrackerStore {
    params: TrackerParams,

    tracks: Vec<Track>,

    next_id: u64,
}

/// Thread-safe handle to a [`TrackerStore`].
///
/// Clones share the same store, so one clone can be given to the vision ingestion while another
/// is used by the control loop. All queries return owned snapshots.
#[derive(Debug, Clone)]
pub struct SharedTargetTracker {
    inner: Arc<Mutex<TrackerStore>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Track {
    fn new(id: u64, timestamp_s: f64, pose: Pose2d) -> Self {
        let mut t = Self {
            id,
            samples: VecDeque::new(),
            is_real: false,
            averaged_pose: None,
            relative_pose: None,
        };
        t.push(timestamp_s, pose);
        t
    }

    fn push(&mut self, timestamp_s: f64, pose: Pose2d) {
        self.samples.push_back((timestamp_s, pose));
        self.recompute_average();
    }

    fn is_alive(&self) -> bool {
        !self.samples.is_empty()
    }

    fn last_seen_s(&self) -> f64 {
        self.samples
            .iter()
            .map(|(t, _)| *t)
            .fold(std::f64::NEG_INFINITY, f64::max)
    }

    fn recompute_average(&mut self) {
        let n = self.samples.len();
        if n == 0 {
            self.averaged_pose = None;
            return;
        }

        let sum_m = self.samples
            .iter()
            .fold(Vector2::zeros(), |acc, (_, p)| acc + p.position_m);

        // Headings which cancel out exactly have no mean, fall back on the newest sample
        let heading_rad = circular_mean(self.samples.iter().map(|(_, p)| p.heading_rad))
            .or_else(|| self.samples.back().map(|(_, p)| p.heading_rad))
            .unwrap_or(0.0);

        self.averaged_pose = Some(Pose2d::from_position(sum_m / n as f64, heading_rad));
    }

    fn snapshot(&self) -> TrackedTarget {
        TrackedTarget {
            id: self.id,
            averaged_pose: self.averaged_pose,
            relative_pose: self.relative_pose,
            last_seen_s: self.last_seen_s(),
            num_samples: self.samples.len(),
        }
    }

    /// Distance from the track's averaged position to a point.
    fn distance_to(&self, point_m: &Vector2<f64>) -> Option<f64> {
        self.averaged_pose.map(|p| (p.position_m - point_m).norm())
    }
}

impl TrackerStore {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            params,
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    /// Number of tracks currently held, including those not yet real.
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Remove every track.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Snapshots of every live, real track.
    pub fn targets(&self) -> Vec<TrackedTarget> {
        self.reported().map(Track::snapshot).collect()
    }

    fn reported(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_real && t.is_alive())
    }
}

impl TargetTracker for TrackerStore {
    fn add_samples(&mut self, timestamp_s: f64, samples: Vec<Pose2d>) {
        let tol_m = self.params.association_tolerance_m;

        for pose in samples {
            let nearest = self.tracks
                .iter_mut()
                .filter_map(|t| t.distance_to(&pose.position_m).map(move |d| (d, t)))
                .filter(|(d, _)| *d < tol_m)
                .min_by(|(a, _), (b, _)| a.total_cmp(b));

            match nearest {
                Some((_, track)) => {
                    track.push(timestamp_s, pose);
                    if track.samples.len() >= self.params.min_samples {
                        track.is_real = true;
                    }
                }
                None => {
                    let mut track = Track::new(self.next_id, timestamp_s, pose);
                    track.is_real = self.params.min_samples <= 1;
                    debug!("New target track {} at {:?}", track.id, pose.position_m);
                    self.tracks.push(track);
                    self.next_id += 1;
                }
            }
        }
    }

    fn update(&mut self, now_s: f64, robot_pose: &Pose2d) {
        let max_lifetime_s = self.params.max_lifetime_s;

        for track in self.tracks.iter_mut() {
            let num_before = track.samples.len();
            track.samples.retain(|(t, _)| now_s - t <= max_lifetime_s);

            if track.samples.len() != num_before {
                track.recompute_average();
            }

            track.relative_pose = track
                .averaged_pose
                .map(|p| p.in_frame_of_reference_of(robot_pose));
        }

        let num_tracks = self.tracks.len();
        self.tracks.retain(Track::is_alive);
        if self.tracks.len() != num_tracks {
            trace!("Removed {} dead target tracks", num_tracks - self.tracks.len());
        }
    }

    fn best_target(&self, front: bool) -> Option<TrackedTarget> {
        self.reported()
            .filter_map(|t| t.relative_pose.map(|r| (r, t)))
            .filter(|(r, _)| if front { r.position_m[0] > 0.0 } else { r.position_m[0] < 0.0 })
            .min_by(|(a, _), (b, _)| a.position_m.norm().total_cmp(&b.position_m.norm()))
            .map(|(_, t)| t.snapshot())
    }

    fn absolute_target(&self, point_m: &Vector2<f64>) -> Option<TrackedTarget> {
        let tol_m = self.params.association_tolerance_m;

        self.reported()
            .filter_map(|t| t.distance_to(point_m).map(|d| (d, t)))
            .filter(|(d, _)| *d < tol_m)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, t)| t.snapshot())
    }
}

impl SharedTargetTracker {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackerStore::new(params))),
        }
    }

    /// Lock the underlying store.
    ///
    /// A panic while holding the lock cannot leave the store half-updated in a way that matters
    /// to readers, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, TrackerStore> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TargetTracker for SharedTargetTracker {
    fn add_samples(&mut self, timestamp_s: f64, samples: Vec<Pose2d>) {
        self.lock().add_samples(timestamp_s, samples)
    }

    fn update(&mut self, now_s: f64, robot_pose: &Pose2d) {
        self.lock().update(now_s, robot_pose)
    }

    fn best_target(&self, front: bool) -> Option<TrackedTarget> {
        self.lock().best_target(front)
    }

    fn absolute_target(&self, point_m: &Vector2<f64>) -> Option<TrackedTarget> {
        self.lock().absolute_target(point_m)
    }
}
