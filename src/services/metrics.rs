// SPDX-License-Identifier: MIT

//! Pure metrics aggregation from raw sample streams.

use geo::{Distance, Haversine};

use crate::models::metrics::{HeartRateSample, LocationSample, WorkoutMetricsSnapshot};
use crate::models::session::{ActivityType, WorkoutSession};

/// Paces at or above this bound are unavailable rather than displayed.
pub const MAX_PACE_SECS_PER_KM: f64 = 3600.0;

/// Number of trailing location samples used for the current-pace window.
const PACE_WINDOW_SAMPLES: usize = 5;

/// Heart rate treated as baseline intensity by the calorie model.
const REFERENCE_BPM: f64 = 135.0;

/// Derives a `WorkoutMetricsSnapshot` from the session's raw samples.
///
/// Performs no I/O and holds no sample state of its own; the session owns
/// the samples, the aggregator recomputes the full snapshot on every call.
/// Degenerate input (no samples, zero distance) yields zeros and `None`
/// paces, never an error.
#[derive(Debug, Clone, Copy)]
pub struct MetricsAggregator {
    activity_type: ActivityType,
    weight_kg: f64,
}

impl MetricsAggregator {
    pub fn new(activity_type: ActivityType, weight_kg: f64) -> Self {
        Self {
            activity_type,
            weight_kg,
        }
    }

    /// Recompute the derived view for the current sample set.
    ///
    /// `elapsed_active_secs` is active time only; paused intervals are
    /// already excluded by the caller's clock accounting.
    pub fn compute(
        &self,
        session: &WorkoutSession,
        elapsed_active_secs: f64,
    ) -> WorkoutMetricsSnapshot {
        let samples = &session.location_samples;
        let distance_meters = total_distance_meters(samples);

        WorkoutMetricsSnapshot {
            elapsed_seconds: elapsed_active_secs,
            distance_meters,
            current_pace_secs_per_km: trailing_window_pace(samples),
            average_pace_secs_per_km: pace_secs_per_km(distance_meters, elapsed_active_secs),
            current_speed_mps: current_speed_mps(samples),
            calories: self.calories(elapsed_active_secs, &session.heart_rate_samples),
            elevation_gain_meters: elevation_gain_meters(samples),
            current_heart_rate: session.heart_rate_samples.last().map(|s| s.bpm),
        }
    }

    /// MET-based energy estimate in kilocalories, scaled by mean heart
    /// rate when one is available. Monotone in active time.
    fn calories(&self, elapsed_active_secs: f64, heart_rate: &[HeartRateSample]) -> f64 {
        let hours = elapsed_active_secs.max(0.0) / 3600.0;
        let factor = match average_heart_rate(heart_rate) {
            Some(bpm) => (bpm / REFERENCE_BPM).clamp(0.75, 1.5),
            None => 1.0,
        };
        self.activity_type.met() * self.weight_kg * hours * factor
    }
}

/// Cumulative great-circle distance over consecutive samples, in meters.
pub fn total_distance_meters(samples: &[LocationSample]) -> f64 {
    samples
        .windows(2)
        .map(|pair| Haversine.distance(pair[0].point(), pair[1].point()))
        .sum()
}

/// Cumulative positive-only altitude delta, in meters. Descents are ignored.
pub fn elevation_gain_meters(samples: &[LocationSample]) -> f64 {
    samples
        .windows(2)
        .map(|pair| (pair[1].altitude_m - pair[0].altitude_m).max(0.0))
        .sum()
}

/// Mean of all heart-rate readings, or `None` when no HR source delivered.
pub fn average_heart_rate(samples: &[HeartRateSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| f64::from(s.bpm)).sum();
    Some(sum / samples.len() as f64)
}

/// Highest heart-rate reading seen so far.
pub fn max_heart_rate(samples: &[HeartRateSample]) -> Option<u16> {
    samples.iter().map(|s| s.bpm).max()
}

/// Seconds-per-kilometer over a distance/time pair, with the sane-bound
/// guard applied: zero distance and paces at or above one hour per
/// kilometer are unavailable.
pub fn pace_secs_per_km(distance_meters: f64, elapsed_secs: f64) -> Option<f64> {
    if distance_meters <= 0.0 || elapsed_secs <= 0.0 {
        return None;
    }
    let pace = elapsed_secs / (distance_meters / 1000.0);
    if !pace.is_finite() || pace >= MAX_PACE_SECS_PER_KM {
        return None;
    }
    Some(pace)
}

/// Pace over the trailing sample window, using sample timestamps for the
/// window duration.
fn trailing_window_pace(samples: &[LocationSample]) -> Option<f64> {
    let start = samples.len().saturating_sub(PACE_WINDOW_SAMPLES);
    let window = &samples[start..];
    if window.len() < 2 {
        return None;
    }

    let distance = total_distance_meters(window);
    let span = window
        .last()
        .map(|last| last.timestamp - window[0].timestamp)?;
    let secs = span.num_milliseconds() as f64 / 1000.0;
    pace_secs_per_km(distance, secs)
}

/// Instantaneous speed over the last two samples, meters per second.
fn current_speed_mps(samples: &[LocationSample]) -> f64 {
    let len = samples.len();
    if len < 2 {
        return 0.0;
    }
    let last = &samples[len - 1];
    let prev = &samples[len - 2];
    let secs = (last.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
    if secs <= 0.0 {
        return 0.0;
    }
    Haversine.distance(prev.point(), last.point()) / secs
}
