// SPDX-License-Identifier: MIT

//! Raw sensor samples and the derived point-in-time metrics view.

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

/// A single GPS fix delivered by the location collaborator.
///
/// Samples with insufficient horizontal accuracy are rejected at the
/// location boundary and never reach the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude above sea level in meters.
    pub altitude_m: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    /// Coordinate as a geo point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// A heart-rate reading; absent entirely when no HR source is paired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub bpm: u16,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time derived view of an in-progress session.
///
/// Recomputed on every new sample; never persisted on its own, only as part
/// of a recovery snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkoutMetricsSnapshot {
    /// Active elapsed time (paused intervals excluded), in seconds.
    pub elapsed_seconds: f64,
    /// Cumulative great-circle distance in meters.
    pub distance_meters: f64,
    /// Pace over the trailing window, seconds per kilometer.
    /// `None` when distance is zero or the value exceeds the sane bound.
    pub current_pace_secs_per_km: Option<f64>,
    /// Pace over the whole active distance, seconds per kilometer.
    pub average_pace_secs_per_km: Option<f64>,
    /// Instantaneous speed in meters per second.
    pub current_speed_mps: f64,
    /// Estimated energy burned in kilocalories.
    pub calories: f64,
    /// Cumulative positive altitude delta in meters.
    pub elevation_gain_meters: f64,
    /// Most recent heart-rate reading, if an HR source is paired.
    pub current_heart_rate: Option<u16>,
}
