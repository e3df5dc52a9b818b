// SPDX-License-Identifier: MIT

//! Durable recovery snapshot of an in-progress session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::metrics::{HeartRateSample, LocationSample, WorkoutMetricsSnapshot};
use crate::models::session::ActivityType;

/// Serializable projection of an in-progress session.
///
/// Written periodically while tracking is active, overwriting the previous
/// snapshot, and deleted on clean finish/discard. Its presence at launch is
/// the sole signal of an abnormal termination and the only input to the
/// recovery flow. At most one snapshot exists at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutState {
    pub session_id: String,
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    pub is_active: bool,
    pub is_paused: bool,
    /// Accumulated paused time in seconds at the moment of the snapshot.
    pub paused_duration_secs: f64,
    #[serde(default)]
    pub location_samples: Vec<LocationSample>,
    #[serde(default)]
    pub heart_rate_samples: Vec<HeartRateSample>,
    #[serde(default)]
    pub last_metrics: Option<WorkoutMetricsSnapshot>,
    /// Identifier of the live-status surface, when one was started.
    #[serde(default)]
    pub presenter_token: Option<String>,
    pub saved_at: DateTime<Utc>,
}
