// SPDX-License-Identifier: MIT

//! Session lifecycle types: activity kinds, phases and the finished summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::metrics::{HeartRateSample, LocationSample};

/// Closed set of trackable workout kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Running,
    Walking,
    Cycling,
    Hiking,
}

impl ActivityType {
    /// Metabolic equivalent used by the calorie model.
    pub fn met(&self) -> f64 {
        match self {
            ActivityType::Running => 9.8,
            ActivityType::Walking => 3.5,
            ActivityType::Cycling => 7.5,
            ActivityType::Hiking => 6.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Walking => "walking",
            ActivityType::Cycling => "cycling",
            ActivityType::Hiking => "hiking",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single authoritative lifecycle phase of the session state machine.
///
/// Exactly one phase holds at a time; a new session may only start from
/// `Idle` or `Summary`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Idle,
    Preparing,
    /// Countdown tick currently displayed (3, 2, 1).
    Countdown(u8),
    Tracking,
    Paused,
    Finishing,
    Summary(WorkoutSummary),
    Error(String),
}

impl SessionPhase {
    /// Whether a new session may start from this phase.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionPhase::Idle | SessionPhase::Summary(_))
    }

    /// Whether a session is currently being tracked (active or paused).
    pub fn is_tracking(&self) -> bool {
        matches!(self, SessionPhase::Tracking | SessionPhase::Paused)
    }
}

/// In-memory session aggregate owned by the session manager.
///
/// Sample sequences are append-only; timestamps are monotonically
/// non-decreasing. Elapsed/paused accounting lives with the manager since it
/// is monotonic-clock based.
#[derive(Debug, Clone)]
pub struct WorkoutSession {
    pub id: String,
    pub activity_type: ActivityType,
    /// Set when tracking begins, after the countdown.
    pub start_time: DateTime<Utc>,
    pub location_samples: Vec<LocationSample>,
    pub heart_rate_samples: Vec<HeartRateSample>,
}

impl WorkoutSession {
    pub fn new(id: String, activity_type: ActivityType, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            activity_type,
            start_time,
            location_samples: Vec::new(),
            heart_rate_samples: Vec::new(),
        }
    }
}

/// Immutable result of a completed session.
///
/// Created once by `finish_workout`, read-only thereafter; this is the unit
/// handed to reconciliation for backend sync and to the UI for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub id: String,
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Active duration in seconds, paused intervals excluded.
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub average_pace_secs_per_km: Option<f64>,
    pub average_speed_mps: f64,
    pub calories: f64,
    pub elevation_gain_meters: f64,
    pub average_heart_rate: Option<f64>,
    pub max_heart_rate: Option<u16>,
    /// Full ordered route as recorded.
    pub route: Vec<LocationSample>,
}
