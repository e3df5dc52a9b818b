// SPDX-License-Identifier: MIT

//! Backend-facing activity records and the persisted hidden-id sets.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::session::{ActivityType, WorkoutSummary};

/// A single route vertex as stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Backend-facing representation of one physical workout.
///
/// `external_id` is the stable device-local identifier used to match local
/// and remote copies of the same workout; it is the sole de-duplication key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Device-local identifier.
    pub local_id: String,
    /// Backend identifier, absent until the record has been synced.
    pub remote_id: Option<String>,
    /// Stable cross-representation identifier for the physical workout.
    pub external_id: String,
    /// Where the record originated ("device", "remote", ...).
    pub source: String,
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub calories: f64,
    #[serde(default)]
    pub average_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<u16>,
    #[serde(default)]
    pub route: Vec<RouteCoordinate>,
    /// Whether the backend copy is authoritative for this record.
    #[serde(default)]
    pub synced: bool,
}

impl ActivityRecord {
    /// Source tag for records created on this device.
    pub const SOURCE_DEVICE: &'static str = "device";

    /// Source tag for records fetched from the backend.
    pub const SOURCE_REMOTE: &'static str = "remote";

    /// Build a device-local record from a finished workout summary.
    pub fn from_summary(summary: &WorkoutSummary) -> Self {
        Self {
            local_id: summary.id.clone(),
            remote_id: None,
            external_id: format!("stride-{}", summary.id),
            source: Self::SOURCE_DEVICE.to_string(),
            activity_type: summary.activity_type,
            start_time: summary.start_time,
            duration_seconds: summary.duration_seconds,
            distance_meters: summary.distance_meters,
            calories: summary.calories,
            average_heart_rate: summary.average_heart_rate,
            max_heart_rate: summary.max_heart_rate,
            route: summary
                .route
                .iter()
                .map(|s| RouteCoordinate {
                    latitude: s.latitude,
                    longitude: s.longitude,
                })
                .collect(),
            synced: false,
        }
    }
}

/// Persisted sets of identifiers the user has explicitly deleted locally.
///
/// Entries are permanent until `clear` (e.g. on sign-out) and prevent merge
/// logic from resurrecting a deleted item when local or remote history is
/// re-scanned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiddenIds {
    #[serde(default)]
    pub local_ids: HashSet<String>,
    #[serde(default)]
    pub external_ids: HashSet<String>,
}

impl HiddenIds {
    /// Record a deletion: hides the local id and, when present, the
    /// external id.
    pub fn hide(&mut self, record: &ActivityRecord) {
        self.local_ids.insert(record.local_id.clone());
        if !record.external_id.is_empty() {
            self.external_ids.insert(record.external_id.clone());
        }
    }

    /// Whether a record has been deleted by the user.
    pub fn contains(&self, record: &ActivityRecord) -> bool {
        self.local_ids.contains(&record.local_id)
            || self.external_ids.contains(&record.external_id)
    }

    pub fn is_empty(&self) -> bool {
        self.local_ids.is_empty() && self.external_ids.is_empty()
    }

    /// Forget all hidden ids (sign-out path).
    pub fn clear(&mut self) {
        self.local_ids.clear();
        self.external_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::ActivityType;

    fn record(local_id: &str, external_id: &str) -> ActivityRecord {
        ActivityRecord {
            local_id: local_id.to_string(),
            remote_id: None,
            external_id: external_id.to_string(),
            source: ActivityRecord::SOURCE_DEVICE.to_string(),
            activity_type: ActivityType::Running,
            start_time: Utc::now(),
            duration_seconds: 60.0,
            distance_meters: 250.0,
            calories: 12.0,
            average_heart_rate: None,
            max_heart_rate: None,
            route: vec![],
            synced: false,
        }
    }

    #[test]
    fn test_hide_matches_by_either_id() {
        let mut hidden = HiddenIds::default();
        hidden.hide(&record("a", "ext-a"));

        // Same local id, different external id.
        assert!(hidden.contains(&record("a", "ext-other")));
        // Same external id, different local id (remote copy of the workout).
        assert!(hidden.contains(&record("b", "ext-a")));
        // Unrelated record.
        assert!(!hidden.contains(&record("c", "ext-c")));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut hidden = HiddenIds::default();
        hidden.hide(&record("a", "ext-a"));
        assert!(!hidden.is_empty());

        hidden.clear();
        assert!(hidden.is_empty());
        assert!(!hidden.contains(&record("a", "ext-a")));
    }

    #[test]
    fn test_from_summary_is_unsynced_device_record() {
        let summary = WorkoutSummary {
            id: "s1".to_string(),
            activity_type: ActivityType::Cycling,
            start_time: Utc::now(),
            end_time: Utc::now(),
            duration_seconds: 120.0,
            distance_meters: 1000.0,
            average_pace_secs_per_km: Some(120.0),
            average_speed_mps: 8.3,
            calories: 40.0,
            elevation_gain_meters: 5.0,
            average_heart_rate: Some(140.0),
            max_heart_rate: Some(161),
            route: vec![],
        };

        let record = ActivityRecord::from_summary(&summary);
        assert_eq!(record.local_id, "s1");
        assert_eq!(record.external_id, "stride-s1");
        assert_eq!(record.source, ActivityRecord::SOURCE_DEVICE);
        assert!(record.remote_id.is_none());
        assert!(!record.synced);
    }
}
