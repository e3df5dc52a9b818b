// SPDX-License-Identifier: MIT

//! Shared fixtures for the integration test suites: a scriptable sensor
//! provider, scriptable remote backends, and unique temp data dirs.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use stride_tracker::error::{AppError, Result};
use stride_tracker::models::activity::ActivityRecord;
use stride_tracker::models::metrics::LocationSample;
use stride_tracker::models::session::{ActivityType, WorkoutSummary};
use stride_tracker::services::{LocationProvider, RemoteActivityStore, SensorEvent, SyncOutcome};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh data directory per test; callers remove it when done.
#[allow(dead_code)]
pub fn temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.push(format!(
        "stride_it_{nanos}_{counter}_{}",
        std::process::id()
    ));
    dir
}

/// Location sample `n` steps of 50 m due east of the origin, on the equator
/// where longitude degrees convert cleanly to meters.
#[allow(dead_code)]
pub fn sample_east_50m(n: u64, at: DateTime<Utc>) -> LocationSample {
    LocationSample {
        latitude: 0.0,
        longitude: n as f64 * (50.0 / 111_320.0),
        altitude_m: 30.0,
        timestamp: at,
    }
}

/// Provider whose sample feed is driven by the test body.
pub struct ScriptedProvider {
    sender: Mutex<Option<mpsc::Sender<SensorEvent>>>,
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
        }
    }

    /// Handle for pushing events into the active stream.
    pub fn feed(&self) -> mpsc::Sender<SensorEvent> {
        self.sender
            .lock()
            .unwrap()
            .clone()
            .expect("provider started")
    }
}

#[async_trait]
impl LocationProvider for ScriptedProvider {
    async fn request_authorization(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<mpsc::Receiver<SensorEvent>> {
        let (tx, rx) = mpsc::channel(64);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) {
        self.sender.lock().unwrap().take();
    }
}

/// Build an activity record without the ceremony.
#[allow(dead_code)]
pub fn record(local_id: &str, external_id: &str, remote_id: Option<&str>) -> ActivityRecord {
    ActivityRecord {
        local_id: local_id.to_string(),
        remote_id: remote_id.map(str::to_string),
        external_id: external_id.to_string(),
        source: if remote_id.is_some() {
            ActivityRecord::SOURCE_REMOTE.to_string()
        } else {
            ActivityRecord::SOURCE_DEVICE.to_string()
        },
        activity_type: ActivityType::Running,
        start_time: Utc::now(),
        duration_seconds: 60.0,
        distance_meters: 250.0,
        calories: 12.0,
        average_heart_rate: None,
        max_heart_rate: None,
        route: vec![],
        synced: remote_id.is_some(),
    }
}

/// Finished-workout summary with distinguishable but fixed metrics.
#[allow(dead_code)]
pub fn summary(id: &str) -> WorkoutSummary {
    WorkoutSummary {
        id: id.to_string(),
        activity_type: ActivityType::Running,
        start_time: Utc::now(),
        end_time: Utc::now(),
        duration_seconds: 20.0,
        distance_meters: 150.0,
        average_pace_secs_per_km: Some(133.3),
        average_speed_mps: 7.5,
        calories: 5.0,
        elevation_gain_meters: 0.0,
        average_heart_rate: None,
        max_heart_rate: None,
        route: vec![],
    }
}

/// Scriptable in-memory backend.
///
/// Accepts creates (assigning `rem-<local_id>` remote ids), serves a fixed
/// fetch list, and records every delete. Individual failure modes are
/// toggled per test.
#[derive(Default)]
pub struct ScriptedRemote {
    pub fetch_result: Mutex<Vec<ActivityRecord>>,
    pub deleted: Mutex<Vec<String>>,
    pub created: Mutex<Vec<ActivityRecord>>,
    pub fail_deletes: Mutex<bool>,
    pub fail_fetches: Mutex<bool>,
    pub fail_creates_with: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(self: &Arc<Self>, records: Vec<ActivityRecord>) {
        *self.fetch_result.lock().unwrap() = records;
    }

    pub fn fail_deletes(self: &Arc<Self>) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    pub fn fail_fetches(self: &Arc<Self>) {
        *self.fail_fetches.lock().unwrap() = true;
    }

    pub fn fail_creates_with(self: &Arc<Self>, message: &str) {
        *self.fail_creates_with.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl RemoteActivityStore for ScriptedRemote {
    async fn create_activity(&self, record: &ActivityRecord) -> Result<ActivityRecord> {
        if let Some(message) = self.fail_creates_with.lock().unwrap().clone() {
            return Err(AppError::RemoteApi(message));
        }
        let mut created = record.clone();
        created.remote_id = Some(format!("rem-{}", record.local_id));
        created.synced = true;
        self.created.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_activity(&self, remote_id: &str) -> Result<()> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(AppError::RemoteApi("HTTP 503: unavailable".to_string()));
        }
        self.deleted.lock().unwrap().push(remote_id.to_string());
        Ok(())
    }

    async fn fetch_activities(
        &self,
        _after: DateTime<Utc>,
        _before: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        if *self.fail_fetches.lock().unwrap() {
            return Err(AppError::RemoteApi("HTTP 502: bad gateway".to_string()));
        }
        Ok(self.fetch_result.lock().unwrap().clone())
    }

    async fn sync_activities(&self, records: &[ActivityRecord]) -> Result<SyncOutcome> {
        Ok(SyncOutcome {
            synced_count: records.len(),
            duplicate_count: 0,
        })
    }
}
