// SPDX-License-Identifier: MIT

//! Crash-recovery lifecycle: periodic snapshots while tracking, and the
//! launch-time recovery offer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::recovery::WorkoutState;
use crate::services::manager::WorkoutSessionManager;
use crate::store::{keys, KvStore};

/// Durable store for the single crash-recovery snapshot.
#[derive(Clone)]
pub struct RecoveryStore {
    kv: Arc<dyn KvStore>,
}

impl RecoveryStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Overwrite the snapshot. At most one exists at any time.
    pub fn save_snapshot(&self, state: &WorkoutState) -> Result<()> {
        let json = serde_json::to_string(state)
            .map_err(|e| AppError::Storage(format!("serialize snapshot: {}", e)))?;
        self.kv.set(keys::RECOVERY_SNAPSHOT, &json)
    }

    /// Load the snapshot, if one survived the last shutdown.
    ///
    /// A snapshot that no longer parses is dropped on the spot so it cannot
    /// produce a recovery prompt on every launch.
    pub fn load_snapshot(&self) -> Result<Option<WorkoutState>> {
        let Some(json) = self.kv.get(keys::RECOVERY_SNAPSHOT)? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, "discarding unreadable recovery snapshot");
                self.kv.delete(keys::RECOVERY_SNAPSHOT)?;
                Ok(None)
            }
        }
    }

    pub fn delete_snapshot(&self) -> Result<()> {
        self.kv.delete(keys::RECOVERY_SNAPSHOT)
    }
}

/// Periodic snapshot writer plus the launch-time recovery check.
///
/// The snapshot's presence at launch is the sole signal of an abnormal
/// termination: every clean finish or discard deletes it.
pub struct RecoveryHandler {
    store: RecoveryStore,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RecoveryHandler {
    pub fn new(store: RecoveryStore, interval: Duration) -> Self {
        Self {
            store,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Snapshot found at launch, surfaced before any new session starts.
    pub fn check_offer(&self) -> Result<Option<WorkoutState>> {
        let offer = self.store.load_snapshot()?;
        if let Some(state) = &offer {
            info!(
                session_id = %state.session_id,
                activity_type = %state.activity_type,
                saved_at = %state.saved_at,
                "found orphaned workout snapshot"
            );
        }
        Ok(offer)
    }

    /// User declined recovery: drop the snapshot, start nothing.
    pub fn discard_offer(&self) -> Result<()> {
        self.store.delete_snapshot()
    }

    /// Begin periodic snapshots of the in-progress session.
    ///
    /// Writes one snapshot immediately, then one per interval until stopped.
    /// Replaces any monitor already running.
    pub fn start_monitoring(
        &self,
        manager: Arc<dyn WorkoutSessionManager>,
        presenter_token: Option<String>,
    ) {
        let store = self.store.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                let Some(state) = build_snapshot(manager.as_ref(), presenter_token.clone()) else {
                    debug!("no active session, snapshot skipped");
                    continue;
                };
                if let Err(e) = store.save_snapshot(&state) {
                    warn!(error = %e, "failed to persist recovery snapshot");
                }
            }
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(previous) = task.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Stop the periodic writer. The snapshot on disk is left as-is so a
    /// failed finish can still be recovered at next launch.
    pub fn stop_monitoring(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    /// Clean-shutdown path: stop the writer and remove the snapshot.
    pub fn stop_monitoring_and_clear(&self) -> Result<()> {
        self.stop_monitoring();
        self.store.delete_snapshot()
    }
}

/// Project the manager's current session into a durable snapshot.
fn build_snapshot(
    manager: &dyn WorkoutSessionManager,
    presenter_token: Option<String>,
) -> Option<WorkoutState> {
    let session = manager.session_snapshot()?;
    let last_metrics = manager.metrics_watch().borrow().clone();
    Some(WorkoutState {
        session_id: session.id,
        activity_type: session.activity_type,
        start_time: session.start_time,
        is_active: true,
        is_paused: manager.is_paused(),
        paused_duration_secs: manager.paused_duration_secs(),
        location_samples: session.location_samples,
        heart_rate_samples: session.heart_rate_samples,
        last_metrics: Some(last_metrics),
        presenter_token,
        saved_at: Utc::now(),
    })
}
