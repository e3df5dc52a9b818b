// SPDX-License-Identifier: MIT

//! Reconciliation of device-local workout history with the remote backend:
//! de-duplicated merge, local-first deletion, best-effort sync.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::activity::{ActivityRecord, HiddenIds};
use crate::models::session::WorkoutSummary;
use crate::services::remote::RemoteActivityStore;
use crate::store::{keys, KvStore};

/// How far back remote history is fetched when building the merged list.
const HISTORY_WINDOW_DAYS: i64 = 365;

/// Merges local and remote activity lists and owns the durable hidden-id
/// set and local record list.
///
/// Both durable documents are single-writer (this component) and re-read
/// on every operation rather than cached, so a restart always observes the
/// persisted truth.
pub struct ActivityReconciler {
    kv: Arc<dyn KvStore>,
    remote: Arc<dyn RemoteActivityStore>,
}

impl ActivityReconciler {
    pub fn new(kv: Arc<dyn KvStore>, remote: Arc<dyn RemoteActivityStore>) -> Self {
        Self { kv, remote }
    }

    /// Record a freshly finished workout as an unsynced device activity.
    pub fn record_finished(&self, summary: &WorkoutSummary) -> Result<ActivityRecord> {
        let record = ActivityRecord::from_summary(summary);
        let mut local = self.local_activities()?;
        local.retain(|r| r.external_id != record.external_id);
        local.push(record.clone());
        self.save_local_activities(&local)?;
        info!(
            local_id = %record.local_id,
            external_id = %record.external_id,
            "recorded finished workout"
        );
        Ok(record)
    }

    /// The user-visible, de-duplicated activity list.
    ///
    /// Remote fetch failures degrade to the local list; they never error
    /// out of the merge.
    pub async fn merged_activities(&self) -> Result<Vec<ActivityRecord>> {
        let before = Utc::now();
        let after = before - Duration::days(HISTORY_WINDOW_DAYS);
        let remote = match self.remote.fetch_activities(after, before).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "remote fetch failed, merging local history only");
                Vec::new()
            }
        };

        let local = self.local_activities()?;
        let hidden = self.hidden_ids()?;
        Ok(merge_records(remote, local, &hidden))
    }

    /// Delete an activity, local-first.
    ///
    /// The record is hidden and persisted before the remote delete is even
    /// attempted; a remote failure is returned to the caller but the local
    /// hide stands regardless.
    pub async fn delete_activity(&self, record: &ActivityRecord) -> Result<()> {
        let mut hidden = self.hidden_ids()?;
        hidden.hide(record);
        self.save_hidden_ids(&hidden)?;

        let mut local = self.local_activities()?;
        local.retain(|r| r.local_id != record.local_id);
        self.save_local_activities(&local)?;
        info!(local_id = %record.local_id, "activity hidden locally");

        if let Some(remote_id) = &record.remote_id {
            if let Err(e) = self.remote.delete_activity(remote_id).await {
                warn!(remote_id = %remote_id, error = %e, "remote delete failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Push unsynced device records to the backend.
    ///
    /// Each success marks the record synced with its remote id; failures
    /// leave the record queued for the next call. Never fails the caller.
    pub async fn sync_pending(&self) -> SyncReport {
        let (pending, hidden) = match (self.local_activities(), self.hidden_ids()) {
            (Ok(local), Ok(hidden)) => (local, hidden),
            _ => return SyncReport::default(),
        };

        let mut report = SyncReport::default();
        let mut updated = pending.clone();
        for record in pending {
            if record.synced || hidden.contains(&record) {
                continue;
            }
            match self.remote.create_activity(&record).await {
                Ok(created) => {
                    if let Some(entry) = updated.iter_mut().find(|r| r.local_id == record.local_id)
                    {
                        entry.remote_id = created.remote_id.clone();
                        entry.synced = true;
                    }
                    report.synced += 1;
                }
                Err(e) => {
                    if e.is_rate_limit() {
                        warn!("sync rate limited, leaving remaining records queued");
                        report.failed += 1;
                        break;
                    }
                    warn!(local_id = %record.local_id, error = %e, "sync failed, record stays queued");
                    report.failed += 1;
                }
            }
        }

        if report.synced > 0 {
            if let Err(e) = self.save_local_activities(&updated) {
                warn!(error = %e, "failed to persist sync results");
            }
        }
        report
    }

    /// Forget all hidden ids (sign-out path).
    pub fn clear_hidden(&self) -> Result<()> {
        self.kv.delete(keys::HIDDEN_IDS)
    }

    /// Persisted hidden-id set; always re-read from storage.
    pub fn hidden_ids(&self) -> Result<HiddenIds> {
        match self.kv.get(keys::HIDDEN_IDS)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| AppError::Storage(format!("parse hidden ids: {}", e))),
            None => Ok(HiddenIds::default()),
        }
    }

    /// Persisted device-local records; always re-read from storage.
    pub fn local_activities(&self) -> Result<Vec<ActivityRecord>> {
        match self.kv.get(keys::LOCAL_ACTIVITIES)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| AppError::Storage(format!("parse local activities: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    fn save_hidden_ids(&self, hidden: &HiddenIds) -> Result<()> {
        let json = serde_json::to_string(hidden)
            .map_err(|e| AppError::Storage(format!("serialize hidden ids: {}", e)))?;
        self.kv.set(keys::HIDDEN_IDS, &json)
    }

    fn save_local_activities(&self, records: &[ActivityRecord]) -> Result<()> {
        let json = serde_json::to_string(records)
            .map_err(|e| AppError::Storage(format!("serialize local activities: {}", e)))?;
        self.kv.set(keys::LOCAL_ACTIVITIES, &json)
    }
}

/// Outcome of one `sync_pending` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Merge remote and local records into one de-duplicated list.
///
/// Remote records come first and win every `external_id` collision; local
/// records the backend does not know yet are appended after. Records in the
/// hidden set never appear.
pub fn merge_records(
    remote: Vec<ActivityRecord>,
    local: Vec<ActivityRecord>,
    hidden: &HiddenIds,
) -> Vec<ActivityRecord> {
    let remote_external_ids: HashSet<String> =
        remote.iter().map(|r| r.external_id.clone()).collect();

    let mut merged: Vec<ActivityRecord> = remote
        .into_iter()
        .filter(|r| !hidden.contains(r))
        .collect();

    merged.extend(
        local
            .into_iter()
            .filter(|r| !remote_external_ids.contains(&r.external_id))
            .filter(|r| !hidden.contains(r)),
    );
    merged
}

/// Sort key helper: newest first, the usual history presentation order.
pub fn sort_newest_first(records: &mut [ActivityRecord]) {
    records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}
