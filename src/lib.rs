// SPDX-License-Identifier: MIT

//! Stride-Tracker: live workout tracking engine
//!
//! This crate provides the session lifecycle, metrics aggregation, crash
//! recovery, and backend reconciliation for a GPS workout tracker.

pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use clock::SystemClock;
use config::Config;
use error::Result;
use services::{
    ActivityReconciler, LiveStatusPresenter, LocationProvider, RecoveryHandler, RecoveryStore,
    RemoteActivityStore, SessionTracker, TrackedSessionManager,
};
use store::{FileKvStore, KvStore};

/// Fully wired tracking engine.
///
/// Owns the durable store and every service built on top of it. The sensor,
/// presenter, and backend ports are injected so hosts and tests can swap
/// them freely.
pub struct Engine {
    pub config: Config,
    pub tracker: Arc<SessionTracker>,
    pub reconciler: Arc<ActivityReconciler>,
    pub recovery: Arc<RecoveryHandler>,
}

impl Engine {
    pub fn new(
        config: Config,
        provider: Arc<dyn LocationProvider>,
        presenter: Arc<dyn LiveStatusPresenter>,
        remote: Arc<dyn RemoteActivityStore>,
    ) -> Result<Self> {
        let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(&config.data_dir)?);
        let clock = Arc::new(SystemClock);

        let manager = Arc::new(TrackedSessionManager::new(
            provider,
            clock.clone(),
            config.user_weight_kg,
        ));
        let recovery = Arc::new(RecoveryHandler::new(
            RecoveryStore::new(kv.clone()),
            Duration::from_secs(config.snapshot_interval_secs),
        ));
        let reconciler = Arc::new(ActivityReconciler::new(kv, remote));
        let tracker = Arc::new(SessionTracker::new(
            manager,
            presenter,
            recovery.clone(),
            reconciler.clone(),
            clock,
            Duration::from_millis(config.presenter_min_gap_ms),
        ));

        Ok(Self {
            config,
            tracker,
            reconciler,
            recovery,
        })
    }
}
