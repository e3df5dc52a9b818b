// SPDX-License-Identifier: MIT

//! Workout session state machine.
//!
//! Single writer of the published [`SessionPhase`]: countdown, tracking,
//! pause/resume, finish and discard all funnel through here, as do the
//! fan-outs to the recovery handler, the live-status presenter and the
//! reconciliation component.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::metrics::WorkoutMetricsSnapshot;
use crate::models::session::{ActivityType, SessionPhase, WorkoutSummary};
use crate::services::manager::{ManagerPhase, WorkoutSessionManager};
use crate::services::presenter::{LiveStatusPresenter, PresenterThrottle};
use crate::services::reconcile::ActivityReconciler;
use crate::services::recovery::RecoveryHandler;

/// Delay between countdown ticks.
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Orchestrates one workout session at a time.
///
/// All phase mutations happen through this type; collaborators only ever
/// observe. Presenter and recovery pushes are best-effort mirrors of the
/// latest metrics, never sources of truth.
pub struct SessionTracker {
    manager: Arc<dyn WorkoutSessionManager>,
    presenter: Arc<dyn LiveStatusPresenter>,
    recovery: Arc<RecoveryHandler>,
    reconciler: Arc<ActivityReconciler>,
    throttle: Arc<PresenterThrottle>,
    phase_tx: watch::Sender<SessionPhase>,
    presenter_token: Mutex<Option<String>>,
    relay: Mutex<Option<JoinHandle<()>>>,
    countdown_tick: Duration,
}

impl SessionTracker {
    pub fn new(
        manager: Arc<dyn WorkoutSessionManager>,
        presenter: Arc<dyn LiveStatusPresenter>,
        recovery: Arc<RecoveryHandler>,
        reconciler: Arc<ActivityReconciler>,
        clock: Arc<dyn Clock>,
        presenter_min_gap: Duration,
    ) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Idle);
        Self {
            manager,
            presenter,
            recovery,
            reconciler,
            throttle: Arc::new(PresenterThrottle::new(clock, presenter_min_gap)),
            phase_tx,
            presenter_token: Mutex::new(None),
            relay: Mutex::new(None),
            countdown_tick: COUNTDOWN_TICK,
        }
    }

    /// Shorten the countdown tick; test hook.
    pub fn with_countdown_tick(mut self, tick: Duration) -> Self {
        self.countdown_tick = tick;
        self
    }

    /// Subscribe to phase changes.
    pub fn phase_watch(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    pub fn current_phase(&self) -> SessionPhase {
        self.phase_tx.borrow().clone()
    }

    fn publish(&self, phase: SessionPhase) {
        debug!(phase = ?std::mem::discriminant(&phase), "session phase change");
        let _ = self.phase_tx.send(phase);
    }

    /// Start a new session: countdown, sensor start, presenter and
    /// recovery hookup.
    ///
    /// Rejected while a session is active, and while an unresolved
    /// recovery offer is pending.
    pub async fn start_workout(&self, activity_type: ActivityType) -> Result<()> {
        if !self.current_phase().can_start() {
            return Err(AppError::SessionActive);
        }
        if self.recovery.check_offer()?.is_some() {
            return Err(AppError::SessionStart(
                "resolve the pending recovery offer first".to_string(),
            ));
        }

        info!(activity_type = %activity_type, "starting workout");
        self.publish(SessionPhase::Preparing);

        // Fixed 3-2-1 descent, one cooperative delay per tick.
        for tick in (1..=3u8).rev() {
            self.publish(SessionPhase::Countdown(tick));
            tokio::time::sleep(self.countdown_tick).await;
        }

        if let Err(e) = self.manager.start_workout(activity_type).await {
            error!(error = %e, "workout start failed");
            self.publish(SessionPhase::Error(e.to_string()));
            return Err(e);
        }

        let start_time = self.manager.start_time().unwrap_or_else(chrono::Utc::now);
        let token = self
            .presenter
            .start_if_possible(activity_type, start_time)
            .await;
        if let Ok(mut slot) = self.presenter_token.lock() {
            *slot = token.clone();
        }

        self.recovery
            .start_monitoring(Arc::clone(&self.manager), token);
        self.throttle.reset();
        self.spawn_relay();

        self.publish(SessionPhase::Tracking);
        Ok(())
    }

    /// Pause tracking. No-op unless currently tracking.
    pub fn pause_workout(&self) {
        if self.current_phase() != SessionPhase::Tracking {
            return;
        }
        self.manager.pause_workout();
        self.publish(SessionPhase::Paused);
        self.push_presenter_update(true);
    }

    /// Resume from pause. No-op unless currently paused.
    pub fn resume_workout(&self) {
        if self.current_phase() != SessionPhase::Paused {
            return;
        }
        self.manager.resume_workout();
        self.publish(SessionPhase::Tracking);
        self.push_presenter_update(false);
    }

    /// Finish the session and settle into the summary phase.
    ///
    /// Presenter teardown, snapshot deletion and the reconciliation handoff
    /// all complete before the phase becomes `Summary`.
    pub async fn finish_workout(&self) -> Result<WorkoutSummary> {
        if !self.current_phase().is_tracking() {
            return Err(AppError::NotTracking);
        }
        self.publish(SessionPhase::Finishing);
        self.stop_relay();

        let summary = match self.manager.end_workout().await {
            Ok(summary) => summary,
            Err(e) => {
                // Keep the snapshot on disk so the next launch can offer
                // recovery of the interrupted session.
                self.recovery.stop_monitoring();
                error!(error = %e, "workout finish failed");
                self.publish(SessionPhase::Error(e.to_string()));
                return Err(e);
            }
        };

        self.presenter.end_if_possible(&final_metrics(&summary)).await;
        if let Ok(mut slot) = self.presenter_token.lock() {
            *slot = None;
        }

        if let Err(e) = self.recovery.stop_monitoring_and_clear() {
            warn!(error = %e, "failed to clear recovery snapshot");
        }

        match self.reconciler.record_finished(&summary) {
            Ok(_) => {
                let reconciler = Arc::clone(&self.reconciler);
                // Sync runs detached; the caller never waits on the network.
                tokio::spawn(async move {
                    let report = reconciler.sync_pending().await;
                    debug!(synced = report.synced, failed = report.failed, "background sync done");
                });
            }
            Err(e) => warn!(error = %e, "failed to record finished workout"),
        }

        self.publish(SessionPhase::Summary(summary.clone()));
        Ok(summary)
    }

    /// Drop the session without a summary and return to idle.
    ///
    /// Sensor streams are stopped before this returns; presenter and
    /// snapshot teardown run as a background effect.
    pub async fn discard_workout(&self) {
        if !self.current_phase().is_tracking() {
            return;
        }
        self.stop_relay();
        self.publish(SessionPhase::Idle);
        self.manager.discard_workout().await;

        let presenter = Arc::clone(&self.presenter);
        let recovery = Arc::clone(&self.recovery);
        if let Ok(mut slot) = self.presenter_token.lock() {
            *slot = None;
        }
        tokio::spawn(async move {
            presenter.discard_immediately().await;
            if let Err(e) = recovery.stop_monitoring_and_clear() {
                warn!(error = %e, "failed to clear recovery snapshot");
            }
        });
        info!("workout discarded");
    }

    /// Force the error phase from anywhere.
    pub fn handle_error(&self, message: impl Into<String>) {
        self.publish(SessionPhase::Error(message.into()));
    }

    /// Leave the summary phase.
    pub fn dismiss_summary(&self) {
        if matches!(self.current_phase(), SessionPhase::Summary(_)) {
            self.publish(SessionPhase::Idle);
        }
    }

    /// Leave the error phase, releasing whatever the session still held.
    pub async fn dismiss_error(&self) {
        if !matches!(self.current_phase(), SessionPhase::Error(_)) {
            return;
        }
        self.stop_relay();
        self.recovery.stop_monitoring();
        self.manager.discard_workout().await;
        self.publish(SessionPhase::Idle);
    }

    /// Accept the launch-time recovery offer: drop the stale snapshot and
    /// start a fresh session of the recovered activity type.
    pub async fn recover_workout(&self) -> Result<()> {
        let Some(state) = self.recovery.check_offer()? else {
            return Err(AppError::SessionStart(
                "no recovery snapshot to restore".to_string(),
            ));
        };
        // The stale snapshot goes first so the offer can never repeat.
        self.recovery.discard_offer()?;
        info!(
            session_id = %state.session_id,
            activity_type = %state.activity_type,
            "recovering interrupted workout"
        );
        self.start_workout(state.activity_type).await
    }

    /// Decline the launch-time recovery offer.
    pub fn discard_recovery(&self) -> Result<()> {
        self.recovery.discard_offer()
    }

    /// Relay manager metrics to the presenter (throttled) and watch for
    /// sensor failures.
    fn spawn_relay(&self) {
        let mut metrics_rx = self.manager.metrics_watch();
        let mut phase_rx = self.manager.phase_watch();
        let manager = Arc::clone(&self.manager);
        let presenter = Arc::clone(&self.presenter);
        let recovery = Arc::clone(&self.recovery);
        let throttle = Arc::clone(&self.throttle);
        let phase_tx = self.phase_tx.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = metrics_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = metrics_rx.borrow_and_update().clone();
                        if throttle.allow() {
                            presenter
                                .update_if_possible(&snapshot, manager.is_paused())
                                .await;
                        }
                    }
                    changed = phase_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let phase = phase_rx.borrow_and_update().clone();
                        if let ManagerPhase::Failed(reason) = phase {
                            warn!(reason = %reason, "sensor failure ends session");
                            recovery.stop_monitoring();
                            presenter.discard_immediately().await;
                            let _ = phase_tx.send(SessionPhase::Error(reason));
                            break;
                        }
                    }
                }
            }
            debug!("metrics relay finished");
        });

        if let Ok(mut relay) = self.relay.lock() {
            if let Some(previous) = relay.replace(handle) {
                previous.abort();
            }
        }
    }

    fn stop_relay(&self) {
        if let Ok(mut relay) = self.relay.lock() {
            if let Some(handle) = relay.take() {
                handle.abort();
            }
        }
    }

    /// Detached, unthrottled push so pause-flag flips show immediately.
    fn push_presenter_update(&self, is_paused: bool) {
        let presenter = Arc::clone(&self.presenter);
        let snapshot = self.manager.metrics_watch().borrow().clone();
        tokio::spawn(async move {
            presenter.update_if_possible(&snapshot, is_paused).await;
        });
    }
}

/// Condensed final frame for the presenter, derived from the summary.
fn final_metrics(summary: &WorkoutSummary) -> WorkoutMetricsSnapshot {
    WorkoutMetricsSnapshot {
        elapsed_seconds: summary.duration_seconds,
        distance_meters: summary.distance_meters,
        current_pace_secs_per_km: summary.average_pace_secs_per_km,
        average_pace_secs_per_km: summary.average_pace_secs_per_km,
        current_speed_mps: summary.average_speed_mps,
        calories: summary.calories,
        elevation_gain_meters: summary.elevation_gain_meters,
        current_heart_rate: None,
    }
}
