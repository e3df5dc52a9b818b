// SPDX-License-Identifier: MIT

//! Sensor session manager: owns the in-progress session aggregate, drains
//! the sensor channel, and finalizes the summary.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::metrics::WorkoutMetricsSnapshot;
use crate::models::session::{ActivityType, WorkoutSession, WorkoutSummary};
use crate::services::location::{LocationProvider, SensorEvent};
use crate::services::metrics::{self, MetricsAggregator};

/// Lifecycle of the sensor session as seen by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerPhase {
    NotStarted,
    Active,
    Paused,
    Completed,
    Failed(String),
}

/// Collaborator contract for the sensor session.
///
/// `pause_workout`/`resume_workout` are synchronous state flips and never
/// fail; repeated calls in the same direction are no-ops. All sample
/// mutation happens on the manager's own drain task, so callers observe
/// snapshots, never partially-applied updates.
#[async_trait]
pub trait WorkoutSessionManager: Send + Sync {
    /// Begin a session: sensor authorization, stream subscription, clock
    /// start. Fails if a session is already in progress.
    async fn start_workout(&self, activity_type: ActivityType) -> Result<()>;

    fn pause_workout(&self);

    fn resume_workout(&self);

    /// Stop the sensors and finalize the immutable summary.
    async fn end_workout(&self) -> Result<WorkoutSummary>;

    /// Stop the sensors and drop all session data; no summary is produced.
    async fn discard_workout(&self);

    /// Latest derived metrics; updated on every accepted sample.
    fn metrics_watch(&self) -> watch::Receiver<WorkoutMetricsSnapshot>;

    /// Manager lifecycle updates.
    fn phase_watch(&self) -> watch::Receiver<ManagerPhase>;

    /// Wall-clock start of the session, once active.
    fn start_time(&self) -> Option<DateTime<Utc>>;

    /// Copy of the session aggregate for recovery snapshots.
    fn session_snapshot(&self) -> Option<WorkoutSession>;

    /// Accumulated paused time in seconds.
    fn paused_duration_secs(&self) -> f64;

    fn is_paused(&self) -> bool;
}

struct ActiveSession {
    session: WorkoutSession,
    aggregator: MetricsAggregator,
    started_at: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl ActiveSession {
    /// Active elapsed time, paused intervals excluded. Frozen while paused.
    fn elapsed_active(&self, now: Instant) -> Duration {
        let reference = self.paused_at.unwrap_or(now);
        reference
            .duration_since(self.started_at)
            .saturating_sub(self.paused_total)
    }
}

struct Inner {
    active: Option<ActiveSession>,
    drain: Option<JoinHandle<()>>,
}

/// Production manager over a [`LocationProvider`].
///
/// Single drain task per session applies the update path sample-by-sample:
/// append, recompute, publish. Location samples arriving while paused are
/// discarded; heart-rate samples are kept.
pub struct TrackedSessionManager {
    provider: Arc<dyn LocationProvider>,
    clock: Arc<dyn Clock>,
    user_weight_kg: f64,
    inner: Arc<Mutex<Inner>>,
    metrics_tx: watch::Sender<WorkoutMetricsSnapshot>,
    phase_tx: watch::Sender<ManagerPhase>,
}

impl TrackedSessionManager {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        clock: Arc<dyn Clock>,
        user_weight_kg: f64,
    ) -> Self {
        let (metrics_tx, _) = watch::channel(WorkoutMetricsSnapshot::default());
        let (phase_tx, _) = watch::channel(ManagerPhase::NotStarted);
        Self {
            provider,
            clock,
            user_weight_kg,
            inner: Arc::new(Mutex::new(Inner {
                active: None,
                drain: None,
            })),
            metrics_tx,
            phase_tx,
        }
    }

    fn spawn_drain(&self, mut rx: tokio::sync::mpsc::Receiver<SensorEvent>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let clock = Arc::clone(&self.clock);
        let metrics_tx = self.metrics_tx.clone();
        let phase_tx = self.phase_tx.clone();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let mut guard = match inner.lock() {
                    Ok(guard) => guard,
                    Err(_) => break,
                };
                let Some(active) = guard.active.as_mut() else {
                    break;
                };

                match event {
                    SensorEvent::Location(sample) => {
                        if active.paused_at.is_some() {
                            continue;
                        }
                        active.session.location_samples.push(sample);
                    }
                    SensorEvent::HeartRate(sample) => {
                        active.session.heart_rate_samples.push(sample);
                    }
                    SensorEvent::Failure(reason) => {
                        warn!(reason = %reason, "sensor stream failed");
                        let _ = phase_tx.send(ManagerPhase::Failed(reason));
                        break;
                    }
                }

                let elapsed = active.elapsed_active(clock.now()).as_secs_f64();
                let snapshot = active.aggregator.compute(&active.session, elapsed);
                let _ = metrics_tx.send(snapshot);
            }
            debug!("sensor drain task finished");
        })
    }

    /// Tear down the drain task and return the finished aggregate.
    async fn take_active(&self) -> Option<ActiveSession> {
        self.provider.stop().await;
        let (active, drain) = {
            let mut guard = self.inner.lock().ok()?;
            (guard.active.take(), guard.drain.take())
        };
        if let Some(handle) = drain {
            handle.abort();
        }
        active
    }
}

#[async_trait]
impl WorkoutSessionManager for TrackedSessionManager {
    async fn start_workout(&self, activity_type: ActivityType) -> Result<()> {
        {
            let guard = self
                .inner
                .lock()
                .map_err(|_| AppError::SessionStart("manager state poisoned".to_string()))?;
            if guard.active.is_some() {
                return Err(AppError::SessionActive);
            }
        }

        self.provider.request_authorization().await?;
        let rx = self.provider.start().await?;

        let session = WorkoutSession::new(
            Uuid::new_v4().to_string(),
            activity_type,
            Utc::now(),
        );
        info!(session_id = %session.id, activity_type = %activity_type, "workout session started");

        let active = ActiveSession {
            aggregator: MetricsAggregator::new(activity_type, self.user_weight_kg),
            session,
            started_at: self.clock.now(),
            paused_at: None,
            paused_total: Duration::ZERO,
        };

        let drain = self.spawn_drain(rx);
        {
            let mut guard = self
                .inner
                .lock()
                .map_err(|_| AppError::SessionStart("manager state poisoned".to_string()))?;
            guard.active = Some(active);
            guard.drain = Some(drain);
        }

        let _ = self.metrics_tx.send(WorkoutMetricsSnapshot::default());
        let _ = self.phase_tx.send(ManagerPhase::Active);
        Ok(())
    }

    fn pause_workout(&self) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        let Some(active) = guard.active.as_mut() else {
            return;
        };
        // Pausing while paused must not reset the pause origin.
        if active.paused_at.is_some() {
            return;
        }
        active.paused_at = Some(self.clock.now());
        let _ = self.phase_tx.send(ManagerPhase::Paused);
    }

    fn resume_workout(&self) {
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        let Some(active) = guard.active.as_mut() else {
            return;
        };
        let Some(paused_at) = active.paused_at.take() else {
            return;
        };
        active.paused_total += self.clock.now().duration_since(paused_at);
        let _ = self.phase_tx.send(ManagerPhase::Active);
    }

    async fn end_workout(&self) -> Result<WorkoutSummary> {
        let Some(mut active) = self.take_active().await else {
            return Err(AppError::NotTracking);
        };

        // Close out a pause left open at finish time.
        if let Some(paused_at) = active.paused_at.take() {
            active.paused_total += self.clock.now().duration_since(paused_at);
        }

        let duration = active.elapsed_active(self.clock.now());
        let duration_seconds = duration.as_secs_f64();
        let session = active.session;
        let distance_meters = metrics::total_distance_meters(&session.location_samples);
        let average_speed_mps = if duration_seconds > 0.0 {
            distance_meters / duration_seconds
        } else {
            0.0
        };
        let final_snapshot = active.aggregator.compute(&session, duration_seconds);

        let summary = WorkoutSummary {
            id: session.id.clone(),
            activity_type: session.activity_type,
            start_time: session.start_time,
            end_time: Utc::now(),
            duration_seconds,
            distance_meters,
            average_pace_secs_per_km: metrics::pace_secs_per_km(distance_meters, duration_seconds),
            average_speed_mps,
            calories: final_snapshot.calories,
            elevation_gain_meters: final_snapshot.elevation_gain_meters,
            average_heart_rate: metrics::average_heart_rate(&session.heart_rate_samples),
            max_heart_rate: metrics::max_heart_rate(&session.heart_rate_samples),
            route: session.location_samples,
        };

        info!(
            session_id = %summary.id,
            duration_seconds = summary.duration_seconds,
            distance_meters = summary.distance_meters,
            "workout session finalized"
        );
        let _ = self.phase_tx.send(ManagerPhase::Completed);
        Ok(summary)
    }

    async fn discard_workout(&self) {
        if let Some(active) = self.take_active().await {
            info!(session_id = %active.session.id, "workout session discarded");
        }
        let _ = self.metrics_tx.send(WorkoutMetricsSnapshot::default());
        let _ = self.phase_tx.send(ManagerPhase::NotStarted);
    }

    fn metrics_watch(&self) -> watch::Receiver<WorkoutMetricsSnapshot> {
        self.metrics_tx.subscribe()
    }

    fn phase_watch(&self) -> watch::Receiver<ManagerPhase> {
        self.phase_tx.subscribe()
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .ok()?
            .active
            .as_ref()
            .map(|a| a.session.start_time)
    }

    fn session_snapshot(&self) -> Option<WorkoutSession> {
        self.inner
            .lock()
            .ok()?
            .active
            .as_ref()
            .map(|a| a.session.clone())
    }

    fn paused_duration_secs(&self) -> f64 {
        let Ok(guard) = self.inner.lock() else {
            return 0.0;
        };
        let Some(active) = guard.active.as_ref() else {
            return 0.0;
        };
        let mut total = active.paused_total;
        if let Some(paused_at) = active.paused_at {
            total += self.clock.now().duration_since(paused_at);
        }
        total.as_secs_f64()
    }

    fn is_paused(&self) -> bool {
        self.inner
            .lock()
            .ok()
            .and_then(|guard| guard.active.as_ref().map(|a| a.paused_at.is_some()))
            .unwrap_or(false)
    }
}
