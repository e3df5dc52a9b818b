// SPDX-License-Identifier: MIT

//! Live-status presenter: best-effort push of condensed metrics to an
//! OS-level glanceable surface.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::format::{format_distance, format_duration, format_pace};
use crate::models::metrics::WorkoutMetricsSnapshot;
use crate::models::session::ActivityType;

/// Glanceable display surface consumed by the state machine.
///
/// Every method is fire-and-forget: failures are absorbed here and never
/// surface to the session. A platform without the surface no-ops.
#[async_trait]
pub trait LiveStatusPresenter: Send + Sync {
    /// Try to start a live surface; returns its token when one was created.
    async fn start_if_possible(
        &self,
        activity_type: ActivityType,
        start_time: DateTime<Utc>,
    ) -> Option<String>;

    /// Push the latest condensed metrics and pause flag.
    async fn update_if_possible(&self, metrics: &WorkoutMetricsSnapshot, is_paused: bool);

    /// Close the surface with the final metrics.
    async fn end_if_possible(&self, final_metrics: &WorkoutMetricsSnapshot);

    /// Tear the surface down without a final frame (discard path).
    async fn discard_immediately(&self);
}

/// Presenter for platforms without a live-status surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPresenter;

#[async_trait]
impl LiveStatusPresenter for NoopPresenter {
    async fn start_if_possible(
        &self,
        _activity_type: ActivityType,
        _start_time: DateTime<Utc>,
    ) -> Option<String> {
        None
    }

    async fn update_if_possible(&self, _metrics: &WorkoutMetricsSnapshot, _is_paused: bool) {}

    async fn end_if_possible(&self, _final_metrics: &WorkoutMetricsSnapshot) {}

    async fn discard_immediately(&self) {}
}

/// Presenter that renders the surface as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

#[async_trait]
impl LiveStatusPresenter for LogPresenter {
    async fn start_if_possible(
        &self,
        activity_type: ActivityType,
        start_time: DateTime<Utc>,
    ) -> Option<String> {
        let token = Uuid::new_v4().to_string();
        info!(
            token = %token,
            activity_type = %activity_type,
            start_time = %start_time,
            "live status started"
        );
        Some(token)
    }

    async fn update_if_possible(&self, metrics: &WorkoutMetricsSnapshot, is_paused: bool) {
        info!(
            elapsed = %format_duration(metrics.elapsed_seconds),
            distance = %format_distance(metrics.distance_meters),
            pace = %format_pace(metrics.current_pace_secs_per_km),
            paused = is_paused,
            "live status update"
        );
    }

    async fn end_if_possible(&self, final_metrics: &WorkoutMetricsSnapshot) {
        info!(
            elapsed = %format_duration(final_metrics.elapsed_seconds),
            distance = %format_distance(final_metrics.distance_meters),
            "live status ended"
        );
    }

    async fn discard_immediately(&self) {
        info!("live status discarded");
    }
}

/// Minimum-gap throttle for presenter pushes.
///
/// The first push after the gap wins; pushes inside the gap are dropped,
/// not queued.
pub struct PresenterThrottle {
    clock: Arc<dyn Clock>,
    min_gap: Duration,
    last_push: Mutex<Option<Instant>>,
}

impl PresenterThrottle {
    pub fn new(clock: Arc<dyn Clock>, min_gap: Duration) -> Self {
        Self {
            clock,
            min_gap,
            last_push: Mutex::new(None),
        }
    }

    /// Whether a push may go out now; records the push time when allowed.
    pub fn allow(&self) -> bool {
        let now = self.clock.now();
        let Ok(mut last) = self.last_push.lock() else {
            return false;
        };
        match *last {
            Some(previous) if now.duration_since(previous) < self.min_gap => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Forget the last push so the next one goes out immediately.
    pub fn reset(&self) {
        if let Ok(mut last) = self.last_push.lock() {
            *last = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    #[test]
    fn test_throttle_drops_pushes_inside_gap() {
        let clock = Arc::new(MockClock::new());
        let throttle = PresenterThrottle::new(clock.clone(), Duration::from_secs(1));

        assert!(throttle.allow());
        assert!(!throttle.allow());

        clock.advance(Duration::from_millis(500));
        assert!(!throttle.allow());

        clock.advance(Duration::from_millis(500));
        assert!(throttle.allow());
    }

    #[test]
    fn test_throttle_reset_allows_immediate_push() {
        let clock = Arc::new(MockClock::new());
        let throttle = PresenterThrottle::new(clock, Duration::from_secs(5));

        assert!(throttle.allow());
        throttle.reset();
        assert!(throttle.allow());
    }

    #[tokio::test]
    async fn test_log_presenter_hands_out_tokens() {
        let presenter = LogPresenter;
        let token = presenter
            .start_if_possible(ActivityType::Running, Utc::now())
            .await
            .expect("token");
        assert!(!token.is_empty());
        presenter
            .update_if_possible(&WorkoutMetricsSnapshot::default(), false)
            .await;
        presenter
            .end_if_possible(&WorkoutMetricsSnapshot::default())
            .await;
    }
}
