// SPDX-License-Identifier: MIT

//! Full-stack session lifecycle tests: real session manager, real state
//! machine, real file-backed storage, scripted sensors and backend.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use stride_tracker::clock::{Clock, MockClock};
use stride_tracker::config::Config;
use stride_tracker::error::AppError;
use stride_tracker::models::metrics::WorkoutMetricsSnapshot;
use stride_tracker::models::session::{ActivityType, SessionPhase};
use stride_tracker::services::{
    ActivityReconciler, LocationProvider, NoopPresenter, RecoveryHandler, RecoveryStore,
    SensorEvent, SessionTracker, TrackedSessionManager, WorkoutSessionManager,
};
use stride_tracker::store::{FileKvStore, KvStore};
use stride_tracker::Engine;

use common::{sample_east_50m, temp_dir, ScriptedProvider, ScriptedRemote};

struct Stack {
    tracker: SessionTracker,
    manager: Arc<TrackedSessionManager>,
    provider: Arc<ScriptedProvider>,
    clock: Arc<MockClock>,
    recovery: Arc<RecoveryHandler>,
    reconciler: Arc<ActivityReconciler>,
    remote: Arc<ScriptedRemote>,
    dir: PathBuf,
}

impl Drop for Stack {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn stack() -> Stack {
    let dir = temp_dir();
    let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(&dir).unwrap());
    let provider = Arc::new(ScriptedProvider::new());
    let clock = Arc::new(MockClock::new());
    let remote = ScriptedRemote::new();

    let manager = Arc::new(TrackedSessionManager::new(
        provider.clone() as Arc<dyn LocationProvider>,
        clock.clone() as Arc<dyn Clock>,
        70.0,
    ));
    let recovery = Arc::new(RecoveryHandler::new(
        RecoveryStore::new(kv.clone()),
        Duration::from_millis(10),
    ));
    let reconciler = Arc::new(ActivityReconciler::new(kv, remote.clone()));
    let tracker = SessionTracker::new(
        manager.clone(),
        Arc::new(NoopPresenter),
        recovery.clone(),
        reconciler.clone(),
        clock.clone() as Arc<dyn Clock>,
        Duration::from_millis(1),
    )
    .with_countdown_tick(Duration::from_millis(10));

    Stack {
        tracker,
        manager,
        provider,
        clock,
        recovery,
        reconciler,
        remote,
        dir,
    }
}

async fn wait_for_distance(manager: &TrackedSessionManager, at_least: f64) -> WorkoutMetricsSnapshot {
    let mut rx = manager.metrics_watch();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.distance_meters >= at_least {
            return snapshot;
        }
        rx.changed().await.expect("metrics channel open");
    }
}

#[tokio::test]
async fn test_workout_accumulates_150m_over_20s() {
    let s = stack();
    s.tracker.start_workout(ActivityType::Running).await.unwrap();
    assert_eq!(s.tracker.current_phase(), SessionPhase::Tracking);

    let feed = s.provider.feed();
    let base = Utc::now();
    for n in 0..4u64 {
        feed.send(SensorEvent::Location(sample_east_50m(
            n,
            base + chrono::Duration::seconds(5 * n as i64),
        )))
        .await
        .unwrap();
    }
    let live = wait_for_distance(&s.manager, 149.0).await;
    assert!((live.distance_meters - 150.0).abs() < 1.0);

    s.clock.advance_secs(20);
    let summary = s.tracker.finish_workout().await.expect("summary");
    assert!((summary.distance_meters - 150.0).abs() < 1.0);
    assert!((summary.duration_seconds - 20.0).abs() < 0.5);
    let pace = summary.average_pace_secs_per_km.expect("pace available");
    // 20 s over 150 m is about 133 s/km.
    assert!((pace - 133.3).abs() < 2.0);
    assert!(matches!(s.tracker.current_phase(), SessionPhase::Summary(_)));

    // Background sync pushes the record and marks it synced.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let local = s.reconciler.local_activities().unwrap();
    assert_eq!(local.len(), 1);
    assert!(local[0].synced);
    assert_eq!(
        local[0].remote_id.as_deref(),
        Some(format!("rem-{}", summary.id).as_str())
    );
    assert_eq!(s.remote.created.lock().unwrap().len(), 1);

    // Clean finish leaves no recovery snapshot behind.
    assert!(s.recovery.check_offer().unwrap().is_none());
}

#[tokio::test]
async fn test_pause_freezes_distance_until_resume() {
    let s = stack();
    s.tracker.start_workout(ActivityType::Running).await.unwrap();
    let feed = s.provider.feed();
    let base = Utc::now();

    feed.send(SensorEvent::Location(sample_east_50m(0, base)))
        .await
        .unwrap();
    feed.send(SensorEvent::Location(sample_east_50m(1, base)))
        .await
        .unwrap();
    wait_for_distance(&s.manager, 49.0).await;

    s.tracker.pause_workout();
    assert_eq!(s.tracker.current_phase(), SessionPhase::Paused);
    feed.send(SensorEvent::Location(sample_east_50m(3, base)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    s.tracker.resume_workout();
    s.clock.advance_secs(10);
    let summary = s.tracker.finish_workout().await.expect("summary");
    // The paused-phase sample never entered the route.
    assert!((summary.distance_meters - 50.0).abs() < 1.0);
    assert_eq!(summary.route.len(), 2);
}

#[tokio::test]
async fn test_discard_leaves_no_trace() {
    let s = stack();
    s.tracker.start_workout(ActivityType::Cycling).await.unwrap();
    let feed = s.provider.feed();
    feed.send(SensorEvent::Location(sample_east_50m(1, Utc::now())))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    s.tracker.discard_workout().await;
    assert_eq!(s.tracker.current_phase(), SessionPhase::Idle);
    assert!(s.manager.session_snapshot().is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(s.recovery.check_offer().unwrap().is_none());
    assert!(s.reconciler.local_activities().unwrap().is_empty());
    assert!(s.remote.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_sensor_failure_surfaces_error_phase() {
    let s = stack();
    s.tracker.start_workout(ActivityType::Hiking).await.unwrap();
    let mut phases = s.tracker.phase_watch();

    s.provider
        .feed()
        .send(SensorEvent::Failure("gps signal lost".to_string()))
        .await
        .unwrap();

    loop {
        phases.changed().await.expect("phase channel open");
        let phase = phases.borrow_and_update().clone();
        if let SessionPhase::Error(message) = phase {
            assert_eq!(message, "gps signal lost");
            break;
        }
    }

    s.tracker.dismiss_error().await;
    assert_eq!(s.tracker.current_phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_engine_wires_a_working_stack() {
    let dir = temp_dir();
    let config = Config {
        data_dir: dir.clone(),
        ..Config::default()
    };
    let provider = Arc::new(ScriptedProvider::new());
    let remote = ScriptedRemote::new();
    let engine = Engine::new(
        config,
        provider.clone(),
        Arc::new(NoopPresenter),
        remote.clone(),
    )
    .expect("engine");

    assert!(engine.recovery.check_offer().unwrap().is_none());
    engine
        .tracker
        .start_workout(ActivityType::Walking)
        .await
        .unwrap();

    let feed = provider.feed();
    let base = Utc::now();
    for n in 0..2u64 {
        feed.send(SensorEvent::Location(sample_east_50m(n, base)))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let summary = engine.tracker.finish_workout().await.expect("summary");
    assert!((summary.distance_meters - 50.0).abs() < 1.0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let history = engine.reconciler.merged_activities().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].local_id, summary.id);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_finish_without_session_is_rejected() {
    let s = stack();
    assert!(matches!(
        s.tracker.finish_workout().await,
        Err(AppError::NotTracking)
    ));
}
