// SPDX-License-Identifier: MIT

//! Stride-Tracker demo runner
//!
//! Wires the engine against the simulated sensor feed and the configured
//! backend, then drives one short workout through the full lifecycle.

use std::sync::Arc;
use std::time::Duration;

use stride_tracker::{
    config::Config,
    format,
    models::session::ActivityType,
    services::{HttpActivityStore, LogPresenter, SimulatedLocationProvider},
    Engine,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(data_dir = %config.data_dir.display(), "Starting Stride-Tracker engine");

    let provider = Arc::new(SimulatedLocationProvider::new(
        37.7749,
        -122.4194,
        10.0,
        Duration::from_millis(500),
    ));
    let presenter = Arc::new(LogPresenter);
    let remote = Arc::new(HttpActivityStore::new(
        config.backend_base_url.clone(),
        config.backend_api_token.clone(),
    ));

    let engine = Engine::new(config, provider, presenter, remote)?;

    // Surface an orphaned session from a previous run before starting anything.
    if let Some(state) = engine.recovery.check_offer()? {
        tracing::info!(
            session_id = %state.session_id,
            saved_at = %state.saved_at,
            "discarding orphaned workout from previous run"
        );
        engine.tracker.discard_recovery()?;
    }

    let tracker = engine.tracker.clone();
    tracker.start_workout(ActivityType::Running).await?;

    tokio::time::sleep(Duration::from_secs(5)).await;
    tracker.pause_workout();
    tokio::time::sleep(Duration::from_secs(2)).await;
    tracker.resume_workout();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let summary = tracker.finish_workout().await?;
    tracing::info!(
        activity = %summary.activity_type,
        duration = %format::format_duration(summary.duration_seconds),
        distance = %format::format_distance(summary.distance_meters),
        pace = %format::format_pace(summary.average_pace_secs_per_km),
        calories = format!("{:.0}", summary.calories),
        "workout finished"
    );
    tracker.dismiss_summary();

    let history = engine.reconciler.merged_activities().await?;
    tracing::info!(count = history.len(), "activity history");
    for record in &history {
        tracing::info!(
            external_id = %record.external_id,
            source = %record.source,
            start = %format::format_utc_rfc3339(record.start_time),
            distance = %format::format_distance(record.distance_meters),
            synced = record.synced,
            "activity"
        );
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stride_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
