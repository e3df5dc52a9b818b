// SPDX-License-Identifier: MIT

//! Raw sensor stream collaborator: ordered delivery of location and
//! heart-rate samples over a single channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::models::metrics::{HeartRateSample, LocationSample};

/// One event delivered by the sensor layer, in arrival order.
///
/// Samples that fail the provider's accuracy gate are dropped before they
/// are put on the channel; consumers never see them.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Location(LocationSample),
    HeartRate(HeartRateSample),
    /// Unrecoverable sensor failure; the session transitions to its error
    /// state and no further events follow.
    Failure(String),
}

/// Source of raw location and heart-rate samples.
///
/// Implementations push every event through the single receiver returned by
/// `start`, preserving arrival order. `stop` must unsubscribe the underlying
/// sensor session, not merely drop the channel.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask the platform for sensor authorization.
    ///
    /// Returns `AppError::Authorization` when permission is denied or
    /// restricted; there is no automatic retry.
    async fn request_authorization(&self) -> Result<()>;

    /// Begin sample delivery. Only one delivery stream is active at a time;
    /// starting again replaces the previous stream.
    async fn start(&self) -> Result<mpsc::Receiver<SensorEvent>>;

    /// Stop sample delivery and release the sensor subscription.
    async fn stop(&self);
}

/// Deterministic provider that walks due east at a constant speed.
///
/// Stands in for platform sensors in the demo binary: emits one location
/// sample per tick and a heart-rate reading every other tick.
pub struct SimulatedLocationProvider {
    start_latitude: f64,
    start_longitude: f64,
    altitude_m: f64,
    step_meters: f64,
    tick: Duration,
    running: Arc<AtomicBool>,
}

/// Approximate meters per degree of longitude near the configured latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

impl SimulatedLocationProvider {
    pub fn new(start_latitude: f64, start_longitude: f64, step_meters: f64, tick: Duration) -> Self {
        Self {
            start_latitude,
            start_longitude,
            altitude_m: 30.0,
            step_meters,
            tick,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl LocationProvider for SimulatedLocationProvider {
    async fn request_authorization(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<mpsc::Receiver<SensorEvent>> {
        let (tx, rx) = mpsc::channel(64);
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let lat = self.start_latitude;
        let lon_scale = METERS_PER_DEGREE * lat.to_radians().cos();
        let start_lon = self.start_longitude;
        let altitude_m = self.altitude_m;
        let step = self.step_meters;
        let tick = self.tick;

        tokio::spawn(async move {
            let mut n: u64 = 0;
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(tick).await;
                n += 1;
                let sample = LocationSample {
                    latitude: lat,
                    longitude: start_lon + (n as f64 * step) / lon_scale,
                    altitude_m,
                    timestamp: Utc::now(),
                };
                if tx.send(SensorEvent::Location(sample)).await.is_err() {
                    break;
                }
                if n % 2 == 0 {
                    let hr = HeartRateSample {
                        bpm: 120 + (n % 20) as u16,
                        timestamp: Utc::now(),
                    };
                    if tx.send(SensorEvent::HeartRate(hr)).await.is_err() {
                        break;
                    }
                }
            }
            debug!("simulated sensor stream stopped");
        });

        Ok(rx)
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_provider_emits_ordered_locations() {
        let provider = SimulatedLocationProvider::new(37.4, -122.2, 10.0, Duration::from_millis(5));
        let mut rx = provider.start().await.expect("start");

        let mut longitudes = Vec::new();
        while longitudes.len() < 3 {
            match rx.recv().await.expect("event") {
                SensorEvent::Location(sample) => longitudes.push(sample.longitude),
                SensorEvent::HeartRate(_) => {}
                SensorEvent::Failure(reason) => panic!("unexpected failure: {reason}"),
            }
        }
        provider.stop().await;

        assert!(longitudes.windows(2).all(|w| w[1] > w[0]));
    }

    #[tokio::test]
    async fn test_stop_ends_delivery() {
        let provider = SimulatedLocationProvider::new(0.0, 0.0, 5.0, Duration::from_millis(1));
        let mut rx = provider.start().await.expect("start");
        let _ = rx.recv().await;

        provider.stop().await;
        // Drain whatever was in flight; the channel must then close.
        while rx.recv().await.is_some() {}
    }
}
