// SPDX-License-Identifier: MIT

//! Remote activity backend client.
//!
//! Handles:
//! - Activity creation and deletion
//! - History fetching over a date range
//! - Batch sync of unsynced device records
//! - Rate limit and auth-failure detection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::activity::{ActivityRecord, RouteCoordinate};
use crate::models::session::ActivityType;

/// Polyline precision used on the wire (1e-5 degrees).
const POLYLINE_PRECISION: u32 = 5;

/// Result of a batch sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SyncOutcome {
    /// Records newly created on the backend.
    pub synced_count: usize,
    /// Records the backend already knew by `external_id`.
    pub duplicate_count: usize,
}

/// Backend store for activity records.
///
/// Every failure here is non-fatal to the session: callers log and move on,
/// local state is never rolled back on a remote error.
#[async_trait]
pub trait RemoteActivityStore: Send + Sync {
    /// Create one activity; returns the record with its remote id assigned.
    async fn create_activity(&self, record: &ActivityRecord) -> Result<ActivityRecord>;

    /// Delete an activity by its backend identifier.
    async fn delete_activity(&self, remote_id: &str) -> Result<()>;

    /// Fetch remote history within `[after, before]`.
    async fn fetch_activities(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;

    /// Batch-sync device records the backend may not have yet.
    async fn sync_activities(&self, records: &[ActivityRecord]) -> Result<SyncOutcome>;
}

/// HTTP client for the activity backend.
#[derive(Clone)]
pub struct HttpActivityStore {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpActivityStore {
    pub fn new(base_url: String, api_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_token,
        }
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            warn!("activity backend rate limit hit (429)");
            return Err(AppError::RemoteApi(AppError::REMOTE_RATE_LIMIT.to_string()));
        }

        if status.as_u16() == 401 {
            return Err(AppError::RemoteApi(AppError::REMOTE_AUTH_ERROR.to_string()));
        }

        Err(AppError::RemoteApi(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!("activity backend rate limit hit (429)");
                return Err(AppError::RemoteApi(AppError::REMOTE_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(AppError::RemoteApi(AppError::REMOTE_AUTH_ERROR.to_string()));
            }

            return Err(AppError::RemoteApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::RemoteApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl RemoteActivityStore for HttpActivityStore {
    async fn create_activity(&self, record: &ActivityRecord) -> Result<ActivityRecord> {
        let url = format!("{}/activities", self.base_url);
        let body = ActivityDto::from_record(record);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        let created: ActivityDto = self.check_response_json(response).await?;
        Ok(created.into_record())
    }

    async fn delete_activity(&self, remote_id: &str) -> Result<()> {
        let url = format!("{}/activities/{}", self.base_url, remote_id);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        self.check_response(response).await
    }

    async fn fetch_activities(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let url = format!("{}/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(&[
                ("after", after.timestamp().to_string()),
                ("before", before.timestamp().to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        let dtos: Vec<ActivityDto> = self.check_response_json(response).await?;
        Ok(dtos.into_iter().map(ActivityDto::into_record).collect())
    }

    async fn sync_activities(&self, records: &[ActivityRecord]) -> Result<SyncOutcome> {
        let url = format!("{}/activities/sync", self.base_url);
        let body: Vec<ActivityDto> = records.iter().map(ActivityDto::from_record).collect();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::RemoteApi(e.to_string()))?;

        self.check_response_json(response).await
    }
}

/// Wire representation of one activity.
///
/// Routes travel as encoded polylines rather than coordinate arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActivityDto {
    /// Backend identifier; absent on create requests.
    id: Option<String>,
    external_id: String,
    activity_type: ActivityType,
    start_time: DateTime<Utc>,
    duration_seconds: f64,
    distance_meters: f64,
    calories: f64,
    average_heart_rate: Option<f64>,
    max_heart_rate: Option<u16>,
    route_polyline: Option<String>,
}

impl ActivityDto {
    fn from_record(record: &ActivityRecord) -> Self {
        Self {
            id: record.remote_id.clone(),
            external_id: record.external_id.clone(),
            activity_type: record.activity_type,
            start_time: record.start_time,
            duration_seconds: record.duration_seconds,
            distance_meters: record.distance_meters,
            calories: record.calories,
            average_heart_rate: record.average_heart_rate,
            max_heart_rate: record.max_heart_rate,
            route_polyline: encode_route(&record.route),
        }
    }

    fn into_record(self) -> ActivityRecord {
        let route = self
            .route_polyline
            .as_deref()
            .map(decode_route)
            .unwrap_or_default();
        ActivityRecord {
            local_id: self
                .id
                .clone()
                .unwrap_or_else(|| self.external_id.clone()),
            remote_id: self.id,
            external_id: self.external_id,
            source: ActivityRecord::SOURCE_REMOTE.to_string(),
            activity_type: self.activity_type,
            start_time: self.start_time,
            duration_seconds: self.duration_seconds,
            distance_meters: self.distance_meters,
            calories: self.calories,
            average_heart_rate: self.average_heart_rate,
            max_heart_rate: self.max_heart_rate,
            route,
            synced: true,
        }
    }
}

/// Encode a route as a polyline string; empty routes travel as `None`.
fn encode_route(route: &[RouteCoordinate]) -> Option<String> {
    if route.is_empty() {
        return None;
    }
    let coords = route.iter().map(|c| Coord {
        x: c.longitude,
        y: c.latitude,
    });
    polyline::encode_coordinates(coords, POLYLINE_PRECISION).ok()
}

/// Decode a polyline into route coordinates; bad input yields an empty route.
fn decode_route(encoded: &str) -> Vec<RouteCoordinate> {
    match polyline::decode_polyline(encoded, POLYLINE_PRECISION) {
        Ok(line) => line_to_route(&line),
        Err(e) => {
            warn!(error = %e, "failed to decode route polyline");
            Vec::new()
        }
    }
}

fn line_to_route(line: &LineString<f64>) -> Vec<RouteCoordinate> {
    line.coords()
        .map(|c| RouteCoordinate {
            latitude: c.y,
            longitude: c.x,
        })
        .collect()
}
