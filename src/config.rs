// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Engine configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for durable local state (snapshots, hidden ids, history).
    pub data_dir: PathBuf,
    /// Base URL of the remote activity backend.
    pub backend_base_url: String,
    /// Bearer token for the remote activity backend.
    pub backend_api_token: String,
    /// Seconds between recovery snapshots while tracking.
    pub snapshot_interval_secs: u64,
    /// Minimum milliseconds between live-status presenter pushes.
    pub presenter_min_gap_ms: u64,
    /// User body weight, feeding the calorie model.
    pub user_weight_kg: f64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend_base_url: "http://localhost:8080/api".to_string(),
            backend_api_token: "test_token".to_string(),
            snapshot_interval_secs: 5,
            presenter_min_gap_ms: 1000,
            user_weight_kg: 70.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            data_dir: env::var("STRIDE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            backend_base_url: env::var("STRIDE_BACKEND_URL")
                .map_err(|_| ConfigError::Missing("STRIDE_BACKEND_URL"))?,
            backend_api_token: env::var("STRIDE_BACKEND_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRIDE_BACKEND_TOKEN"))?,
            snapshot_interval_secs: env::var("STRIDE_SNAPSHOT_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            presenter_min_gap_ms: env::var("STRIDE_PRESENTER_MIN_GAP_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            user_weight_kg: env::var("STRIDE_USER_WEIGHT_KG")
                .unwrap_or_else(|_| "70".to_string())
                .parse()
                .unwrap_or(70.0),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
