// SPDX-License-Identifier: MIT

//! Data models for the tracking engine.

pub mod activity;
pub mod metrics;
pub mod recovery;
pub mod session;

pub use activity::{ActivityRecord, HiddenIds, RouteCoordinate};
pub use metrics::{HeartRateSample, LocationSample, WorkoutMetricsSnapshot};
pub use recovery::WorkoutState;
pub use session::{ActivityType, SessionPhase, WorkoutSession, WorkoutSummary};
