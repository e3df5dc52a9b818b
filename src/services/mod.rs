// SPDX-License-Identifier: MIT

//! Services module - tracking engine logic layer.

pub mod location;
pub mod manager;
pub mod metrics;
pub mod presenter;
pub mod reconcile;
pub mod recovery;
pub mod remote;
pub mod session;

pub use location::{LocationProvider, SensorEvent, SimulatedLocationProvider};
pub use manager::{ManagerPhase, TrackedSessionManager, WorkoutSessionManager};
pub use metrics::MetricsAggregator;
pub use presenter::{LiveStatusPresenter, LogPresenter, NoopPresenter, PresenterThrottle};
pub use reconcile::{merge_records, ActivityReconciler, SyncReport};
pub use recovery::{RecoveryHandler, RecoveryStore};
pub use remote::{HttpActivityStore, RemoteActivityStore, SyncOutcome};
pub use session::SessionTracker;
