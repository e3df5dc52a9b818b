// SPDX-License-Identifier: MIT

//! Durable key-value persistence layer.
//!
//! The contract is "survives process restart", not any particular storage
//! technology. The shipped implementation writes one JSON document per key.

pub mod file;

pub use file::FileKvStore;

use crate::error::Result;

/// Storage keys as constants.
pub mod keys {
    /// The single crash-recovery snapshot.
    pub const RECOVERY_SNAPSHOT: &str = "recovery_snapshot";
    /// User-deleted activity identifier sets.
    pub const HIDDEN_IDS: &str = "hidden_ids";
    /// Device-local activity records (synced and pending).
    pub const LOCAL_ACTIVITIES: &str = "local_activities";
}

/// Minimal durable key-value store.
///
/// Writers are single per key (state machine or reconciler); readers always
/// re-read the persisted copy rather than caching indefinitely.
pub trait KvStore: Send + Sync {
    /// Read the raw document stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Durably replace the document stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the document stored under `key`; removing a missing key is
    /// not an error.
    fn delete(&self, key: &str) -> Result<()>;
}
