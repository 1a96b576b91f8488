//! In-memory debounce for review submissions.
//!
//! Guards against a client double-submitting the same review. Entries live in
//! a `moka` cache with a time-to-live equal to the debounce window, so memory
//! stays bounded and nothing is persisted. This is best effort only: two
//! processes each have their own guard.

use std::time::{Duration, Instant};

use moka::sync::Cache;

use crate::config::GuardConfig;

use super::models::WordId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardKey {
    pub user_id: String,
    pub word_id: WordId,
    pub reading_index: u32,
}

pub struct ReviewGuard {
    acquisitions: Cache<GuardKey, Instant>,
    window: Duration,
}

impl ReviewGuard {
    pub fn new(window: Duration, max_entries: u64) -> Self {
        let acquisitions = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(window)
            .build();
        Self {
            acquisitions,
            window,
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(config.window(), config.max_entries)
    }

    /// Record an acquisition for the key.
    ///
    /// Returns `false` when a previous acquisition is still inside the window;
    /// the caller must reject that request. Never blocks on other keys.
    pub fn try_acquire(&self, user_id: &str, word_id: WordId, reading_index: u32) -> bool {
        let key = GuardKey {
            user_id: user_id.to_string(),
            word_id,
            reading_index,
        };
        let entry = self.acquisitions.entry(key).or_insert_with(Instant::now);

        if !entry.is_fresh() {
            log::debug!(
                "Rejecting duplicate review {}/{}#{} acquired {:?} ago",
                user_id,
                word_id,
                reading_index,
                entry.value().elapsed()
            );
        }
        entry.is_fresh()
    }

    /// Drop an acquisition whose request was rejected further on
    pub fn release(&self, user_id: &str, word_id: WordId, reading_index: u32) {
        self.acquisitions.invalidate(&GuardKey {
            user_id: user_id.to_string(),
            word_id,
            reading_index,
        });
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
