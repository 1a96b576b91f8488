//! Spaced repetition scheduling for Kotoba
//!
//! This module provides:
//! - FSRS scheduler (memory model, learning steps, interval sizing)
//! - Per-user parameter resolution
//! - Known-state classification
//! - Manual overrides (mastered / blacklisted / forget)
//! - Kanji-to-kana state mirroring
//! - Paged recomputation from review history
//! - SQLite card store, JSON export and import

pub mod classifier;
pub mod export;
pub mod guard;
pub mod models;
pub mod overrides;
pub mod params;
pub mod propagation;
pub mod recompute;
pub mod scheduler;
pub mod service;
pub mod storage;

pub use classifier::{classify, KnownState, KnownStateSet};
pub use export::{ExportDocument, ImportError, ImportMode, ImportReport};
pub use guard::ReviewGuard;
pub use models::*;
pub use overrides::OverrideOp;
pub use params::{EffectiveSettings, Parameters, SettingsError};
pub use propagation::{BatchSyncReport, Propagator};
pub use recompute::{RecomputeFailure, RecomputeReport, ReplayError};
pub use scheduler::{format_interval, ScheduleError, Scheduler};
pub use service::{OverrideResult, ReviewResult, SrsError, SrsService};
pub use storage::{CardStore, Dictionary, SqliteCardStore, StoreError};
