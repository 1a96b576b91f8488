//! Operations exposed to callers: reviews, settings, recomputation, overrides
//!
//! `SrsService` owns the store and the debounce guard. It is constructed once
//! per process and shared by reference between request handlers.

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::{AppConfig, ConfigError, RecomputeConfig, SchedulerConfig};

use super::classifier::{classify, classify_optional, KnownState};
use super::export::{self, ExportDocument, ImportError, ImportMode, ImportReport};
use super::guard::ReviewGuard;
use super::models::{Card, CardId, CardKey, CardState, Rating, ReviewLog, WordId};
use super::overrides::{apply_override, OverrideEffect, OverrideOp};
use super::params::{EffectiveSettings, Parameters, SettingsError};
use super::propagation::{Propagator, SiblingChange};
use super::recompute::{recompute_page, RecomputeReport};
use super::scheduler::{ScheduleError, Scheduler};
use super::storage::{CardStore, Dictionary, SqliteCardStore, StoreError};

#[derive(Error, Debug)]
pub enum SrsError {
    #[error("Validation error: {0}")]
    Validation(#[from] SettingsError),

    #[error("Review of word {word_id} reading {reading_index} submitted too soon after the last one")]
    RateLimited { word_id: WordId, reading_index: u32 },

    #[error("Card is {0}; remove the override before reviewing it")]
    OverrideActive(CardState),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Schedule error: {0}")]
    Schedule(ScheduleError),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ScheduleError> for SrsError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::OverrideState(state) => Self::OverrideActive(state),
            other => Self::Schedule(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SrsError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub card: Card,
    pub log: ReviewLog,
    pub known_state: KnownState,
    /// Whether a kana sibling was updated alongside
    pub mirrored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideResult {
    pub op: OverrideOp,
    /// False when the card was already in the requested state
    pub changed: bool,
    /// Card after the operation; `None` once forgotten
    pub card: Option<Card>,
    pub mirrored: bool,
}

pub struct SrsService<S> {
    store: S,
    guard: ReviewGuard,
    scheduler_config: SchedulerConfig,
    recompute_config: RecomputeConfig,
}

impl SrsService<SqliteCardStore> {
    /// Open the SQLite database named in the config
    pub fn open(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let store = SqliteCardStore::open(&config.database_path)?;
        log::info!("Opened card store at {:?}", config.database_path);
        Self::new(store, config)
    }
}

impl<S: CardStore + Dictionary> SrsService<S> {
    /// Wrap an existing store. Fails when the config does not validate.
    pub fn new(store: S, config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            guard: ReviewGuard::from_config(&config.review_guard),
            scheduler_config: config.scheduler.clone(),
            recompute_config: config.recompute.clone(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored timestamps have second precision
    fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }

    fn parameters(&self, user_id: &str) -> Result<Parameters> {
        let stored = self.store.get_settings(user_id)?;
        Ok(Parameters::resolve(stored.as_ref()))
    }

    fn scheduler(&self, user_id: &str) -> Result<Scheduler> {
        Ok(Scheduler::new(self.parameters(user_id)?, &self.scheduler_config))
    }

    fn propagator(&self) -> Propagator<'_, S, S> {
        Propagator::new(&self.store, &self.store)
    }

    // ===== Reviews =====

    pub fn review_card(
        &self,
        user_id: &str,
        word_id: WordId,
        reading_index: u32,
        rating: Rating,
        duration_ms: Option<u32>,
    ) -> Result<ReviewResult> {
        self.review_card_at(user_id, word_id, reading_index, rating, duration_ms, Self::now())
    }

    /// Review a card at an explicit time.
    ///
    /// The card and its log are committed together. Mirroring onto the kana
    /// sibling happens afterwards and never fails the review.
    pub fn review_card_at(
        &self,
        user_id: &str,
        word_id: WordId,
        reading_index: u32,
        rating: Rating,
        duration_ms: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<ReviewResult> {
        let scheduler = self.scheduler(user_id)?;
        let key = CardKey::new(user_id, word_id, reading_index);
        let card = Card::ensure(self.store.get_card(&key)?, &key, now);
        if card.state.is_override() {
            return Err(SrsError::OverrideActive(card.state));
        }

        if !self.guard.try_acquire(user_id, word_id, reading_index) {
            return Err(SrsError::RateLimited {
                word_id,
                reading_index,
            });
        }

        let committed = scheduler
            .review(&card, rating, now, duration_ms)
            .map_err(SrsError::from)
            .and_then(|outcome| {
                self.store
                    .commit_review(&outcome.card, &outcome.log)
                    .map_err(SrsError::from)
            });
        let (card, log) = match committed {
            Ok(saved) => saved,
            Err(e) => {
                self.guard.release(user_id, word_id, reading_index);
                return Err(e);
            }
        };

        let mirrored = match self.propagator().sync_kana_reading(&card, now) {
            Ok(change) => change != SiblingChange::NotApplicable,
            Err(e) => {
                log::warn!(
                    "Failed to mirror review of word {} for user {}: {}",
                    word_id,
                    user_id,
                    e
                );
                false
            }
        };

        Ok(ReviewResult {
            known_state: classify(&card),
            card,
            log,
            mirrored,
        })
    }

    /// Due time per rating if the card were reviewed now
    pub fn preview(
        &self,
        user_id: &str,
        word_id: WordId,
        reading_index: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Rating, DateTime<Utc>)>> {
        let key = CardKey::new(user_id, word_id, reading_index);
        let card = Card::ensure(self.store.get_card(&key)?, &key, now);
        Ok(self.scheduler(user_id)?.preview(&card, now)?)
    }

    pub fn get_card(&self, user_id: &str, word_id: WordId, reading_index: u32) -> Result<Option<Card>> {
        Ok(self
            .store
            .get_card(&CardKey::new(user_id, word_id, reading_index))?)
    }

    pub fn classify(&self, user_id: &str, word_id: WordId, reading_index: u32) -> Result<KnownState> {
        let card = self.get_card(user_id, word_id, reading_index)?;
        Ok(classify_optional(card.as_ref()))
    }

    // ===== Settings =====

    pub fn get_settings(&self, user_id: &str) -> Result<EffectiveSettings> {
        Ok(self.parameters(user_id)?.into())
    }

    /// Validate and store new parameters; the row is removed when they equal the defaults
    pub fn update_settings(
        &self,
        user_id: &str,
        weights_csv: Option<&str>,
        desired_retention: Option<f64>,
    ) -> Result<EffectiveSettings> {
        let params = self.parameters(user_id)?.updated(weights_csv, desired_retention)?;

        if params.is_default() {
            if self.store.delete_settings(user_id)? {
                log::info!("Settings for user {} match the defaults, row removed", user_id);
            }
        } else {
            self.store.put_settings(&params.to_user_settings(user_id))?;
        }
        Ok(params.into())
    }

    // ===== Recomputation =====

    /// Recompute every card of the user, page by page
    pub fn recompute_settings(&self, user_id: &str) -> Result<RecomputeReport> {
        let mut total = RecomputeReport::default();
        let mut after = None;
        loop {
            let page = self.recompute_settings_batch(user_id, after, None)?;
            after = page.last_card_id;
            let done = page.done;
            total.absorb(page);
            if done {
                return Ok(total);
            }
        }
    }

    /// Recompute one page of cards with id greater than `after`.
    ///
    /// `page_size` defaults to the configured size and is capped at the
    /// configured maximum.
    pub fn recompute_settings_batch(
        &self,
        user_id: &str,
        after: Option<CardId>,
        page_size: Option<usize>,
    ) -> Result<RecomputeReport> {
        let page_size = match page_size {
            Some(0) => {
                return Err(SrsError::InvalidRequest("page size must be positive".to_string()))
            }
            Some(size) => size.min(self.recompute_config.max_page_size),
            None => self.recompute_config.page_size,
        };

        let scheduler = self.scheduler(user_id)?;
        Ok(recompute_page(
            &self.store,
            &self.store,
            &scheduler,
            user_id,
            after,
            page_size,
            Self::now(),
        )?)
    }

    // ===== Overrides =====

    pub fn set_override_state(
        &self,
        user_id: &str,
        word_id: WordId,
        reading_index: u32,
        op: OverrideOp,
    ) -> Result<OverrideResult> {
        self.set_override_state_at(user_id, word_id, reading_index, op, Self::now())
    }

    /// Apply an override. Repeating one, or removing an absent one, succeeds without effect.
    pub fn set_override_state_at(
        &self,
        user_id: &str,
        word_id: WordId,
        reading_index: u32,
        op: OverrideOp,
        now: DateTime<Utc>,
    ) -> Result<OverrideResult> {
        let key = CardKey::new(user_id, word_id, reading_index);
        let effect = apply_override(self.store.get_card(&key)?, &key, op, now);
        let changed = effect.is_change();

        let card = match effect {
            OverrideEffect::Upsert(card) => Some(self.store.upsert_card(&card)?),
            OverrideEffect::Delete(_) => {
                self.store.delete_card(&key)?;
                None
            }
            OverrideEffect::Unchanged(card) => card,
        };

        let mirrored = match self.propagator().sync_override(&key, op, changed, card.as_ref(), now) {
            Ok(change) => matches!(change, SiblingChange::Mirrored(_) | SiblingChange::Deleted),
            Err(e) => {
                log::warn!(
                    "Failed to mirror {} on word {} for user {}: {}",
                    op,
                    word_id,
                    user_id,
                    e
                );
                false
            }
        };

        log::debug!("Applied {} to {} (changed: {})", op, key, changed);
        Ok(OverrideResult {
            op,
            changed,
            card,
            mirrored,
        })
    }

    // ===== Export / import =====

    pub fn export_user(&self, user_id: &str) -> Result<ExportDocument> {
        Ok(export::export_user(&self.store, user_id, Self::now())?)
    }

    pub fn import_user(
        &self,
        user_id: &str,
        doc: &ExportDocument,
        mode: ImportMode,
    ) -> Result<ImportReport> {
        Ok(export::import_user(
            &self.store,
            &self.store,
            user_id,
            doc,
            mode,
            Self::now(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::models::{ReadingKind, UserSettings};
    use crate::srs::params::DEFAULT_WEIGHTS;
    use crate::srs::storage::Result as StoreResult;
    use chrono::{Duration, TimeZone};
    use std::thread;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    const WORD: WordId = 1_206_730;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 9, 0, 0).unwrap()
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.review_guard.window_ms = 60_000;
        config
    }

    fn create_test_service() -> SrsService<SqliteCardStore> {
        let store = SqliteCardStore::open_in_memory().unwrap();
        store.register_reading(WORD, 0, ReadingKind::Kanji).unwrap();
        store.register_reading(WORD, 1, ReadingKind::Kana).unwrap();
        SrsService::new(store, &config()).unwrap()
    }

    /// Working card store whose dictionary lookups always fail
    struct OfflineDictionary(SqliteCardStore);

    impl Dictionary for OfflineDictionary {
        fn reading_kind(&self, _word_id: WordId, _reading_index: u32) -> StoreResult<ReadingKind> {
            Err(StoreError::CorruptRow("dictionary offline".to_string()))
        }

        fn kana_variant_index(&self, _word_id: WordId) -> StoreResult<Option<u32>> {
            Err(StoreError::CorruptRow("dictionary offline".to_string()))
        }
    }

    impl CardStore for OfflineDictionary {
        fn get_card(&self, key: &CardKey) -> StoreResult<Option<Card>> {
            self.0.get_card(key)
        }
        fn upsert_card(&self, card: &Card) -> StoreResult<Card> {
            self.0.upsert_card(card)
        }
        fn upsert_cards(&self, cards: &[Card]) -> StoreResult<Vec<Card>> {
            self.0.upsert_cards(cards)
        }
        fn delete_card(&self, key: &CardKey) -> StoreResult<bool> {
            self.0.delete_card(key)
        }
        fn append_review_log(&self, card_id: CardId, log: &ReviewLog) -> StoreResult<ReviewLog> {
            self.0.append_review_log(card_id, log)
        }
        fn commit_review(&self, card: &Card, log: &ReviewLog) -> StoreResult<(Card, ReviewLog)> {
            self.0.commit_review(card, log)
        }
        fn list_review_logs(&self, card_id: CardId) -> StoreResult<Vec<ReviewLog>> {
            self.0.list_review_logs(card_id)
        }
        fn overwrite_card(&self, card: &Card, logs: &[ReviewLog]) -> StoreResult<(Card, Vec<ReviewLog>)> {
            self.0.overwrite_card(card, logs)
        }
        fn list_cards_page(&self, user_id: &str, after: Option<CardId>, limit: usize) -> StoreResult<Vec<Card>> {
            self.0.list_cards_page(user_id, after, limit)
        }
        fn get_settings(&self, user_id: &str) -> StoreResult<Option<UserSettings>> {
            self.0.get_settings(user_id)
        }
        fn put_settings(&self, settings: &UserSettings) -> StoreResult<()> {
            self.0.put_settings(settings)
        }
        fn delete_settings(&self, user_id: &str) -> StoreResult<bool> {
            self.0.delete_settings(user_id)
        }
    }

    #[test]
    fn test_review_creates_card_and_mirrors() {
        let service = create_test_service();

        let result = service
            .review_card_at("u1", WORD, 0, Rating::Again, Some(1500), t0())
            .unwrap();
        assert_eq!(result.card.state, CardState::Learning);
        assert_eq!(result.card.step, Some(0));
        assert_eq!(result.card.due, t0() + Duration::seconds(60));
        assert_eq!(result.log.duration_ms, Some(1500));
        assert_eq!(result.known_state, KnownState::Young);
        assert!(result.mirrored);

        let sibling = service.get_card("u1", WORD, 1).unwrap().unwrap();
        assert_eq!(sibling.state, CardState::Learning);
        assert_eq!(sibling.due, result.card.due);
        assert!(service.store().list_review_logs(sibling.id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_review_is_rate_limited() {
        let service = create_test_service();

        service.review_card_at("u1", WORD, 0, Rating::Good, None, t0()).unwrap();
        let err = service
            .review_card_at("u1", WORD, 0, Rating::Good, None, t0())
            .unwrap_err();
        assert!(matches!(err, SrsError::RateLimited { word_id: WORD, reading_index: 0 }));

        let card = service.get_card("u1", WORD, 0).unwrap().unwrap();
        assert_eq!(service.store().list_review_logs(card.id.unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_review_of_override_card_is_rejected() {
        let service = create_test_service();
        service
            .set_override_state_at("u1", 77, 0, OverrideOp::MasterAdd, t0())
            .unwrap();

        let err = service
            .review_card_at("u1", 77, 0, Rating::Good, None, t0())
            .unwrap_err();
        assert!(matches!(err, SrsError::OverrideActive(CardState::Mastered)));
    }

    #[test]
    fn test_blacklist_propagates_and_reverts() {
        let service = create_test_service();
        service.review_card_at("u1", WORD, 0, Rating::Easy, None, t0()).unwrap();

        let added = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::BlacklistAdd, t0())
            .unwrap();
        assert!(added.changed);
        assert!(added.mirrored);
        assert_eq!(service.classify("u1", WORD, 1).unwrap(), KnownState::Blacklisted);

        let again = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::BlacklistAdd, t0())
            .unwrap();
        assert!(!again.changed);

        let removed = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::BlacklistRemove, t0())
            .unwrap();
        assert!(removed.changed);
        assert_eq!(removed.card.as_ref().unwrap().state, CardState::Review);
        let sibling = service.get_card("u1", WORD, 1).unwrap().unwrap();
        assert_eq!(sibling.state, CardState::Review);
    }

    #[test]
    fn test_forget_deletes_card_and_sibling() {
        let service = create_test_service();
        service.review_card_at("u1", WORD, 0, Rating::Good, None, t0()).unwrap();

        let result = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::Forget, t0())
            .unwrap();
        assert!(result.changed);
        assert_eq!(result.card, None);
        assert_eq!(service.get_card("u1", WORD, 0).unwrap(), None);
        assert_eq!(service.get_card("u1", WORD, 1).unwrap(), None);

        // Forgetting nothing is not an error
        let noop = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::Forget, t0())
            .unwrap();
        assert!(!noop.changed);
    }

    #[test]
    fn test_forget_of_absent_kanji_card_keeps_kana_history() {
        let service = create_test_service();
        let kana = service.review_card_at("u1", WORD, 1, Rating::Good, None, t0()).unwrap();
        assert!(!kana.mirrored);

        let result = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::Forget, t0())
            .unwrap();
        assert!(!result.changed);
        assert!(!result.mirrored);

        let survivor = service.get_card("u1", WORD, 1).unwrap().unwrap();
        assert_eq!(survivor, kana.card);
        assert_eq!(service.store().list_review_logs(survivor.id.unwrap()).unwrap(), vec![kana.log]);
    }

    #[test]
    fn test_removal_without_effect_keeps_kana_override() {
        let service = create_test_service();
        service.review_card_at("u1", WORD, 0, Rating::Easy, None, t0()).unwrap();
        service
            .set_override_state_at("u1", WORD, 1, OverrideOp::BlacklistAdd, t0())
            .unwrap();

        let result = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::MasterRemove, t0())
            .unwrap();
        assert!(!result.changed);
        assert!(!result.mirrored);
        assert_eq!(result.card.unwrap().state, CardState::Review);
        assert_eq!(service.classify("u1", WORD, 1).unwrap(), KnownState::Blacklisted);
    }

    #[test]
    fn test_mirror_failure_keeps_primary_changes() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let service = SrsService::new(OfflineDictionary(store), &config()).unwrap();

        let result = service
            .review_card_at("u1", WORD, 0, Rating::Good, Some(900), t0())
            .unwrap();
        assert!(!result.mirrored);
        let card = service.get_card("u1", WORD, 0).unwrap().unwrap();
        assert_eq!(card, result.card);
        assert_eq!(service.store().list_review_logs(card.id.unwrap()).unwrap(), vec![result.log]);
        assert_eq!(service.get_card("u1", WORD, 1).unwrap(), None);

        let blacklisted = service
            .set_override_state_at("u1", WORD, 0, OverrideOp::BlacklistAdd, t0())
            .unwrap();
        assert!(blacklisted.changed);
        assert!(!blacklisted.mirrored);
        assert_eq!(
            service.get_card("u1", WORD, 0).unwrap().unwrap().state,
            CardState::Blacklisted
        );
    }

    #[test]
    fn test_rejected_review_does_not_consume_window() {
        let service = create_test_service();
        service
            .set_override_state_at("u1", 77, 0, OverrideOp::BlacklistAdd, t0())
            .unwrap();
        let err = service
            .review_card_at("u1", 77, 0, Rating::Good, None, t0())
            .unwrap_err();
        assert!(matches!(err, SrsError::OverrideActive(CardState::Blacklisted)));

        service
            .set_override_state_at("u1", 77, 0, OverrideOp::BlacklistRemove, t0())
            .unwrap();
        let result = service.review_card_at("u1", 77, 0, Rating::Good, None, t0()).unwrap();
        assert!(!result.card.state.is_override());
        assert_eq!(
            service.store().list_review_logs(result.card.id.unwrap()).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = config();
        config.scheduler.learning_steps_secs = vec![0, 600];

        let err = SrsService::new(SqliteCardStore::open_in_memory().unwrap(), &config)
            .err()
            .unwrap();
        assert!(matches!(err, SrsError::Config(_)));
    }

    #[test]
    fn test_default_settings_leave_no_row() {
        let service = create_test_service();

        let custom = service.update_settings("u1", None, Some(0.85)).unwrap();
        assert!(!custom.is_default);
        assert!(service.store().get_settings("u1").unwrap().is_some());

        let csv = DEFAULT_WEIGHTS
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let reset = service.update_settings("u1", Some(&csv), Some(0.9)).unwrap();
        assert!(reset.is_default);
        assert!(service.get_settings("u1").unwrap().is_default);
        assert_eq!(service.store().get_settings("u1").unwrap(), None);
    }

    #[test]
    fn test_invalid_settings_are_not_applied() {
        let service = create_test_service();
        service.update_settings("u1", None, Some(0.8)).unwrap();

        let err = service
            .update_settings("u1", Some("1, 2, 3"), Some(0.7))
            .unwrap_err();
        assert!(matches!(err, SrsError::Validation(_)));
        assert_eq!(service.get_settings("u1").unwrap().desired_retention, 0.8);

        let err = service.update_settings("u1", None, Some(1.0)).unwrap_err();
        assert!(matches!(err, SrsError::Validation(_)));
    }

    #[test]
    fn test_batch_recompute_pages_through_cards() {
        let service = create_test_service();
        for word in [10, 11, 12] {
            service.review_card_at("u1", word, 0, Rating::Good, None, t0()).unwrap();
        }

        let first = service.recompute_settings_batch("u1", None, Some(1)).unwrap();
        assert!(!first.done);
        let second = service
            .recompute_settings_batch("u1", first.last_card_id, Some(1))
            .unwrap();
        assert!(!second.done);
        let third = service
            .recompute_settings_batch("u1", second.last_card_id, Some(1))
            .unwrap();
        assert!(third.done);
        assert_eq!(
            first.processed_count + second.processed_count + third.processed_count,
            3
        );

        let err = service.recompute_settings_batch("u1", None, Some(0)).unwrap_err();
        assert!(matches!(err, SrsError::InvalidRequest(_)));
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let mut config = config();
        config.review_guard.window_ms = 1;
        let service = SrsService::new(SqliteCardStore::open_in_memory().unwrap(), &config).unwrap();

        let ratings = [Rating::Good, Rating::Good, Rating::Again, Rating::Good, Rating::Easy];
        for (i, rating) in ratings.iter().enumerate() {
            let at = t0() + Duration::days(i as i64 * 3);
            service.review_card_at("u1", 500, 0, *rating, None, at).unwrap();
            service.review_card_at("u1", 600 + i as i64, 0, *rating, None, at).unwrap();
            thread::sleep(StdDuration::from_millis(10));
        }

        service.update_settings("u1", None, Some(0.82)).unwrap();
        let first = service.recompute_settings("u1").unwrap();
        assert!(first.done);
        assert_eq!(first.processed_count, 6);
        assert!(first.failures.is_empty());
        let snapshot = service.export_user("u1").unwrap().cards;

        let second = service.recompute_settings("u1").unwrap();
        assert_eq!(second.processed_count, first.processed_count);
        assert_eq!(second.updated_count, 0);
        assert_eq!(service.export_user("u1").unwrap().cards, snapshot);
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.database_path = dir.path().join("nested").join("kotoba.db");

        let service = SrsService::open(&config).unwrap();
        service.review_card("u1", 1, 0, Rating::Good, None).unwrap();
        assert!(config.database_path.exists());
        assert_eq!(service.store().count_cards("u1").unwrap(), 1);
    }
}
