//! Rebuild memory state from review history under new parameters
//!
//! Cards are visited in ascending id order, one bounded page at a time. Each
//! page is written in a single transaction, so a run can be abandoned between
//! pages and resumed from `last_card_id` without any other state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::models::{Card, CardId, CardKey, ReviewLog};
use super::propagation::Propagator;
use super::scheduler::{ScheduleError, Scheduler};
use super::storage::{CardStore, Dictionary, Result as StoreResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("Log {index} of {key} is out of order: {source}")]
    OutOfOrder {
        key: CardKey,
        index: usize,
        #[source]
        source: ScheduleError,
    },

    #[error("Log {index} of {key} cannot be scheduled: {source}")]
    Unschedulable {
        key: CardKey,
        index: usize,
        #[source]
        source: ScheduleError,
    },
}

impl ReplayError {
    fn at(key: &CardKey, index: usize, source: ScheduleError) -> Self {
        let key = key.clone();
        match source {
            ScheduleError::OutOfOrder { .. } => Self::OutOfOrder { key, index, source },
            ScheduleError::OverrideState(_) => Self::Unschedulable { key, index, source },
        }
    }
}

/// Replay the full ordered log history of `card` from a blank card.
///
/// Returns `None` when there is nothing to replay. The card keeps its id and
/// creation time. Mastered and blacklisted cards only get their memory state
/// refreshed; the override itself (state, due, last review) stays as it is.
pub fn replay(
    card: &Card,
    logs: &[ReviewLog],
    scheduler: &Scheduler,
) -> Result<Option<Card>, ReplayError> {
    if logs.is_empty() {
        return Ok(None);
    }

    let mut current = Card::new(card.key.clone(), card.created_at);
    current.id = card.id;
    for (index, log) in logs.iter().enumerate() {
        current = scheduler
            .review(&current, log.rating, log.reviewed_at, log.duration_ms)
            .map_err(|e| ReplayError::at(&card.key, index, e))?
            .card;
    }

    if card.state.is_override() {
        let mut kept = card.clone();
        kept.stability = current.stability;
        kept.difficulty = current.difficulty;
        return Ok(Some(kept));
    }
    Ok(Some(current))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeFailure {
    pub card_id: CardId,
    pub reason: String,
}

/// Progress of one or more recomputation pages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeReport {
    /// Cards visited, including untouched and failed ones
    pub processed_count: usize,
    pub updated_count: usize,
    pub mirrored_count: usize,
    /// Resume cursor for the next page
    pub last_card_id: Option<CardId>,
    pub done: bool,
    pub failures: Vec<RecomputeFailure>,
}

impl RecomputeReport {
    /// Fold the next page into a running total
    pub fn absorb(&mut self, page: RecomputeReport) {
        self.processed_count += page.processed_count;
        self.updated_count += page.updated_count;
        self.mirrored_count += page.mirrored_count;
        if page.last_card_id.is_some() {
            self.last_card_id = page.last_card_id;
        }
        self.done = page.done;
        self.failures.extend(page.failures);
    }
}

/// Recompute one page of a user's cards after `after`.
///
/// Cards whose history cannot be replayed are reported and left unchanged;
/// the rest of the page is still written. Store errors abort the page
/// before anything is written.
pub fn recompute_page<S: CardStore, D: Dictionary>(
    store: &S,
    dictionary: &D,
    scheduler: &Scheduler,
    user_id: &str,
    after: Option<CardId>,
    page_size: usize,
    now: DateTime<Utc>,
) -> StoreResult<RecomputeReport> {
    let mut cards = store.list_cards_page(user_id, after, page_size + 1)?;
    let done = cards.len() <= page_size;
    cards.truncate(page_size);

    let mut report = RecomputeReport {
        last_card_id: after,
        done,
        ..Default::default()
    };
    let mut updates = Vec::new();

    for card in &cards {
        report.processed_count += 1;
        let Some(card_id) = card.id else {
            continue;
        };
        report.last_card_id = Some(card_id);

        let logs = store.list_review_logs(card_id)?;
        match replay(card, &logs, scheduler) {
            Ok(Some(replayed)) if replayed != *card => updates.push(replayed),
            Ok(_) => {}
            Err(e) => {
                log::warn!("Skipping card {} during recompute: {}", card_id, e);
                report.failures.push(RecomputeFailure {
                    card_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    if !updates.is_empty() {
        let saved = store.upsert_cards(&updates)?;
        report.updated_count = saved.len();

        let sync = Propagator::new(store, dictionary).sync_batch(&saved, now);
        report.mirrored_count = sync.mirrored;
        for failure in &sync.failures {
            log::warn!(
                "Failed to mirror word {} for user {} after recompute: {}",
                failure.word_id,
                user_id,
                failure.reason
            );
        }
    }

    log::info!(
        "Recomputed {} cards for user {} ({} updated, {} failed, done: {})",
        report.processed_count,
        user_id,
        report.updated_count,
        report.failures.len(),
        report.done
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::srs::models::{CardState, Rating, ReadingKind};
    use crate::srs::params::Parameters;
    use crate::srs::storage::SqliteCardStore;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Parameters::default(), &SchedulerConfig::default())
    }

    fn retention_scheduler(retention: f64) -> Scheduler {
        let params = Parameters::default().updated(None, Some(retention)).unwrap();
        Scheduler::new(params, &SchedulerConfig::default())
    }

    /// Review a fresh card through `ratings`, one day apart, and persist it
    fn seed(store: &SqliteCardStore, key: CardKey, ratings: &[Rating]) -> Card {
        let scheduler = scheduler();
        let mut card = Card::new(key, start());
        for (day, rating) in ratings.iter().enumerate() {
            let at = start() + Duration::days(day as i64);
            let outcome = scheduler.review(&card, *rating, at, None).unwrap();
            let (saved, _) = store.commit_review(&outcome.card, &outcome.log).unwrap();
            card = saved;
        }
        card
    }

    #[test]
    fn test_replay_matches_incremental_reviews() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let card = seed(
            &store,
            CardKey::new("u1", 1, 0),
            &[Rating::Good, Rating::Good, Rating::Again, Rating::Easy],
        );
        let logs = store.list_review_logs(card.id.unwrap()).unwrap();

        let replayed = replay(&card, &logs, &scheduler()).unwrap().unwrap();
        assert_eq!(replayed, card);
    }

    #[test]
    fn test_replay_without_logs_is_none() {
        let card = Card::new(CardKey::new("u1", 1, 0), start());
        assert_eq!(replay(&card, &[], &scheduler()).unwrap(), None);
    }

    #[test]
    fn test_replay_keeps_override() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let mut card = seed(&store, CardKey::new("u1", 1, 0), &[Rating::Good, Rating::Hard]);
        card.state = CardState::Mastered;
        card.due = start() + Duration::days(10);
        card.last_review = Some(card.due);
        let logs = store.list_review_logs(card.id.unwrap()).unwrap();

        let replayed = replay(&card, &logs, &retention_scheduler(0.8)).unwrap().unwrap();
        assert_eq!(replayed.state, CardState::Mastered);
        assert_eq!(replayed.due, card.due);
        assert_eq!(replayed.last_review, card.last_review);
        assert_eq!(replayed.difficulty, card.difficulty);
        assert_eq!(replayed.stability, card.stability);
    }

    #[test]
    fn test_replay_rejects_out_of_order_history() {
        let card = Card::new(CardKey::new("u1", 1, 0), start());
        let logs = vec![
            ReviewLog::new(Some(1), Rating::Good, start() + Duration::days(2), None),
            ReviewLog::new(Some(1), Rating::Good, start() + Duration::days(1), None),
        ];

        let err = replay(&card, &logs, &scheduler()).unwrap_err();
        assert!(matches!(err, ReplayError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn test_page_reports_cursor_and_done() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        for word in 1..=3 {
            seed(&store, CardKey::new("u1", word, 0), &[Rating::Good]);
        }
        let scheduler = retention_scheduler(0.85);
        let now = start() + Duration::days(30);

        let first = recompute_page(&store, &store, &scheduler, "u1", None, 2, now).unwrap();
        assert_eq!(first.processed_count, 2);
        assert!(!first.done);

        let second =
            recompute_page(&store, &store, &scheduler, "u1", first.last_card_id, 2, now).unwrap();
        assert_eq!(second.processed_count, 1);
        assert!(second.done);

        let empty =
            recompute_page(&store, &store, &scheduler, "u1", second.last_card_id, 2, now).unwrap();
        assert_eq!(empty.processed_count, 0);
        assert_eq!(empty.last_card_id, second.last_card_id);
        assert!(empty.done);
    }

    #[test]
    fn test_page_is_rerunnable() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let key = CardKey::new("u1", 1, 0);
        seed(&store, key.clone(), &[Rating::Good, Rating::Good, Rating::Hard]);
        let scheduler = retention_scheduler(0.95);
        let now = start() + Duration::days(30);

        let first = recompute_page(&store, &store, &scheduler, "u1", None, 10, now).unwrap();
        assert_eq!(first.updated_count, 1);
        let after_first = store.get_card(&key).unwrap().unwrap();

        let second = recompute_page(&store, &store, &scheduler, "u1", None, 10, now).unwrap();
        assert_eq!(second.updated_count, 0);
        let after_second = store.get_card(&key).unwrap().unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(store.list_review_logs(after_first.id.unwrap()).unwrap().len(), 3);
    }

    #[test]
    fn test_page_isolates_failures_and_mirrors() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        store.register_reading(1, 0, ReadingKind::Kanji).unwrap();
        store.register_reading(1, 1, ReadingKind::Kana).unwrap();

        let good = seed(&store, CardKey::new("u1", 1, 0), &[Rating::Good, Rating::Good]);
        let broken = seed(&store, CardKey::new("u1", 2, 0), &[Rating::Good]);
        // A log stamped before the one already stored
        store
            .append_review_log(
                broken.id.unwrap(),
                &ReviewLog::new(broken.id, Rating::Good, start() - Duration::days(3), None),
            )
            .unwrap();

        let scheduler = retention_scheduler(0.8);
        let report =
            recompute_page(&store, &store, &scheduler, "u1", None, 10, start()).unwrap();

        assert_eq!(report.processed_count, 2);
        assert_eq!(report.updated_count, 1);
        assert_eq!(report.mirrored_count, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].card_id, broken.id.unwrap());
        assert_eq!(store.get_card(&broken.key).unwrap().unwrap(), broken);

        let kanji = store.get_card(&good.key).unwrap().unwrap();
        let kana = store.get_card(&good.key.with_reading(1)).unwrap().unwrap();
        assert_eq!(kana.stability, kanji.stability);
        assert_eq!(kana.due, kanji.due);
    }

    #[test]
    fn test_absorb_sums_pages() {
        let mut total = RecomputeReport::default();
        total.absorb(RecomputeReport {
            processed_count: 2,
            updated_count: 1,
            last_card_id: Some(4),
            ..Default::default()
        });
        total.absorb(RecomputeReport {
            processed_count: 0,
            last_card_id: None,
            done: true,
            ..Default::default()
        });
        assert_eq!(total.processed_count, 2);
        assert_eq!(total.updated_count, 1);
        assert_eq!(total.last_card_id, Some(4));
        assert!(total.done);
    }
}
