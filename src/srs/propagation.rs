//! Mirror scheduling state from a kanji reading onto its kana sibling
//!
//! A word spelled with kanji usually also has a kana-only reading; both
//! should move together. The kana card receives a copy of the kanji card's
//! post-review (or post-override) state rather than its own scheduler run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::models::{Card, CardKey, ReadingKind, WordId};
use super::overrides::{apply_override, OverrideEffect, OverrideOp};
use super::storage::{CardStore, Dictionary, Result};

/// What happened to the kana sibling
#[derive(Debug, Clone, PartialEq)]
pub enum SiblingChange {
    /// Not a kanji reading, or the word has no kana reading
    NotApplicable,
    Mirrored(Card),
    Deleted,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSyncReport {
    pub mirrored: usize,
    /// Later entries for a word already mirrored in this batch
    pub duplicates: usize,
    pub not_applicable: usize,
    pub failures: Vec<SyncFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub word_id: WordId,
    pub reason: String,
}

/// Copy every scheduling field of `source` onto `target`
pub fn mirror_schedule(source: &Card, target: &mut Card) {
    target.state = source.state;
    target.step = source.step;
    target.stability = source.stability;
    target.difficulty = source.difficulty;
    target.due = source.due;
    target.last_review = source.last_review;
}

fn mirrored_card(existing: Option<Card>, key: &CardKey, source: &Card, now: DateTime<Utc>) -> Card {
    let mut target = Card::ensure(existing, key, source.created_at.min(now));
    mirror_schedule(source, &mut target);
    target
}

pub struct Propagator<'a, S, D> {
    store: &'a S,
    dictionary: &'a D,
}

impl<'a, S: CardStore, D: Dictionary> Propagator<'a, S, D> {
    pub fn new(store: &'a S, dictionary: &'a D) -> Self {
        Self { store, dictionary }
    }

    /// Key of the kana card to keep in lockstep with `key`, if `key` is a kanji reading
    pub fn kana_sibling(&self, key: &CardKey) -> Result<Option<CardKey>> {
        if self.dictionary.reading_kind(key.word_id, key.reading_index)? != ReadingKind::Kanji {
            return Ok(None);
        }
        match self.dictionary.kana_variant_index(key.word_id)? {
            Some(index) if index != key.reading_index => Ok(Some(key.with_reading(index))),
            _ => Ok(None),
        }
    }

    /// Mirror a freshly reviewed (or overridden) kanji card onto its kana sibling
    pub fn sync_kana_reading(&self, source: &Card, now: DateTime<Utc>) -> Result<SiblingChange> {
        let Some(sibling_key) = self.kana_sibling(&source.key)? else {
            return Ok(SiblingChange::NotApplicable);
        };

        let existing = self.store.get_card(&sibling_key)?;
        let mirrored = mirrored_card(existing, &sibling_key, source, now);
        let saved = self.store.upsert_card(&mirrored)?;
        log::debug!("Mirrored {} onto {}", source.key, sibling_key);
        Ok(SiblingChange::Mirrored(saved))
    }

    /// Follow an override on a kanji card.
    ///
    /// `changed` tells whether the override did anything to the kanji card.
    /// A removal that changed nothing leaves the sibling alone. A repeated add
    /// re-mirrors, which repairs a sibling that missed an earlier mirror. When
    /// the kanji card is gone after the override (forgotten) the same removal
    /// is applied to the sibling.
    pub fn sync_override(
        &self,
        key: &CardKey,
        op: OverrideOp,
        changed: bool,
        resulting: Option<&Card>,
        now: DateTime<Utc>,
    ) -> Result<SiblingChange> {
        if !changed && op.is_removal() {
            return Ok(SiblingChange::Unchanged);
        }
        if let Some(source) = resulting {
            return self.sync_kana_reading(source, now);
        }

        let Some(sibling_key) = self.kana_sibling(key)? else {
            return Ok(SiblingChange::NotApplicable);
        };

        let existing = self.store.get_card(&sibling_key)?;
        match apply_override(existing, &sibling_key, op, now) {
            OverrideEffect::Upsert(card) => Ok(SiblingChange::Mirrored(self.store.upsert_card(&card)?)),
            OverrideEffect::Delete(_) => {
                self.store.delete_card(&sibling_key)?;
                Ok(SiblingChange::Deleted)
            }
            OverrideEffect::Unchanged(_) => Ok(SiblingChange::Unchanged),
        }
    }

    /// Mirror many source cards at once, at most one update per word.
    ///
    /// Never fails as a whole; problems are reported per word.
    pub fn sync_batch(&self, sources: &[Card], now: DateTime<Utc>) -> BatchSyncReport {
        let mut report = BatchSyncReport::default();
        let mut seen: HashSet<(&str, WordId)> = HashSet::new();
        let mut pending = Vec::new();

        for source in sources {
            let sibling_key = match self.kana_sibling(&source.key) {
                Ok(Some(key)) => key,
                Ok(None) => {
                    report.not_applicable += 1;
                    continue;
                }
                Err(e) => {
                    report.failures.push(SyncFailure {
                        word_id: source.key.word_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !seen.insert((source.key.user_id.as_str(), source.key.word_id)) {
                report.duplicates += 1;
                continue;
            }

            match self.store.get_card(&sibling_key) {
                Ok(existing) => pending.push(mirrored_card(existing, &sibling_key, source, now)),
                Err(e) => report.failures.push(SyncFailure {
                    word_id: source.key.word_id,
                    reason: e.to_string(),
                }),
            }
        }

        if pending.is_empty() {
            return report;
        }

        match self.store.upsert_cards(&pending) {
            Ok(saved) => report.mirrored = saved.len(),
            Err(e) => {
                log::warn!("Failed to mirror {} kana readings: {}", pending.len(), e);
                report.failures.extend(pending.iter().map(|card| SyncFailure {
                    word_id: card.key.word_id,
                    reason: e.to_string(),
                }));
            }
        }
        report
    }
}
