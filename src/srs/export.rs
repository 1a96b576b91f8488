//! JSON export and import of a user's cards, review history and settings

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{Card, CardKey, CardState, Rating, ReviewLog, UserSettings, WordId};
use super::params::{validate_retention, Parameters, SettingsError, Weights};
use super::propagation::Propagator;
use super::storage::{CardStore, Dictionary, StoreError};

pub const EXPORT_VERSION: u32 = 1;

const EXPORT_PAGE_SIZE: usize = 500;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unsupported export version {0} (expected {})", EXPORT_VERSION)]
    UnsupportedVersion(u32),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid card {word_id}#{reading_index}: {reason}")]
    InvalidCard {
        word_id: WordId,
        reading_index: u32,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub user_id: String,
    pub exported_at: DateTime<Utc>,
    /// Absent when the user runs on the defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ExportSettings>,
    #[serde(default)]
    pub cards: Vec<CardExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub weights: Vec<f64>,
    pub desired_retention: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardExport {
    pub word_id: WordId,
    pub reading_index: u32,
    pub state: CardState,
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<f64>,
    pub due: DateTime<Utc>,
    #[serde(default)]
    pub last_review: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub logs: Vec<LogExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExport {
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportMode {
    /// Keep cards (and settings) the user already has
    #[default]
    Merge,
    /// Replace existing cards and their whole review history
    Overwrite,
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("Unknown import mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    /// Existing cards left alone in merge mode
    pub skipped: usize,
    pub mirrored: usize,
    pub settings_applied: bool,
}

impl CardExport {
    fn from_card(card: &Card, logs: &[ReviewLog]) -> Self {
        Self {
            word_id: card.key.word_id,
            reading_index: card.key.reading_index,
            state: card.state,
            step: card.step,
            stability: card.stability,
            difficulty: card.difficulty,
            due: card.due,
            last_review: card.last_review,
            created_at: card.created_at,
            logs: logs
                .iter()
                .map(|log| LogExport {
                    rating: log.rating,
                    reviewed_at: log.reviewed_at,
                    duration_ms: log.duration_ms,
                })
                .collect(),
        }
    }

    fn to_card(&self, user_id: &str) -> Card {
        Card {
            id: None,
            key: CardKey::new(user_id, self.word_id, self.reading_index),
            state: self.state,
            step: self.step,
            stability: self.stability,
            difficulty: self.difficulty,
            due: self.due,
            last_review: self.last_review,
            created_at: self.created_at,
        }
    }

    fn to_logs(&self) -> Vec<ReviewLog> {
        self.logs
            .iter()
            .map(|log| ReviewLog::new(None, log.rating, log.reviewed_at, log.duration_ms))
            .collect()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.due < self.created_at {
            return Err("due precedes creation".to_string());
        }
        if self.stability.is_some() != self.difficulty.is_some() {
            return Err("stability and difficulty must be set together".to_string());
        }
        if self.stability.map_or(false, |s| !s.is_finite() || s < 0.0) {
            return Err("stability must be a non-negative number".to_string());
        }
        if self.difficulty.map_or(false, |d| !d.is_finite()) {
            return Err("difficulty must be a number".to_string());
        }
        if self.logs.windows(2).any(|pair| pair[1].reviewed_at < pair[0].reviewed_at) {
            return Err("review logs are not in chronological order".to_string());
        }
        Ok(())
    }
}

/// Snapshot everything stored for one user
pub fn export_user<S: CardStore>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
) -> std::result::Result<ExportDocument, StoreError> {
    let settings = store
        .get_settings(user_id)?
        .map(|stored| Parameters::resolve(Some(&stored)))
        .filter(|params| !params.is_default())
        .map(|params| ExportSettings {
            weights: params.weights.as_slice().to_vec(),
            desired_retention: params.desired_retention,
        });

    let mut cards = Vec::new();
    let mut after = None;
    loop {
        let page = store.list_cards_page(user_id, after, EXPORT_PAGE_SIZE)?;
        for card in &page {
            let logs = match card.id {
                Some(id) => store.list_review_logs(id)?,
                None => Vec::new(),
            };
            cards.push(CardExport::from_card(card, &logs));
        }
        if page.len() < EXPORT_PAGE_SIZE {
            break;
        }
        after = page.last().and_then(|card| card.id);
    }

    log::info!("Exported {} cards for user {}", cards.len(), user_id);
    Ok(ExportDocument {
        version: EXPORT_VERSION,
        user_id: user_id.to_string(),
        exported_at: now,
        settings,
        cards,
    })
}

/// Import a document into `user_id`'s account.
///
/// The whole document is validated before anything is written. Imported
/// kanji cards are mirrored onto their kana siblings.
pub fn import_user<S: CardStore, D: Dictionary>(
    store: &S,
    dictionary: &D,
    user_id: &str,
    doc: &ExportDocument,
    mode: ImportMode,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    if doc.version != EXPORT_VERSION {
        return Err(ImportError::UnsupportedVersion(doc.version));
    }

    let settings = doc
        .settings
        .as_ref()
        .map(|s| -> Result<Parameters> {
            Ok(Parameters {
                weights: Weights::new(&s.weights)?,
                desired_retention: validate_retention(s.desired_retention)?,
            })
        })
        .transpose()?;

    let mut seen = HashSet::new();
    for card in &doc.cards {
        let invalid = |reason: String| ImportError::InvalidCard {
            word_id: card.word_id,
            reading_index: card.reading_index,
            reason,
        };
        if !seen.insert((card.word_id, card.reading_index)) {
            return Err(invalid("listed more than once".to_string()));
        }
        card.validate().map_err(invalid)?;
    }

    let mut report = ImportReport::default();

    if let Some(params) = settings {
        let has_settings = store.get_settings(user_id)?.is_some();
        if mode == ImportMode::Overwrite || !has_settings {
            apply_settings(store, &params.to_user_settings(user_id), params.is_default())?;
            report.settings_applied = true;
        }
    }

    let mut imported = Vec::new();
    for entry in &doc.cards {
        let mut card = entry.to_card(user_id);
        if let Some(existing) = store.get_card(&card.key)? {
            if mode == ImportMode::Merge {
                report.skipped += 1;
                continue;
            }
            card.id = existing.id;
        }
        let (saved, _) = store.overwrite_card(&card, &entry.to_logs())?;
        imported.push(saved);
    }
    report.imported = imported.len();

    let sync = Propagator::new(store, dictionary).sync_batch(&imported, now);
    report.mirrored = sync.mirrored;
    for failure in &sync.failures {
        log::warn!(
            "Failed to mirror word {} for user {} after import: {}",
            failure.word_id,
            user_id,
            failure.reason
        );
    }

    log::info!(
        "Imported {} cards for user {} ({} skipped, {} mirrored)",
        report.imported,
        user_id,
        report.skipped,
        report.mirrored
    );
    Ok(report)
}

fn apply_settings<S: CardStore>(
    store: &S,
    settings: &UserSettings,
    is_default: bool,
) -> std::result::Result<(), StoreError> {
    if is_default {
        store.delete_settings(&settings.user_id)?;
    } else {
        store.put_settings(settings)?;
    }
    Ok(())
}
