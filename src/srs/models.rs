//! Data models for the scheduling core

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned card identifier, ascending in creation order
pub type CardId = i64;

/// Dictionary word identifier
pub type WordId = i64;

/// Identifies one card: a user studying one reading variant of one word
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardKey {
    pub user_id: String,
    pub word_id: WordId,
    pub reading_index: u32,
}

impl CardKey {
    pub fn new(user_id: impl Into<String>, word_id: WordId, reading_index: u32) -> Self {
        Self {
            user_id: user_id.into(),
            word_id,
            reading_index,
        }
    }

    /// Same user and word, different reading variant
    pub fn with_reading(&self, reading_index: u32) -> Self {
        Self {
            user_id: self.user_id.clone(),
            word_id: self.word_id,
            reading_index,
        }
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.user_id, self.word_id, self.reading_index)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lifecycle state of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardState {
    /// Never reviewed
    #[default]
    New,
    /// Walking through the initial learning steps
    Learning,
    /// Regular spaced review
    Review,
    /// Lapsed and walking through the relearning steps
    Relearning,
    /// Manually marked as known; never scheduled
    Mastered,
    /// Manually excluded from study; never scheduled
    Blacklisted,
}

impl CardState {
    /// Mastered and blacklisted cards bypass the scheduler
    pub fn is_override(self) -> bool {
        matches!(self, Self::Mastered | Self::Blacklisted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Review => "review",
            Self::Relearning => "relearning",
            Self::Mastered => "mastered",
            Self::Blacklisted => "blacklisted",
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "learning" => Ok(Self::Learning),
            "review" => Ok(Self::Review),
            "relearning" => Ok(Self::Relearning),
            "mastered" => Ok(Self::Mastered),
            "blacklisted" => Ok(Self::Blacklisted),
            other => Err(ParseEnumError::new("card state", other)),
        }
    }
}

/// Recall rating given by the learner, ordered Again < Hard < Good < Easy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "again",
            Self::Hard => "hard",
            Self::Good => "good",
            Self::Easy => "easy",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = ParseEnumError;

    /// Accepts either the name ("good") or the 1-4 button number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::from_value(n).ok_or_else(|| ParseEnumError::new("rating", s));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "again" => Ok(Self::Again),
            "hard" => Ok(Self::Hard),
            "good" => Ok(Self::Good),
            "easy" => Ok(Self::Easy),
            _ => Err(ParseEnumError::new("rating", s)),
        }
    }
}

/// Spaced repetition record for one (user, word, reading) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Assigned by the store on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    pub key: CardKey,
    #[serde(default)]
    pub state: CardState,
    /// Position within the learning/relearning steps
    #[serde(default)]
    pub step: Option<u32>,
    /// Days until recall probability decays to 90%
    #[serde(default)]
    pub stability: Option<f64>,
    /// Intrinsic hardness in [1, 10]
    #[serde(default)]
    pub difficulty: Option<f64>,
    pub due: DateTime<Utc>,
    #[serde(default)]
    pub last_review: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// A never-reviewed card, due immediately
    pub fn new(key: CardKey, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            key,
            state: CardState::New,
            step: None,
            stability: None,
            difficulty: None,
            due: now,
            last_review: None,
            created_at: now,
        }
    }

    /// Return the stored card if there is one, otherwise a fresh one for `key`
    pub fn ensure(existing: Option<Card>, key: &CardKey, now: DateTime<Utc>) -> Self {
        existing.unwrap_or_else(|| Self::new(key.clone(), now))
    }

    /// Memory state, present once the card has been reviewed at least once
    pub fn memory(&self) -> Option<(f64, f64)> {
        self.stability.zip(self.difficulty)
    }

    /// Whether the card carries any scheduling history worth restoring
    pub fn has_history(&self) -> bool {
        self.stability.map_or(false, |s| s > 0.0)
    }

    /// Interval chosen at the last scheduling decision, in whole days
    pub fn scheduled_days(&self) -> Option<i64> {
        self.last_review.map(|last| (self.due - last).num_days())
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_override() && self.due <= now
    }
}

/// A single review event, owned by its card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<CardId>,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
    /// Time the learner spent answering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u32>,
}

impl ReviewLog {
    pub fn new(
        card_id: Option<CardId>,
        rating: Rating,
        reviewed_at: DateTime<Utc>,
        duration_ms: Option<u32>,
    ) -> Self {
        Self {
            id: None,
            card_id,
            rating,
            reviewed_at,
            duration_ms,
        }
    }
}

/// Per-user scheduler customisation as stored; absent means defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub user_id: String,
    pub weights: Vec<f64>,
    pub desired_retention: f64,
}

/// How a reading variant of a dictionary word is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingKind {
    /// Spelled with kanji
    Kanji,
    /// Spelled phonetically in kana
    Kana,
    Other,
}

impl ReadingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kanji => "kanji",
            Self::Kana => "kana",
            Self::Other => "other",
        }
    }
}

impl FromStr for ReadingKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kanji" => Ok(Self::Kanji),
            "kana" => Ok(Self::Kana),
            "other" => Ok(Self::Other),
            _ => Err(ParseEnumError::new("reading kind", s)),
        }
    }
}
