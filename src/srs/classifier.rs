//! Coarse known-state labels derived from a card snapshot

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::models::{Card, CardState};

/// Cards scheduled at least this many days out count as mature
pub const MATURE_INTERVAL_DAYS: i64 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KnownState {
    New,
    Young,
    Mature,
    Mastered,
    Blacklisted,
}

impl KnownState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Young => "young",
            Self::Mature => "mature",
            Self::Mastered => "mastered",
            Self::Blacklisted => "blacklisted",
        }
    }
}

impl std::fmt::Display for KnownState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(card: &Card) -> KnownState {
    match card.state {
        CardState::Blacklisted => KnownState::Blacklisted,
        CardState::Mastered => KnownState::Mastered,
        _ => match card.scheduled_days() {
            None => KnownState::New,
            Some(days) if days < MATURE_INTERVAL_DAYS => KnownState::Young,
            Some(_) => KnownState::Mature,
        },
    }
}

/// A missing card is simply new
pub fn classify_optional(card: Option<&Card>) -> KnownState {
    card.map_or(KnownState::New, classify)
}

bitflags! {
    /// Union of labels that apply to one word at the same time, e.g. a
    /// direct card plus an inherited word-set override.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KnownStateSet: u8 {
        const NEW = 1;
        const YOUNG = 1 << 1;
        const MATURE = 1 << 2;
        const MASTERED = 1 << 3;
        const BLACKLISTED = 1 << 4;
    }
}

impl KnownStateSet {
    pub fn states(self) -> Vec<KnownState> {
        [
            (Self::NEW, KnownState::New),
            (Self::YOUNG, KnownState::Young),
            (Self::MATURE, KnownState::Mature),
            (Self::MASTERED, KnownState::Mastered),
            (Self::BLACKLISTED, KnownState::Blacklisted),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, state)| state)
        .collect()
    }
}

impl From<KnownState> for KnownStateSet {
    fn from(state: KnownState) -> Self {
        match state {
            KnownState::New => Self::NEW,
            KnownState::Young => Self::YOUNG,
            KnownState::Mature => Self::MATURE,
            KnownState::Mastered => Self::MASTERED,
            KnownState::Blacklisted => Self::BLACKLISTED,
        }
    }
}

impl FromIterator<KnownState> for KnownStateSet {
    fn from_iter<I: IntoIterator<Item = KnownState>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, state| set | Self::from(state))
    }
}
