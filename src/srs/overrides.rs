//! Manual override operations that bypass the scheduler

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{Card, CardKey, CardState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideOp {
    MasterAdd,
    MasterRemove,
    BlacklistAdd,
    BlacklistRemove,
    /// Delete the card and its review history
    Forget,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown override operation: {0}")]
pub struct UnknownOverrideOp(String);

impl OverrideOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MasterAdd => "master-add",
            Self::MasterRemove => "master-remove",
            Self::BlacklistAdd => "blacklist-add",
            Self::BlacklistRemove => "blacklist-remove",
            Self::Forget => "forget",
        }
    }

    /// Operations that take a card out of an override (or delete it)
    pub fn is_removal(self) -> bool {
        matches!(self, Self::MasterRemove | Self::BlacklistRemove | Self::Forget)
    }
}

impl fmt::Display for OverrideOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideOp {
    type Err = UnknownOverrideOp;

    /// Accepts the legacy `neverForget-*` spelling for the master operations
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "master-add" | "neverForget-add" => Ok(Self::MasterAdd),
            "master-remove" | "neverForget-remove" => Ok(Self::MasterRemove),
            "blacklist-add" => Ok(Self::BlacklistAdd),
            "blacklist-remove" => Ok(Self::BlacklistRemove),
            "forget" => Ok(Self::Forget),
            other => Err(UnknownOverrideOp(other.to_string())),
        }
    }
}

/// What the store has to do after an override
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideEffect {
    Upsert(Card),
    Delete(Card),
    /// Already in the requested state, or nothing to remove
    Unchanged(Option<Card>),
}

impl OverrideEffect {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }

    /// Card as it exists after the override, if any
    pub fn resulting_card(&self) -> Option<&Card> {
        match self {
            Self::Upsert(card) => Some(card),
            Self::Delete(_) => None,
            Self::Unchanged(card) => card.as_ref(),
        }
    }
}

/// Compute the effect of `op` on the stored card (if any). Idempotent.
pub fn apply_override(
    existing: Option<Card>,
    key: &CardKey,
    op: OverrideOp,
    now: DateTime<Utc>,
) -> OverrideEffect {
    match op {
        OverrideOp::MasterAdd => {
            let mut card = Card::ensure(existing, key, now);
            if card.state == CardState::Mastered {
                return OverrideEffect::Unchanged(Some(card));
            }
            card.state = CardState::Mastered;
            card.due = now;
            card.last_review = Some(now);
            OverrideEffect::Upsert(card)
        }
        OverrideOp::BlacklistAdd => {
            let mut card = Card::ensure(existing, key, now);
            if card.state == CardState::Blacklisted {
                return OverrideEffect::Unchanged(Some(card));
            }
            card.state = CardState::Blacklisted;
            OverrideEffect::Upsert(card)
        }
        OverrideOp::MasterRemove => remove(existing, CardState::Mastered),
        OverrideOp::BlacklistRemove => remove(existing, CardState::Blacklisted),
        OverrideOp::Forget => match existing {
            Some(card) => OverrideEffect::Delete(card),
            None => OverrideEffect::Unchanged(None),
        },
    }
}

fn remove(existing: Option<Card>, state: CardState) -> OverrideEffect {
    match existing {
        Some(mut card) if card.state == state => {
            restore_state(&mut card);
            OverrideEffect::Upsert(card)
        }
        other => OverrideEffect::Unchanged(other),
    }
}

/// Put a card leaving an override back into scheduling
pub fn restore_state(card: &mut Card) {
    if card.has_history() {
        card.state = CardState::Review;
        card.step = None;
    } else {
        card.state = CardState::Learning;
        card.step = Some(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap()
    }

    fn key() -> CardKey {
        CardKey::new("u1", 500, 0)
    }

    fn reviewed() -> Card {
        let mut card = Card::new(key(), now() - Duration::days(30));
        card.id = Some(1);
        card.state = CardState::Review;
        card.stability = Some(8.0);
        card.difficulty = Some(6.0);
        card.last_review = Some(now() - Duration::days(2));
        card.due = now() + Duration::days(6);
        card
    }

    #[test]
    fn test_parse_ops() {
        assert_eq!("master-add".parse::<OverrideOp>().unwrap(), OverrideOp::MasterAdd);
        assert_eq!("neverForget-remove".parse::<OverrideOp>().unwrap(), OverrideOp::MasterRemove);
        assert_eq!("forget".parse::<OverrideOp>().unwrap(), OverrideOp::Forget);
        assert!("blacklist".parse::<OverrideOp>().is_err());
        for op in [
            OverrideOp::MasterAdd,
            OverrideOp::MasterRemove,
            OverrideOp::BlacklistAdd,
            OverrideOp::BlacklistRemove,
            OverrideOp::Forget,
        ] {
            assert_eq!(op.as_str().parse::<OverrideOp>().unwrap(), op);
        }
    }

    #[test]
    fn test_master_add_is_idempotent() {
        let once = match apply_override(Some(reviewed()), &key(), OverrideOp::MasterAdd, now()) {
            OverrideEffect::Upsert(card) => card,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(once.state, CardState::Mastered);
        assert_eq!(once.due, now());
        assert_eq!(once.last_review, Some(now()));

        let later = now() + Duration::hours(1);
        let twice = apply_override(Some(once.clone()), &key(), OverrideOp::MasterAdd, later);
        assert_eq!(twice, OverrideEffect::Unchanged(Some(once)));
    }

    #[test]
    fn test_blacklist_keeps_schedule() {
        let card = reviewed();
        let effect = apply_override(Some(card.clone()), &key(), OverrideOp::BlacklistAdd, now());
        let OverrideEffect::Upsert(blacklisted) = effect else {
            panic!("expected upsert");
        };
        assert_eq!(blacklisted.state, CardState::Blacklisted);
        assert_eq!(blacklisted.due, card.due);
        assert_eq!(blacklisted.last_review, card.last_review);
    }

    #[test]
    fn test_override_creates_missing_card() {
        let effect = apply_override(None, &key(), OverrideOp::BlacklistAdd, now());
        let card = effect.resulting_card().unwrap();
        assert_eq!(card.state, CardState::Blacklisted);
        assert_eq!(card.id, None);
        assert_eq!(card.created_at, now());
    }

    #[test]
    fn test_remove_restores_review_or_learning() {
        let mut mastered = reviewed();
        mastered.state = CardState::Mastered;
        let effect = apply_override(Some(mastered), &key(), OverrideOp::MasterRemove, now());
        assert_eq!(effect.resulting_card().unwrap().state, CardState::Review);

        let mut never_reviewed = Card::new(key(), now());
        never_reviewed.state = CardState::Blacklisted;
        let effect = apply_override(Some(never_reviewed), &key(), OverrideOp::BlacklistRemove, now());
        let card = effect.resulting_card().unwrap();
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.step, Some(0));
    }

    #[test]
    fn test_removals_without_match_are_noops() {
        assert_eq!(
            apply_override(None, &key(), OverrideOp::MasterRemove, now()),
            OverrideEffect::Unchanged(None)
        );
        assert_eq!(
            apply_override(None, &key(), OverrideOp::Forget, now()),
            OverrideEffect::Unchanged(None)
        );

        // Removing a blacklist from a mastered card leaves it mastered
        let mut mastered = reviewed();
        mastered.state = CardState::Mastered;
        let effect = apply_override(Some(mastered.clone()), &key(), OverrideOp::BlacklistRemove, now());
        assert!(!effect.is_change());
        assert_eq!(effect.resulting_card(), Some(&mastered));
    }

    #[test]
    fn test_forget_deletes() {
        let effect = apply_override(Some(reviewed()), &key(), OverrideOp::Forget, now());
        assert!(matches!(effect, OverrideEffect::Delete(_)));
        assert_eq!(effect.resulting_card(), None);
    }
}
