//! FSRS spaced repetition scheduler
//!
//! Memory is modelled by two numbers per card:
//! - stability `S`: days until predicted recall drops to 90%
//! - difficulty `D`: intrinsic hardness, clamped to [1, 10]
//!
//! Recall probability follows a power-law forgetting curve
//! `R(t) = (1 + FACTOR * t / S) ^ DECAY`, and the next interval is the `t`
//! at which `R(t)` reaches the desired retention.
//!
//! New cards walk through short fixed learning steps; lapsed review cards
//! walk through relearning steps. Both graduate to `Review` with an interval
//! seeded from stability.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::config::{SchedulerConfig, MAX_INTERVAL_CEILING_DAYS};

use super::models::{Card, CardState, Rating, ReviewLog};
use super::params::{Parameters, Weights};

/// Forgetting curve exponent
pub const DECAY: f64 = -0.5;

/// Chosen so that `R(S) = 0.9`: `0.9^(1 / DECAY) - 1`
pub const FACTOR: f64 = 19.0 / 81.0;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

pub const MIN_STABILITY: f64 = 0.001;
pub const MAX_STABILITY: f64 = 1.0e7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Card is {0}; override states are not scheduled")]
    OverrideState(CardState),

    #[error("Review at {at} precedes the last review at {last}")]
    OutOfOrder {
        at: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Card and log produced by one review; persisted together or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub card: Card,
    pub log: ReviewLog,
}

/// Predicted recall probability after `elapsed_days` at `stability`
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    (1.0 + FACTOR * elapsed_days.max(0.0) / stability).powf(DECAY)
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    params: Parameters,
    learning_steps: Vec<Duration>,
    relearning_steps: Vec<Duration>,
    maximum_interval_days: u32,
}

impl Scheduler {
    pub fn new(params: Parameters, config: &SchedulerConfig) -> Self {
        Self {
            params,
            learning_steps: config.learning_steps(),
            relearning_steps: config.relearning_steps(),
            maximum_interval_days: config
                .maximum_interval_days
                .clamp(1, MAX_INTERVAL_CEILING_DAYS),
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    fn w(&self) -> &Weights {
        &self.params.weights
    }

    /// Apply one rating to a card at `now`.
    ///
    /// Pure: the input card is not modified and nothing is persisted.
    pub fn review(
        &self,
        card: &Card,
        rating: Rating,
        now: DateTime<Utc>,
        duration_ms: Option<u32>,
    ) -> Result<ReviewOutcome> {
        if card.state.is_override() {
            return Err(ScheduleError::OverrideState(card.state));
        }
        if let Some(last) = card.last_review {
            if now < last {
                return Err(ScheduleError::OutOfOrder { at: now, last });
            }
        }

        let mut next = card.clone();
        let interval = match card.memory() {
            None => {
                next.stability = Some(self.initial_stability(rating));
                next.difficulty = Some(self.initial_difficulty(rating));
                next.state = CardState::Learning;
                next.step = Some(0);
                self.step(&mut next, rating, StepKind::Learning)
            }
            Some((stability, difficulty)) => {
                let elapsed_days = card.last_review.map(|last| (now - last).num_days());
                let (stability, difficulty) =
                    self.next_memory(stability, difficulty, elapsed_days, rating);
                next.stability = Some(stability);
                next.difficulty = Some(difficulty);

                match card.state {
                    CardState::New | CardState::Learning => {
                        next.state = CardState::Learning;
                        self.step(&mut next, rating, StepKind::Learning)
                    }
                    CardState::Relearning => self.step(&mut next, rating, StepKind::Relearning),
                    CardState::Review => {
                        if rating == Rating::Again && !self.relearning_steps.is_empty() {
                            next.state = CardState::Relearning;
                            next.step = Some(0);
                            self.relearning_steps[0]
                        } else {
                            self.review_interval(stability)
                        }
                    }
                    CardState::Mastered | CardState::Blacklisted => {
                        return Err(ScheduleError::OverrideState(card.state))
                    }
                }
            }
        };

        next.due = now + interval;
        next.last_review = Some(now);

        Ok(ReviewOutcome {
            log: ReviewLog::new(card.id, rating, now, duration_ms),
            card: next,
        })
    }

    /// Due time each rating would produce, without changing anything
    pub fn preview(&self, card: &Card, now: DateTime<Utc>) -> Result<Vec<(Rating, DateTime<Utc>)>> {
        Rating::ALL
            .iter()
            .map(|&rating| {
                self.review(card, rating, now, None)
                    .map(|outcome| (rating, outcome.card.due))
            })
            .collect()
    }

    /// Walk the learning or relearning steps and return the next interval
    fn step(&self, card: &mut Card, rating: Rating, kind: StepKind) -> Duration {
        let steps = match kind {
            StepKind::Learning => &self.learning_steps,
            StepKind::Relearning => &self.relearning_steps,
        };
        let step = card.step.unwrap_or(0) as usize;

        // Also covers cards left beyond the last step by a longer step config
        if steps.is_empty() || (step >= steps.len() && rating != Rating::Again) {
            return self.graduate(card);
        }

        match rating {
            Rating::Again => {
                card.step = Some(0);
                steps[0]
            }
            Rating::Hard => {
                if step == 0 && steps.len() == 1 {
                    scale(steps[0], 1.5)
                } else if step == 0 {
                    (steps[0] + steps[1]) / 2
                } else {
                    steps[step]
                }
            }
            Rating::Good => {
                if step + 1 >= steps.len() {
                    self.graduate(card)
                } else {
                    card.step = Some(step as u32 + 1);
                    steps[step + 1]
                }
            }
            Rating::Easy => self.graduate(card),
        }
    }

    fn graduate(&self, card: &mut Card) -> Duration {
        card.state = CardState::Review;
        card.step = None;
        self.review_interval(card.stability.unwrap_or(MIN_STABILITY))
    }

    /// Interval at which recall is predicted to fall to the desired retention.
    ///
    /// Rounded to whole days, at least one. The upper bound is the configured
    /// `maximum_interval_days` (36500 by default, at most 365000) so that due
    /// dates stay representable; it is not a pedagogical cap.
    fn review_interval(&self, stability: f64) -> Duration {
        let retention = self.params.desired_retention;
        let days = stability / FACTOR * (retention.powf(1.0 / DECAY) - 1.0);
        let days = if days.is_finite() { days.round() } else { f64::MAX };
        let days = days.clamp(1.0, f64::from(self.maximum_interval_days));
        Duration::days(days as i64)
    }

    fn next_memory(
        &self,
        stability: f64,
        difficulty: f64,
        elapsed_days: Option<i64>,
        rating: Rating,
    ) -> (f64, f64) {
        let next_stability = match elapsed_days {
            Some(days) if days >= 1 => {
                let r = retrievability(days as f64, stability);
                if rating == Rating::Again {
                    self.forget_stability(stability, difficulty, r)
                } else {
                    self.recall_stability(stability, difficulty, r, rating)
                }
            }
            // Same-day review
            _ => self.short_term_stability(stability, rating),
        };

        (
            clamp_stability(next_stability),
            self.next_difficulty(difficulty, rating),
        )
    }

    fn initial_stability(&self, rating: Rating) -> f64 {
        clamp_stability(self.w()[rating.value() as usize - 1])
    }

    fn initial_difficulty(&self, rating: Rating) -> f64 {
        let w = self.w();
        let g = f64::from(rating.value());
        clamp_difficulty(w[4] - (w[5] * (g - 1.0)).exp() + 1.0, MAX_DIFFICULTY)
    }

    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let w = self.w();
        let g = f64::from(rating.value());
        let delta = -w[6] * (g - 3.0);
        // Linear damping: steps shrink as difficulty approaches the ceiling
        let damped = difficulty + delta * (MAX_DIFFICULTY - difficulty) / 9.0;
        let target = self.initial_difficulty(Rating::Easy);
        let reverted = w[7] * target + (1.0 - w[7]) * damped;
        clamp_difficulty(reverted, difficulty)
    }

    fn recall_stability(&self, stability: f64, difficulty: f64, r: f64, rating: Rating) -> f64 {
        let w = self.w();
        let hard_penalty = if rating == Rating::Hard { w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { w[16] } else { 1.0 };
        stability
            * (1.0
                + w[8].exp()
                    * (11.0 - difficulty)
                    * stability.powf(-w[9])
                    * ((w[10] * (1.0 - r)).exp() - 1.0)
                    * hard_penalty
                    * easy_bonus)
    }

    fn forget_stability(&self, stability: f64, difficulty: f64, r: f64) -> f64 {
        let w = self.w();
        let long_term = w[11]
            * difficulty.powf(-w[12])
            * ((stability + 1.0).powf(w[13]) - 1.0)
            * (w[14] * (1.0 - r)).exp();
        let short_term_floor = stability / (w[17] * w[18]).exp();
        long_term.min(short_term_floor)
    }

    fn short_term_stability(&self, stability: f64, rating: Rating) -> f64 {
        let w = self.w();
        let g = f64::from(rating.value());
        stability * (w[17] * (g - 3.0 + w[18])).exp()
    }
}

#[derive(Debug, Clone, Copy)]
enum StepKind {
    Learning,
    Relearning,
}

fn clamp_stability(stability: f64) -> f64 {
    if stability.is_nan() {
        MIN_STABILITY
    } else {
        stability.clamp(MIN_STABILITY, MAX_STABILITY)
    }
}

fn clamp_difficulty(difficulty: f64, fallback: f64) -> f64 {
    let value = if difficulty.is_nan() { fallback } else { difficulty };
    value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::milliseconds((duration.num_milliseconds() as f64 * factor).round() as i64)
}

/// Format an interval for display: `now`, `10m`, `5h`, `3d`, `2w`, `4mo`, `1y`
pub fn format_interval(interval: Duration) -> String {
    let minutes = interval.num_minutes();
    let days = interval.num_days();

    if minutes < 1 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if days < 1 {
        format!("{}h", interval.num_hours())
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}
