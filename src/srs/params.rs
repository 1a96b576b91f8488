//! Scheduler parameters: default weight set, validation and per-user resolution
//!
//! The weight vector follows the published FSRS-5 layout (19 trained
//! constants). Index meaning:
//!
//! - `w[0..4]`   initial stability for Again/Hard/Good/Easy
//! - `w[4..6]`   initial difficulty
//! - `w[6..8]`   difficulty step and mean reversion
//! - `w[8..11]`  stability growth after a successful recall
//! - `w[11..15]` stability after a lapse
//! - `w[15]`     Hard penalty, `w[16]` Easy bonus
//! - `w[17..19]` same-day (short-term) stability

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::UserSettings;

pub const WEIGHT_COUNT: usize = 19;

/// FSRS-5 default weights
pub const DEFAULT_WEIGHTS: [f64; WEIGHT_COUNT] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

pub const DEFAULT_DESIRED_RETENTION: f64 = 0.9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Expected {expected} weights, got {actual}")]
    WrongWeightCount { expected: usize, actual: usize },

    #[error("Weight {index} is not a number: {value:?}")]
    UnparsableWeight { index: usize, value: String },

    #[error("Weight {index} is not finite")]
    NonFiniteWeight { index: usize },

    #[error("Desired retention must be strictly between 0 and 1, got {0}")]
    RetentionOutOfRange(f64),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// A validated weight vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights([f64; WEIGHT_COUNT]);

impl Weights {
    pub fn new(values: &[f64]) -> Result<Self> {
        if values.len() != WEIGHT_COUNT {
            return Err(SettingsError::WrongWeightCount {
                expected: WEIGHT_COUNT,
                actual: values.len(),
            });
        }
        if let Some(index) = values.iter().position(|w| !w.is_finite()) {
            return Err(SettingsError::NonFiniteWeight { index });
        }

        let mut weights = [0.0; WEIGHT_COUNT];
        weights.copy_from_slice(values);
        Ok(Self(weights))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_WEIGHTS
    }

    /// Comma-separated rendering, parseable by [`parse_weights`]
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self(DEFAULT_WEIGHTS)
    }
}

impl std::ops::Index<usize> for Weights {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

pub fn validate_retention(retention: f64) -> Result<f64> {
    if retention.is_finite() && retention > 0.0 && retention < 1.0 {
        Ok(retention)
    } else {
        Err(SettingsError::RetentionOutOfRange(retention))
    }
}

/// Parse a comma and/or whitespace separated weight list.
///
/// Blank input means "reset to defaults" and yields `None`.
pub fn parse_weights(input: &str) -> Result<Option<Weights>> {
    if input.trim().is_empty() {
        return Ok(None);
    }

    let values = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token
                .parse::<f64>()
                .map_err(|_| SettingsError::UnparsableWeight {
                    index,
                    value: token.to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Weights::new(&values).map(Some)
}

/// Effective scheduler parameters for one user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub weights: Weights,
    pub desired_retention: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            desired_retention: DEFAULT_DESIRED_RETENTION,
        }
    }
}

impl Parameters {
    /// Exactly equal to the compiled-in defaults
    pub fn is_default(&self) -> bool {
        self.weights.is_default() && self.desired_retention == DEFAULT_DESIRED_RETENTION
    }

    /// Resolve stored settings. Weights and retention fall back to defaults
    /// independently when invalid.
    pub fn resolve(stored: Option<&UserSettings>) -> Self {
        let Some(stored) = stored else {
            return Self::default();
        };

        let weights = Weights::new(&stored.weights).unwrap_or_else(|e| {
            log::warn!("Ignoring stored weights for user {}: {}", stored.user_id, e);
            Weights::default()
        });
        let desired_retention = validate_retention(stored.desired_retention).unwrap_or_else(|e| {
            log::warn!("Ignoring stored retention for user {}: {}", stored.user_id, e);
            DEFAULT_DESIRED_RETENTION
        });

        Self {
            weights,
            desired_retention,
        }
    }

    /// Apply an update request on top of the current effective parameters.
    ///
    /// `None` leaves a value as is; blank weight input resets the weights.
    /// Nothing is applied unless every provided value validates.
    pub fn updated(&self, weights_csv: Option<&str>, retention: Option<f64>) -> Result<Self> {
        let weights = match weights_csv {
            None => self.weights,
            Some(csv) => parse_weights(csv)?.unwrap_or_default(),
        };
        let desired_retention = match retention {
            None => self.desired_retention,
            Some(r) => validate_retention(r)?,
        };

        Ok(Self {
            weights,
            desired_retention,
        })
    }

    pub fn to_user_settings(&self, user_id: &str) -> UserSettings {
        UserSettings {
            user_id: user_id.to_string(),
            weights: self.weights.as_slice().to_vec(),
            desired_retention: self.desired_retention,
        }
    }
}

/// Settings as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSettings {
    pub weights: Vec<f64>,
    pub desired_retention: f64,
    pub is_default: bool,
}

impl From<Parameters> for EffectiveSettings {
    fn from(params: Parameters) -> Self {
        Self {
            weights: params.weights.as_slice().to_vec(),
            desired_retention: params.desired_retention,
            is_default: params.is_default(),
        }
    }
}
