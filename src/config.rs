//! Tunable constants for the affiliation classifier.
//!
//! Defaults reproduce the inclusive tuning (threshold 0.15). A JSON file may
//! override any subset of the fields:
//!
//! ```json
//! { "threshold": 0.5, "extra_known_companies": ["Acme Biologics"] }
//! ```

use crate::error::{PubmedError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default weight of the email domain score
pub const DEFAULT_EMAIL_WEIGHT: f64 = 0.7;

/// Default weight of the affiliation text score
pub const DEFAULT_AFFILIATION_WEIGHT: f64 = 0.3;

/// Combined score must be strictly above this to count as industry
pub const DEFAULT_THRESHOLD: f64 = 0.15;

/// Score for an email domain that exactly ends in an academic suffix
pub const ACADEMIC_SUFFIX_SCORE: f64 = -0.9;

/// Score for an email containing an academic marker anywhere
pub const ACADEMIC_MARKER_SCORE: f64 = -0.8;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Email suffix rule: addresses ending in `suffix` score `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffixRule {
    pub suffix: String,
    pub score: f64,
}

impl SuffixRule {
    pub fn new(suffix: &str, score: f64) -> Self {
        Self {
            suffix: suffix.to_lowercase(),
            score,
        }
    }
}

/// Weights, threshold and suffix rules for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub email_weight: f64,
    pub affiliation_weight: f64,
    pub threshold: f64,
    /// Evaluated in order, first match wins
    pub suffix_rules: Vec<SuffixRule>,
    /// Added to the built-in known-company lexicon
    pub extra_known_companies: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            email_weight: DEFAULT_EMAIL_WEIGHT,
            affiliation_weight: DEFAULT_AFFILIATION_WEIGHT,
            threshold: DEFAULT_THRESHOLD,
            suffix_rules: vec![
                SuffixRule::new(".com", 0.6),
                SuffixRule::new(".biz", 0.8),
                SuffixRule::new(".org", 0.3),
                SuffixRule::new(".net", 0.4),
            ],
            extra_known_companies: Vec::new(),
        }
    }
}

impl ScoringConfig {
    /// Load a config file and validate it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScoringConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(
            path = %path.display(),
            threshold = config.threshold,
            email_weight = config.email_weight,
            "Loaded scoring config"
        );
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Ok(Self::default()),
        }
    }

    /// Check that the combined score stays a convex blend inside [-1, 1].
    pub fn validate(&self) -> Result<()> {
        if !self.email_weight.is_finite() || !self.affiliation_weight.is_finite() {
            return Err(PubmedError::Config(format!(
                "weights must be finite (email={}, affiliation={})",
                self.email_weight, self.affiliation_weight
            )));
        }
        if self.email_weight < 0.0 || self.affiliation_weight < 0.0 {
            return Err(PubmedError::Config(format!(
                "weights must be non-negative (email={}, affiliation={})",
                self.email_weight, self.affiliation_weight
            )));
        }

        let sum = self.email_weight + self.affiliation_weight;
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PubmedError::Config(format!(
                "weights must sum to 1.0, got {}",
                sum
            )));
        }

        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(PubmedError::Config(format!(
                "threshold {} outside [-1, 1]",
                self.threshold
            )));
        }

        for rule in &self.suffix_rules {
            if rule.suffix.is_empty() {
                return Err(PubmedError::Config("empty email suffix rule".to_string()));
            }
            if !(-1.0..=1.0).contains(&rule.score) {
                return Err(PubmedError::Config(format!(
                    "score {} for suffix '{}' outside [-1, 1]",
                    rule.score, rule.suffix
                )));
            }
        }

        Ok(())
    }
}
