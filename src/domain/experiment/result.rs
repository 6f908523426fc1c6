//! Experiment result types for Bayesian analysis

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::funnel::{FunnelBreakdown, FunnelQueryParams};
use super::variant::VariantRecord;

/// Probability in `[0, 1]`
pub type Probability = f64;

/// Loss reported when there is not enough data to trust any estimate
pub const MAX_UNCERTAINTY_LOSS: f64 = 1.0;

// ============================================================================
// SignificanceCode
// ============================================================================

/// Outcome of the significance decision procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceCode {
    Significant,
    NotEnoughExposure,
    LowWinProbability,
    HighLoss,
}

impl SignificanceCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Significant => "significant",
            Self::NotEnoughExposure => "not_enough_exposure",
            Self::LowWinProbability => "low_win_probability",
            Self::HighLoss => "high_loss",
        }
    }

    pub fn is_significant(&self) -> bool {
        matches!(self, Self::Significant)
    }
}

impl fmt::Display for SignificanceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Significance
// ============================================================================

/// Significance code together with the expected loss that backs it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Significance {
    pub code: SignificanceCode,
    pub expected_loss: f64,
}

impl Significance {
    pub fn new(code: SignificanceCode, expected_loss: f64) -> Self {
        Self {
            code,
            expected_loss,
        }
    }

    /// Result for a gate that rejected the data before any loss was computed
    pub fn inconclusive(code: SignificanceCode) -> Self {
        Self::new(code, MAX_UNCERTAINTY_LOSS)
    }
}

// ============================================================================
// ExperimentOutcome
// ============================================================================

/// Computed statistics for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    /// Win probability per variant key; sums to 1
    pub probability_by_variant: BTreeMap<String, Probability>,
    pub significance_code: SignificanceCode,
    /// Expected conversion-rate loss of shipping the best test variant
    pub expected_loss: f64,
    /// Control first, then test variants in input order
    pub variants: Vec<VariantRecord>,
}

impl ExperimentOutcome {
    /// Assemble an outcome from variants and their aligned probabilities
    pub fn new(
        variants: Vec<VariantRecord>,
        probabilities: &[Probability],
        significance: Significance,
    ) -> Self {
        let probability_by_variant = variants
            .iter()
            .zip(probabilities)
            .map(|(variant, probability)| (variant.key.clone(), *probability))
            .collect();

        Self {
            probability_by_variant,
            significance_code: significance.code,
            expected_loss: significance.expected_loss,
            variants,
        }
    }

    pub fn is_significant(&self) -> bool {
        self.significance_code.is_significant()
    }

    /// Win probability of a variant
    pub fn probability_of(&self, key: &str) -> Option<Probability> {
        self.probability_by_variant.get(key).copied()
    }

    /// Variant with the highest win probability
    pub fn leading_variant(&self) -> Option<&str> {
        self.probability_by_variant
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(key, _)| key.as_str())
    }
}

// ============================================================================
// ExperimentResultsPayload
// ============================================================================

/// Result payload returned to API consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResultsPayload {
    /// Funnel breakdowns for the declared variants
    pub insight: Vec<FunnelBreakdown>,
    pub probability: BTreeMap<String, Probability>,
    pub significant: bool,
    pub filters: FunnelQueryParams,
    pub significance_code: SignificanceCode,
    pub expected_loss: f64,
    pub variants: Vec<VariantRecord>,
}

impl ExperimentResultsPayload {
    pub fn new(
        insight: Vec<FunnelBreakdown>,
        filters: FunnelQueryParams,
        outcome: ExperimentOutcome,
    ) -> Self {
        Self {
            insight,
            significant: outcome.is_significant(),
            probability: outcome.probability_by_variant,
            filters,
            significance_code: outcome.significance_code,
            expected_loss: outcome.expected_loss,
            variants: outcome.variants,
        }
    }
}
