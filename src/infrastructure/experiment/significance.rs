//! Significance classification for experiment results
//!
//! Rules are checked in order and the first match decides:
//!
//! 1. every variant needs `min_exposure` observations
//! 2. either the control or the test variants combined need
//!    `min_probability` of the win mass
//! 3. the best test variant's expected loss against the control must stay
//!    below `expected_loss_level`

use rand::Rng;
use tracing::debug;

use super::expected_loss::ExpectedLossEngine;
use crate::config::AnalysisConfig;
use crate::domain::experiment::{
    ExperimentResultError, Probability, Significance, SignificanceCode, VariantRecord,
};

/// Thresholds used by the significance gates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceThresholds {
    pub min_exposure: u64,
    pub min_probability: f64,
    pub expected_loss_level: f64,
}

impl Default for SignificanceThresholds {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for SignificanceThresholds {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            min_exposure: config.min_exposure,
            min_probability: config.min_probability_for_significance,
            expected_loss_level: config.expected_loss_significance_level,
        }
    }
}

/// Decides whether experiment results can be acted on
#[derive(Debug, Clone)]
pub struct SignificanceClassifier {
    thresholds: SignificanceThresholds,
    loss_engine: ExpectedLossEngine,
}

impl SignificanceClassifier {
    pub fn new(thresholds: SignificanceThresholds, loss_engine: ExpectedLossEngine) -> Self {
        Self {
            thresholds,
            loss_engine,
        }
    }

    /// Classify results given win probabilities aligned with
    /// `[control, test_variants...]`
    pub fn classify<R: Rng + ?Sized>(
        &self,
        control: &VariantRecord,
        test_variants: &[VariantRecord],
        probabilities: &[Probability],
        rng: &mut R,
    ) -> Result<Significance, ExperimentResultError> {
        // Allocation can skew wildly while only a few users are enrolled
        let under_exposed = test_variants
            .iter()
            .chain(std::iter::once(control))
            .find(|variant| variant.total() < self.thresholds.min_exposure);

        if let Some(variant) = under_exposed {
            debug!(
                variant = %variant.key,
                total = variant.total(),
                min_exposure = self.thresholds.min_exposure,
                "Variant below exposure threshold"
            );
            return Ok(Significance::inconclusive(SignificanceCode::NotEnoughExposure));
        }

        let control_probability = probabilities.first().copied().unwrap_or(0.0);
        let test_probability: f64 = probabilities.iter().skip(1).sum();

        if control_probability < self.thresholds.min_probability
            && test_probability < self.thresholds.min_probability
        {
            debug!(
                control_probability,
                test_probability, "No side holds enough win probability"
            );
            return Ok(Significance::inconclusive(SignificanceCode::LowWinProbability));
        }

        let best =
            best_test_variant(test_variants).ok_or(ExperimentResultError::NoTestVariantData)?;
        let expected_loss = self
            .loss_engine
            .expected_loss(best, std::slice::from_ref(control), rng)?;

        debug!(variant = %best.key, expected_loss, "Computed expected loss of best test variant");

        let code = if expected_loss >= self.thresholds.expected_loss_level {
            SignificanceCode::HighLoss
        } else {
            SignificanceCode::Significant
        };

        Ok(Significance::new(code, expected_loss))
    }
}

/// Test variant with the highest observed conversion rate.
///
/// Equal rates go to the lexicographically smallest key so the choice never
/// depends on input order.
pub fn best_test_variant(test_variants: &[VariantRecord]) -> Option<&VariantRecord> {
    test_variants.iter().max_by(|a, b| {
        a.conversion_rate()
            .total_cmp(&b.conversion_rate())
            .then_with(|| b.key.cmp(&a.key))
    })
}
