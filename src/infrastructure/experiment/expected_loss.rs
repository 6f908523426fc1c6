//! Expected loss of choosing a variant
//!
//! The loss of shipping a variant is the conversion-rate uplift given up when
//! the best alternative is actually better. Following VWO's SmartStats paper,
//! it is averaged over posterior draws, so the unit is a conversion rate
//! (0.01 = one percentage point).

use rand::Rng;

use super::sampler::BetaSampler;
use crate::domain::experiment::{ExperimentResultError, VariantRecord};

/// Estimates expected loss by paired Monte Carlo trials
#[derive(Debug, Clone)]
pub struct ExpectedLossEngine {
    sampler: BetaSampler,
}

impl ExpectedLossEngine {
    pub fn new(sampler: BetaSampler) -> Self {
        Self { sampler }
    }

    /// Mean of `max(0, best alternative - target)` across trials
    pub fn expected_loss<R: Rng + ?Sized>(
        &self,
        target: &VariantRecord,
        alternatives: &[VariantRecord],
        rng: &mut R,
    ) -> Result<f64, ExperimentResultError> {
        let best_alternative = self.sampler.best_of(alternatives, rng)?;
        let target_samples = self.sampler.sample(target, rng)?;

        let total_loss: f64 = target_samples
            .iter()
            .zip(&best_alternative)
            .map(|(target, best)| (best - target).max(0.0))
            .sum();

        Ok(total_loss / self.sampler.simulations_count() as f64)
    }
}
