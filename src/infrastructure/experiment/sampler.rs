//! Monte Carlo sampling of Beta posteriors
//!
//! Conversion rates are modelled as Beta(prior_success + successes,
//! prior_failure + failures). Every simulation draws a fixed number of trials
//! per variant; trial `i` of one variant is only ever compared with trial `i`
//! of the others.

use rand::Rng;
use rand_distr::{Beta, Distribution};

use crate::config::AnalysisConfig;
use crate::domain::experiment::{ExperimentResultError, VariantRecord};

/// Draws used when no configuration says otherwise
pub const DEFAULT_SIMULATIONS_COUNT: usize = 100_000;

// ============================================================================
// BetaPrior
// ============================================================================

/// Pseudo-counts added to observed successes and failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaPrior {
    pub success: f64,
    pub failure: f64,
}

impl BetaPrior {
    pub fn new(success: f64, failure: f64) -> Self {
        Self { success, failure }
    }
}

impl Default for BetaPrior {
    /// Non-informative prior: no conversion rate is favoured
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

// ============================================================================
// BetaSampler
// ============================================================================

/// Samples conversion-rate posteriors for variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaSampler {
    prior: BetaPrior,
    simulations_count: usize,
}

impl Default for BetaSampler {
    fn default() -> Self {
        Self {
            prior: BetaPrior::default(),
            simulations_count: DEFAULT_SIMULATIONS_COUNT,
        }
    }
}

impl BetaSampler {
    /// Create a sampler, rejecting priors and counts Beta cannot work with
    pub fn new(prior: BetaPrior, simulations_count: usize) -> Result<Self, ExperimentResultError> {
        if !(prior.success > 0.0 && prior.success.is_finite())
            || !(prior.failure > 0.0 && prior.failure.is_finite())
        {
            return Err(ExperimentResultError::InvalidConfiguration(format!(
                "Beta prior must be positive, got ({}, {})",
                prior.success, prior.failure
            )));
        }

        if simulations_count == 0 {
            return Err(ExperimentResultError::InvalidConfiguration(
                "simulations_count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            prior,
            simulations_count,
        })
    }

    /// Create a sampler from analysis settings
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ExperimentResultError> {
        Self::new(
            BetaPrior::new(config.prior_success, config.prior_failure),
            config.simulations_count,
        )
    }

    pub fn prior(&self) -> BetaPrior {
        self.prior
    }

    pub fn simulations_count(&self) -> usize {
        self.simulations_count
    }

    /// Posterior distribution of a variant's conversion rate
    pub fn posterior(&self, variant: &VariantRecord) -> Result<Beta<f64>, ExperimentResultError> {
        Beta::new(
            self.prior.success + variant.success_count as f64,
            self.prior.failure + variant.failure_count as f64,
        )
        .map_err(|e| {
            ExperimentResultError::Sampling(format!(
                "invalid posterior for variant '{}': {}",
                variant.key, e
            ))
        })
    }

    /// Draw `simulations_count` conversion rates for a variant
    pub fn sample<R: Rng + ?Sized>(
        &self,
        variant: &VariantRecord,
        rng: &mut R,
    ) -> Result<Vec<f64>, ExperimentResultError> {
        let posterior = self.posterior(variant)?;

        Ok((0..self.simulations_count)
            .map(|_| posterior.sample(rng))
            .collect())
    }

    /// Per-trial maximum conversion rate across the given variants.
    ///
    /// Variants are sampled in iteration order. With no variants every trial
    /// is `-inf`, so any target beats it and loses nothing against it.
    pub fn best_of<'a, I, R>(
        &self,
        variants: I,
        rng: &mut R,
    ) -> Result<Vec<f64>, ExperimentResultError>
    where
        I: IntoIterator<Item = &'a VariantRecord>,
        R: Rng + ?Sized,
    {
        let mut best = vec![f64::NEG_INFINITY; self.simulations_count];

        for variant in variants {
            let samples = self.sample(variant, rng)?;

            for (current, sample) in best.iter_mut().zip(samples) {
                if sample > *current {
                    *current = sample;
                }
            }
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mean(samples: &[f64]) -> f64 {
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    #[test]
    fn test_defaults() {
        let sampler = BetaSampler::default();
        assert_eq!(sampler.prior(), BetaPrior::new(1.0, 1.0));
        assert_eq!(sampler.simulations_count(), 100_000);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        assert!(BetaSampler::new(BetaPrior::new(0.0, 1.0), 10).is_err());
        assert!(BetaSampler::new(BetaPrior::new(1.0, -2.0), 10).is_err());
        assert!(BetaSampler::new(BetaPrior::new(f64::INFINITY, 1.0), 10).is_err());
        assert!(BetaSampler::new(BetaPrior::default(), 0).is_err());
    }

    #[test]
    fn test_samples_are_rates() {
        let sampler = BetaSampler::new(BetaPrior::default(), 5_000).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let samples = sampler
            .sample(&VariantRecord::new("test", 30, 70), &mut rng)
            .unwrap();

        assert_eq!(samples.len(), 5_000);
        assert!(samples.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_posterior_mean() {
        // Beta(31, 71) has mean 31 / 102
        let sampler = BetaSampler::new(BetaPrior::default(), 50_000).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let samples = sampler
            .sample(&VariantRecord::new("test", 30, 70), &mut rng)
            .unwrap();

        assert!((mean(&samples) - 31.0 / 102.0).abs() < 0.005);
    }

    #[test]
    fn test_zero_observations_follow_prior() {
        // Uniform prior with no data: mean 0.5
        let sampler = BetaSampler::new(BetaPrior::default(), 50_000).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let samples = sampler
            .sample(&VariantRecord::new("empty", 0, 0), &mut rng)
            .unwrap();

        assert!((mean(&samples) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let sampler = BetaSampler::new(BetaPrior::default(), 1_000).unwrap();
        let variant = VariantRecord::new("test", 5, 15);

        let first = sampler
            .sample(&variant, &mut StdRng::seed_from_u64(99))
            .unwrap();
        let second = sampler
            .sample(&variant, &mut StdRng::seed_from_u64(99))
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_best_of() {
        let sampler = BetaSampler::new(BetaPrior::default(), 1_000).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        let none = sampler.best_of(std::iter::empty(), &mut rng).unwrap();
        assert!(none.iter().all(|s| *s == f64::NEG_INFINITY));

        let low = VariantRecord::new("low", 1, 999);
        let high = VariantRecord::new("high", 999, 1);
        let best = sampler.best_of([&low, &high], &mut rng).unwrap();
        assert!(best.iter().all(|s| *s > 0.9));
    }
}
