//! Probability of each variant having the best conversion rate

use rand::Rng;
use tracing::debug;

use super::sampler::BetaSampler;
use crate::domain::experiment::{ExperimentResultError, Probability, VariantRecord};

/// Estimates win probabilities by paired Monte Carlo trials
#[derive(Debug, Clone)]
pub struct WinProbabilityEngine {
    sampler: BetaSampler,
    max_variants: usize,
}

impl WinProbabilityEngine {
    pub fn new(sampler: BetaSampler, max_variants: usize) -> Self {
        Self {
            sampler,
            max_variants,
        }
    }

    /// Fraction of trials in which `target` strictly beats every alternative
    pub fn simulate_winning_variant<'a, I, R>(
        &self,
        target: &VariantRecord,
        alternatives: I,
        rng: &mut R,
    ) -> Result<Probability, ExperimentResultError>
    where
        I: IntoIterator<Item = &'a VariantRecord>,
        R: Rng + ?Sized,
    {
        let best_alternative = self.sampler.best_of(alternatives, rng)?;
        let target_samples = self.sampler.sample(target, rng)?;

        let wins = target_samples
            .iter()
            .zip(&best_alternative)
            .filter(|(target, best)| target > best)
            .count();

        Ok(wins as f64 / self.sampler.simulations_count() as f64)
    }

    /// Win probability for every variant, aligned with the input.
    ///
    /// The first variant is the control. Each variant is simulated with fresh
    /// draws. The control then reports whatever mass the test variants leave,
    /// so the result always sums to one; if simulation noise pushes the test
    /// variants above one they are rescaled and the control gets zero.
    pub fn probability_of_winning_for_each<R: Rng + ?Sized>(
        &self,
        variants: &[VariantRecord],
        rng: &mut R,
    ) -> Result<Vec<Probability>, ExperimentResultError> {
        if variants.len() > self.max_variants {
            return Err(ExperimentResultError::TooManyVariants {
                count: variants.len(),
                max: self.max_variants,
            });
        }

        if variants.is_empty() {
            return Err(ExperimentResultError::NoControlData);
        }

        let mut probabilities = Vec::with_capacity(variants.len());

        for (index, variant) in variants.iter().enumerate() {
            let alternatives = variants
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, v)| v);

            let probability = self.simulate_winning_variant(variant, alternatives, rng)?;

            debug!(variant = %variant.key, probability, "Simulated win probability");
            probabilities.push(probability);
        }

        let total_test_probability: f64 = probabilities[1..].iter().sum();

        if total_test_probability > 1.0 {
            for probability in &mut probabilities[1..] {
                *probability /= total_test_probability;
            }
            probabilities[0] = 0.0;
        } else {
            probabilities[0] = (1.0 - total_test_probability).max(0.0);
        }

        Ok(probabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::MAX_TEST_VARIANTS;
    use crate::infrastructure::experiment::sampler::BetaPrior;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(simulations_count: usize) -> WinProbabilityEngine {
        WinProbabilityEngine::new(
            BetaSampler::new(BetaPrior::default(), simulations_count).unwrap(),
            MAX_TEST_VARIANTS + 1,
        )
    }

    #[test]
    fn test_identical_variants_split_evenly() {
        let variants = vec![
            VariantRecord::new("control", 100, 100),
            VariantRecord::new("test", 100, 100),
        ];
        let mut rng = StdRng::seed_from_u64(2024);

        let probabilities = engine(100_000)
            .probability_of_winning_for_each(&variants, &mut rng)
            .unwrap();

        assert!((probabilities[0] - 0.5).abs() < 0.02, "{:?}", probabilities);
        assert!((probabilities[1] - 0.5).abs() < 0.02, "{:?}", probabilities);
    }

    #[test]
    fn test_clear_winner() {
        let variants = vec![
            VariantRecord::new("control", 10, 90),
            VariantRecord::new("test", 90, 10),
        ];
        let mut rng = StdRng::seed_from_u64(1);

        let probabilities = engine(100_000)
            .probability_of_winning_for_each(&variants, &mut rng)
            .unwrap();

        assert!(probabilities[1] > 0.95);
        assert!(probabilities[0] < 0.05);
    }

    #[test]
    fn test_control_takes_remaining_mass() {
        let variants = vec![
            VariantRecord::new("control", 50, 50),
            VariantRecord::new("test_1", 45, 55),
            VariantRecord::new("test_2", 55, 45),
        ];
        let mut rng = StdRng::seed_from_u64(5);

        let probabilities = engine(20_000)
            .probability_of_winning_for_each(&variants, &mut rng)
            .unwrap();

        let expected_control = 1.0 - probabilities[1] - probabilities[2];
        assert!((probabilities[0] - expected_control).abs() < 1e-12);
        assert!(probabilities[2] > probabilities[1]);
    }

    #[test]
    fn test_zero_observation_variants() {
        let variants = vec![
            VariantRecord::new("control", 0, 0),
            VariantRecord::new("test", 0, 0),
        ];
        let mut rng = StdRng::seed_from_u64(8);

        let probabilities = engine(50_000)
            .probability_of_winning_for_each(&variants, &mut rng)
            .unwrap();

        assert!(probabilities.iter().all(|p| p.is_finite()));
        assert!((probabilities[1] - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_too_many_variants() {
        let variants: Vec<VariantRecord> = (0..11)
            .map(|i| VariantRecord::new(format!("test_{}", i), 10, 10))
            .collect();
        let mut rng = StdRng::seed_from_u64(0);

        let err = engine(100)
            .probability_of_winning_for_each(&variants, &mut rng)
            .unwrap_err();

        assert_eq!(err, ExperimentResultError::TooManyVariants { count: 11, max: 10 });
    }

    #[test]
    fn test_single_variant_always_wins() {
        let mut rng = StdRng::seed_from_u64(0);
        let probabilities = engine(100)
            .probability_of_winning_for_each(&[VariantRecord::new("control", 3, 4)], &mut rng)
            .unwrap();

        assert_eq!(probabilities, vec![1.0]);
    }

    #[test]
    fn test_seeded_runs_match() {
        let variants = vec![
            VariantRecord::new("control", 20, 80),
            VariantRecord::new("test", 25, 75),
        ];

        let first = engine(10_000)
            .probability_of_winning_for_each(&variants, &mut StdRng::seed_from_u64(77))
            .unwrap();
        let second = engine(10_000)
            .probability_of_winning_for_each(&variants, &mut StdRng::seed_from_u64(77))
            .unwrap();

        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_probabilities_sum_to_one(
            counts in prop::collection::vec((0u64..500, 0u64..500), 2..=10),
            seed in any::<u64>(),
        ) {
            let variants: Vec<VariantRecord> = counts
                .iter()
                .enumerate()
                .map(|(i, (success, failure))| VariantRecord::new(format!("v{}", i), *success, *failure))
                .collect();
            let mut rng = StdRng::seed_from_u64(seed);

            let probabilities = engine(2_000)
                .probability_of_winning_for_each(&variants, &mut rng)
                .unwrap();

            prop_assert_eq!(probabilities.len(), variants.len());
            prop_assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
            prop_assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        }
    }
}
