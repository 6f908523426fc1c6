//! Funnel experiment analysis
//!
//! Turns per-variant funnel breakdowns into win probabilities and a
//! significance decision. Control is always the variant keyed `control`;
//! every other declared variant is a test variant.

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use super::expected_loss::ExpectedLossEngine;
use super::sampler::BetaSampler;
use super::significance::{SignificanceClassifier, SignificanceThresholds};
use super::win_probability::WinProbabilityEngine;
use crate::config::AnalysisConfig;
use crate::domain::experiment::{
    validate_event_variants, ExperimentOutcome, ExperimentResultError, FunnelBreakdown,
    VariantRecord,
};

/// Validated control and test variants of one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPartition {
    pub control: VariantRecord,
    pub test_variants: Vec<VariantRecord>,
}

impl VariantPartition {
    /// Control first, then test variants in input order
    pub fn ordered(&self) -> Vec<VariantRecord> {
        std::iter::once(self.control.clone())
            .chain(self.test_variants.iter().cloned())
            .collect()
    }
}

/// Outcome of analysing funnel breakdowns
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelAnalysis {
    /// Breakdowns that belong to declared variants
    pub insight: Vec<FunnelBreakdown>,
    pub outcome: ExperimentOutcome,
}

/// Computes experiment results from funnel aggregates
#[derive(Debug, Clone)]
pub struct FunnelExperimentAnalyzer {
    max_variants: usize,
    win_engine: WinProbabilityEngine,
    classifier: SignificanceClassifier,
}

impl FunnelExperimentAnalyzer {
    /// Create an analyzer from validated settings
    pub fn new(config: &AnalysisConfig) -> Result<Self, ExperimentResultError> {
        config.validate()?;

        let sampler = BetaSampler::from_config(config)?;

        Ok(Self {
            max_variants: config.max_variants,
            win_engine: WinProbabilityEngine::new(sampler, config.max_variants),
            classifier: SignificanceClassifier::new(
                SignificanceThresholds::from(config),
                ExpectedLossEngine::new(sampler),
            ),
        })
    }

    /// Analyse raw funnel breakdowns for the declared flag variants
    pub fn analyze_funnel<R: Rng + ?Sized>(
        &self,
        funnel_results: &[FunnelBreakdown],
        declared_variants: &[String],
        rng: &mut R,
    ) -> Result<FunnelAnalysis, ExperimentResultError> {
        validate_event_variants(funnel_results, declared_variants)?;

        let insight = filter_declared(funnel_results, declared_variants);

        debug!(
            breakdowns = funnel_results.len(),
            declared = insight.len(),
            "Filtered funnel results to declared variants"
        );

        let variants: Vec<VariantRecord> = insight
            .iter()
            .filter_map(FunnelBreakdown::to_variant_record)
            .collect();

        let outcome = self.analyze(variants, rng)?;

        Ok(FunnelAnalysis { insight, outcome })
    }

    /// Analyse per-variant counts
    pub fn analyze<R: Rng + ?Sized>(
        &self,
        variants: Vec<VariantRecord>,
        rng: &mut R,
    ) -> Result<ExperimentOutcome, ExperimentResultError> {
        let partition = self.partition(variants)?;
        let ordered = partition.ordered();

        let probabilities = self
            .win_engine
            .probability_of_winning_for_each(&ordered, rng)?;

        let significance = self.classifier.classify(
            &partition.control,
            &partition.test_variants,
            &probabilities,
            rng,
        )?;

        debug!(
            code = %significance.code,
            expected_loss = significance.expected_loss,
            "Classified experiment results"
        );

        Ok(ExperimentOutcome::new(ordered, &probabilities, significance))
    }

    /// Split variants into control and test variants, enforcing count limits
    pub fn partition(
        &self,
        variants: Vec<VariantRecord>,
    ) -> Result<VariantPartition, ExperimentResultError> {
        if variants.is_empty() {
            return Err(ExperimentResultError::NoEventsIngested);
        }

        let mut seen = HashSet::new();
        let mut control = None;
        let mut test_variants = Vec::new();

        for variant in variants {
            if !seen.insert(variant.key.clone()) {
                return Err(ExperimentResultError::DuplicateVariant(variant.key));
            }

            if variant.is_control() {
                control = Some(variant);
            } else {
                test_variants.push(variant);
            }
        }

        let control = control.ok_or(ExperimentResultError::NoControlData)?;

        if test_variants.len() >= self.max_variants {
            return Err(ExperimentResultError::TooManyVariants {
                count: test_variants.len() + 1,
                max: self.max_variants,
            });
        }

        if test_variants.is_empty() {
            return Err(ExperimentResultError::NoTestVariantData);
        }

        Ok(VariantPartition {
            control,
            test_variants,
        })
    }
}

/// Keep the breakdowns whose variant key was declared on the flag
pub fn filter_declared(
    funnel_results: &[FunnelBreakdown],
    declared_variants: &[String],
) -> Vec<FunnelBreakdown> {
    funnel_results
        .iter()
        .filter(|breakdown| {
            breakdown
                .variant_key()
                .is_some_and(|key| declared_variants.iter().any(|d| d == key))
        })
        .cloned()
        .collect()
}
