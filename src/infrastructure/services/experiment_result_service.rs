//! Experiment result service
//!
//! Fetches funnel breakdowns for a feature flag experiment and runs the
//! Bayesian analysis over them.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::domain::experiment::{
    ExperimentResultsPayload, ExperimentWindow, FeatureFlag, FunnelQuery, FunnelQueryParams,
};
use crate::domain::DomainError;
use crate::infrastructure::experiment::FunnelExperimentAnalyzer;
use crate::infrastructure::metrics;

// ============================================================================
// Experiment Result Service
// ============================================================================

/// Service computing experiment results from funnel data
pub struct ExperimentResultService<Q: FunnelQuery> {
    funnel_query: Arc<Q>,
    analyzer: Arc<FunnelExperimentAnalyzer>,
    seed: Option<u64>,
}

impl<Q: FunnelQuery> ExperimentResultService<Q> {
    /// Create a new service drawing fresh randomness on every run
    pub fn new(funnel_query: Arc<Q>, analyzer: FunnelExperimentAnalyzer) -> Self {
        Self {
            funnel_query,
            analyzer: Arc::new(analyzer),
            seed: None,
        }
    }

    /// Seed every run, making results reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Compute results for an experiment
    pub async fn get_results(
        &self,
        flag: &FeatureFlag,
        window: &ExperimentWindow,
    ) -> Result<ExperimentResultsPayload, DomainError> {
        debug!(flag = %flag.key, "Getting experiment results");

        let params = FunnelQueryParams::for_experiment(flag, window);
        let funnel_results = self.funnel_query.run(&params).await?;

        let seed = self.seed.unwrap_or_else(rand::random);
        let declared_variants = flag.variant_keys();
        let analyzer = Arc::clone(&self.analyzer);

        debug!(
            flag = %flag.key,
            breakdowns = funnel_results.len(),
            seed,
            "Running experiment analysis"
        );

        let started = Instant::now();

        // Simulation is CPU bound; keep it off the async workers
        let analysis = tokio::task::spawn_blocking(move || {
            let mut rng = StdRng::seed_from_u64(seed);
            analyzer.analyze_funnel(&funnel_results, &declared_variants, &mut rng)
        })
        .await
        .map_err(|e| DomainError::internal(format!("Analysis task failed: {}", e)))?;

        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(flag = %flag.key, code = %e.code(), "Experiment results rejected: {}", e);
                metrics::record_rejection(&flag.key, &e);
                return Err(e.into());
            }
        };

        let code = analysis.outcome.significance_code;
        metrics::record_analysis(&flag.key, code, started.elapsed());

        info!(
            flag = %flag.key,
            significance_code = %code,
            expected_loss = analysis.outcome.expected_loss,
            leading_variant = analysis.outcome.leading_variant().unwrap_or_default(),
            "Experiment results computed"
        );

        Ok(ExperimentResultsPayload::new(
            analysis.insight,
            params,
            analysis.outcome,
        ))
    }
}
