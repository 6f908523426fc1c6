//! Analyze command - computes experiment results from funnel breakdowns

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Args;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::config::{AnalysisConfig, AppConfig};
use crate::domain::experiment::{
    ExperimentResultsPayload, ExperimentWindow, FeatureFlag, FunnelQuery,
};
use crate::domain::DomainError;
use crate::infrastructure::experiment::{
    parse_funnel_results, FunnelExperimentAnalyzer, InMemoryFunnelQuery, JsonFileFunnelQuery,
};
use crate::infrastructure::logging;
use crate::infrastructure::services::ExperimentResultService;

/// Arguments for the analyze command
#[derive(Args, Clone, Debug)]
pub struct AnalyzeArgs {
    /// JSON file with funnel breakdowns (reads stdin when omitted)
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Feature flag key the experiment runs on
    #[arg(long, default_value = "experiment")]
    pub flag: String,

    /// Declared flag variants, comma separated
    #[arg(long, value_delimiter = ',', default_value = "control,test")]
    pub variants: Vec<String>,

    /// Seed for the random source; runs with the same seed are identical
    #[arg(long)]
    pub seed: Option<u64>,

    /// Experiment start (RFC 3339), defaults to now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Experiment end (RFC 3339)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Project timezone the funnel filters are expressed in (IANA name)
    #[arg(long, value_parser = parse_timezone)]
    pub timezone: Option<Tz>,

    /// Minimum observations per variant (overrides config)
    #[arg(long)]
    pub min_exposure: Option<u64>,

    /// Win-probability mass required for significance (overrides config)
    #[arg(long)]
    pub min_probability: Option<f64>,

    /// Expected loss at which results stop being significant (overrides config)
    #[arg(long)]
    pub loss_threshold: Option<f64>,

    /// Monte Carlo draws per posterior (overrides config)
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl AnalyzeArgs {
    /// Apply command line overrides on top of loaded settings
    pub fn analysis_config(&self, base: &AnalysisConfig) -> AnalysisConfig {
        let mut config = base.clone();

        if let Some(min_exposure) = self.min_exposure {
            config.min_exposure = min_exposure;
        }
        if let Some(min_probability) = self.min_probability {
            config.min_probability_for_significance = min_probability;
        }
        if let Some(loss_threshold) = self.loss_threshold {
            config.expected_loss_significance_level = loss_threshold;
        }
        if let Some(simulations) = self.simulations {
            config.simulations_count = simulations;
        }

        config
    }

    fn feature_flag(&self) -> FeatureFlag {
        FeatureFlag::with_variant_keys(&self.flag, self.variants.iter().map(|v| v.trim()))
    }

    fn window(&self) -> ExperimentWindow {
        let window = ExperimentWindow::new(self.start.unwrap_or_else(Utc::now), self.end);

        match self.timezone {
            Some(tz) => window.with_timezone(tz),
            None => window,
        }
    }
}

fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|e| format!("unknown timezone '{}': {}", name, e))
}

/// Error body printed when the analysis rejects its input
#[derive(Debug, Serialize)]
struct ErrorOutput {
    code: String,
    detail: String,
}

/// Run the analysis and print the result payload
pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    let analysis_config = args.analysis_config(&config.analysis);
    let analyzer = FunnelExperimentAnalyzer::new(&analysis_config)
        .context("Invalid analysis configuration")?;

    let result = match &args.input {
        Some(path) => {
            info!("Analysing funnel results from {}", path.display());
            analyze_with(JsonFileFunnelQuery::new(path), analyzer, &args).await
        }
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("Failed to read funnel results from stdin")?;

            let results = parse_funnel_results(&raw)?;
            analyze_with(InMemoryFunnelQuery::new(results), analyzer, &args).await
        }
    };

    match result {
        Ok(payload) => print_json(&payload, args.pretty),
        Err(err) => {
            if let Some(code) = err.experiment_code() {
                print_json(
                    &ErrorOutput {
                        code,
                        detail: err.to_string(),
                    },
                    args.pretty,
                )?;
            }
            Err(err.into())
        }
    }
}

async fn analyze_with<Q: FunnelQuery>(
    query: Q,
    analyzer: FunnelExperimentAnalyzer,
    args: &AnalyzeArgs,
) -> Result<ExperimentResultsPayload, DomainError> {
    let mut service = ExperimentResultService::new(Arc::new(query), analyzer);

    if let Some(seed) = args.seed {
        service = service.with_seed(seed);
    }

    service.get_results(&args.feature_flag(), &args.window()).await
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn parse(args: &[&str]) -> AnalyzeArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Analyze(args) => args,
        }
    }

    #[test]
    fn test_parse_defaults() {
        let args = parse(&["funnel-experiment", "analyze"]);

        assert!(args.input.is_none());
        assert_eq!(args.flag, "experiment");
        assert_eq!(args.variants, vec!["control", "test"]);
        assert!(args.seed.is_none());
        assert!(!args.pretty);
    }

    #[test]
    fn test_parse_full() {
        let args = parse(&[
            "funnel-experiment",
            "analyze",
            "--input",
            "results.json",
            "--flag",
            "checkout",
            "--variants",
            "control,test_1,test_2",
            "--seed",
            "42",
            "--start",
            "2024-01-01T00:00:00Z",
            "--timezone",
            "America/New_York",
            "--min-exposure",
            "500",
            "--simulations",
            "1000",
        ]);

        assert_eq!(args.input, Some(PathBuf::from("results.json")));
        assert_eq!(args.feature_flag().test_variant_keys(), vec!["test_1", "test_2"]);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.window().start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(args.timezone, Some(chrono_tz::America::New_York));
        assert_eq!(
            args.window().localize(args.window().start).to_rfc3339(),
            "2023-12-31T19:00:00-05:00"
        );

        let config = args.analysis_config(&AnalysisConfig::default());
        assert_eq!(config.min_exposure, 500);
        assert_eq!(config.simulations_count, 1000);
        assert_eq!(config.min_probability_for_significance, 0.9);
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        assert!(
            Cli::try_parse_from(["funnel-experiment", "analyze", "--timezone", "Mars/Olympus"])
                .is_err()
        );
    }

    #[test]
    fn test_rejects_invalid_seed() {
        assert!(Cli::try_parse_from(["funnel-experiment", "analyze", "--seed", "abc"]).is_err());
    }
}
