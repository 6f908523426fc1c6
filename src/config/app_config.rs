use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};
use serde::Deserialize;

use crate::domain::experiment::{ExperimentResultError, MAX_TEST_VARIANTS};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Thresholds and simulation settings for experiment analysis
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum observations per variant before results are trusted
    pub min_exposure: u64,
    /// Win-probability mass a side needs for the result to count
    pub min_probability_for_significance: f64,
    /// Expected loss at or above which a result is not shipped
    pub expected_loss_significance_level: f64,
    /// Monte Carlo draws per posterior
    pub simulations_count: usize,
    /// Beta prior added to successes
    pub prior_success: f64,
    /// Beta prior added to failures
    pub prior_failure: f64,
    /// Control plus test variants
    pub max_variants: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_exposure: 100,
            min_probability_for_significance: 0.9,
            expected_loss_significance_level: 0.01,
            simulations_count: 100_000,
            prior_success: 1.0,
            prior_failure: 1.0,
            max_variants: MAX_TEST_VARIANTS + 1,
        }
    }
}

impl AnalysisConfig {
    /// Override the simulation count
    pub fn with_simulations_count(mut self, simulations_count: usize) -> Self {
        self.simulations_count = simulations_count;
        self
    }

    /// Override the minimum exposure per variant
    pub fn with_min_exposure(mut self, min_exposure: u64) -> Self {
        self.min_exposure = min_exposure;
        self
    }

    /// Check the significance thresholds and variant cap.
    ///
    /// Priors and the simulation count are checked when the sampler is built.
    pub fn validate(&self) -> Result<(), ExperimentResultError> {
        let invalid = |message: String| Err(ExperimentResultError::InvalidConfiguration(message));

        if !(0.0..=1.0).contains(&self.min_probability_for_significance) {
            return invalid(format!(
                "min_probability_for_significance must be within [0, 1], got {}",
                self.min_probability_for_significance
            ));
        }

        if !(0.0..=1.0).contains(&self.expected_loss_significance_level) {
            return invalid(format!(
                "expected_loss_significance_level must be within [0, 1], got {}",
                self.expected_loss_significance_level
            ));
        }

        if self.max_variants < 2 {
            return invalid(format!("max_variants must be at least 2, got {}", self.max_variants));
        }

        Ok(())
    }
}

impl AppConfig {
    /// Load settings from `config/default`, `config/local` and `APP__*` env vars.
    ///
    /// A malformed value anywhere is an error; thresholds never fall back to
    /// defaults silently.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(Self::builder())
    }

    fn builder() -> ConfigBuilder<DefaultState> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}
