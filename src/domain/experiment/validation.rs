//! Experiment result validation

use thiserror::Error;

use super::funnel::FunnelBreakdown;
use super::variant::CONTROL_VARIANT_KEY;

/// Maximum number of test variants next to the control
pub const MAX_TEST_VARIANTS: usize = 9;

/// Errors raised while computing experiment results
///
/// Every variant maps to a stable machine-readable code via [`code`](Self::code).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExperimentResultError {
    #[error("No experiment events have been ingested yet.")]
    NoEventsIngested,

    #[error(
        "No experiment events have been ingested yet for the following variants: {}",
        .0.join(", ")
    )]
    MissingVariants(Vec<String>),

    #[error("No control variant data found")]
    NoControlData,

    #[error("Can't calculate experiment results for more than {max} variants, got {count}")]
    TooManyVariants { count: usize, max: usize },

    #[error("Can't calculate experiment results for less than 2 variants")]
    NoTestVariantData,

    #[error("Variant '{0}' appears more than once in the funnel results")]
    DuplicateVariant(String),

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Sampling error: {0}")]
    Sampling(String),
}

impl ExperimentResultError {
    /// Machine-readable error code
    pub fn code(&self) -> String {
        match self {
            Self::NoEventsIngested => "no-events".to_string(),
            Self::MissingVariants(keys) => format!("missing-flag-variants::{}", keys.join(", ")),
            Self::NoControlData | Self::NoTestVariantData => "no_data".to_string(),
            Self::TooManyVariants { .. } => "too_much_data".to_string(),
            Self::DuplicateVariant(_) => "duplicate-variant".to_string(),
            Self::InvalidConfiguration(_) => "invalid-configuration".to_string(),
            Self::Sampling(_) => "sampling-error".to_string(),
        }
    }

    /// Static label for metrics, without variant keys
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoEventsIngested => "no_events",
            Self::MissingVariants(_) => "missing_variants",
            Self::NoControlData => "no_control_data",
            Self::TooManyVariants { .. } => "too_many_variants",
            Self::NoTestVariantData => "no_test_variant_data",
            Self::DuplicateVariant(_) => "duplicate_variant",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::Sampling(_) => "sampling",
        }
    }
}

/// Check that the funnel results contain entry events for the experiment.
///
/// The control must have entered the funnel, and so must at least one of the
/// declared test variants. All absent keys are reported together.
pub fn validate_event_variants(
    funnel_results: &[FunnelBreakdown],
    declared_variants: &[String],
) -> Result<(), ExperimentResultError> {
    if funnel_results.first().map_or(true, FunnelBreakdown::is_empty) {
        return Err(ExperimentResultError::NoEventsIngested);
    }

    let entry_keys: Vec<&str> = funnel_results
        .iter()
        .flat_map(|breakdown| breakdown.steps())
        .filter(|step| step.is_entry())
        .filter_map(|step| step.variant_key())
        .collect();

    let mut missing = Vec::new();

    if !entry_keys.contains(&CONTROL_VARIANT_KEY) {
        missing.push(CONTROL_VARIANT_KEY.to_string());
    }

    let test_keys: Vec<&String> = declared_variants
        .iter()
        .filter(|key| key.as_str() != CONTROL_VARIANT_KEY)
        .collect();

    if !test_keys.iter().any(|key| entry_keys.contains(&key.as_str())) {
        missing.extend(test_keys.into_iter().cloned());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExperimentResultError::MissingVariants(missing))
    }
}
