//! Experiment domain module for funnel A/B testing
//!
//! This module provides the types and traits that describe a funnel
//! experiment: the per-variant funnel aggregates going in, and the Bayesian
//! significance results coming out.

mod funnel;
mod result;
mod validation;
mod variant;

// Re-export all public types
pub use funnel::{
    ExperimentWindow, FeatureFlag, FlagVariant, FunnelBreakdown, FunnelQuery, FunnelQueryParams,
    FunnelStep,
};
pub use result::{
    ExperimentOutcome, ExperimentResultsPayload, Probability, Significance, SignificanceCode,
    MAX_UNCERTAINTY_LOSS,
};
pub use validation::{validate_event_variants, ExperimentResultError, MAX_TEST_VARIANTS};
pub use variant::{VariantRecord, CONTROL_VARIANT_KEY};

#[cfg(test)]
pub use funnel::MockFunnelQuery;
