//! Domain layer - Core experiment types and traits

pub mod error;
pub mod experiment;

pub use error::DomainError;
pub use experiment::{
    ExperimentOutcome, ExperimentResultError, ExperimentResultsPayload, ExperimentWindow,
    FeatureFlag, FunnelBreakdown, FunnelQuery, FunnelQueryParams, SignificanceCode,
    VariantRecord,
};
