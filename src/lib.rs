//! Funnel Experiment Engine
//!
//! Bayesian analysis of funnel A/B experiments:
//! - Win probabilities from paired Beta posterior simulations
//! - Expected loss of shipping the best test variant
//! - Exposure, win-probability and loss gates deciding significance
//! - Reproducible runs through an injected, seedable random source

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{AnalysisConfig, AppConfig};
pub use domain::{
    DomainError, ExperimentOutcome, ExperimentResultError, ExperimentResultsPayload,
    SignificanceCode, VariantRecord,
};
pub use infrastructure::experiment::FunnelExperimentAnalyzer;
pub use infrastructure::services::ExperimentResultService;
