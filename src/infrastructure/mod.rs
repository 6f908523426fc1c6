//! Infrastructure layer - Analysis engines, funnel sources and services

pub mod experiment;
pub mod logging;
pub mod metrics;
pub mod services;
