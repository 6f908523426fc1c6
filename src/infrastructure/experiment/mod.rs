//! Infrastructure layer for funnel experiment analysis
//!
//! Provides the Monte Carlo engines behind experiment results and the
//! funnel result sources they consume.

mod analyzer;
mod expected_loss;
mod in_memory_funnel_query;
mod json_file_funnel_query;
mod sampler;
mod significance;
mod win_probability;

pub use analyzer::{filter_declared, FunnelAnalysis, FunnelExperimentAnalyzer, VariantPartition};
pub use expected_loss::ExpectedLossEngine;
pub use in_memory_funnel_query::InMemoryFunnelQuery;
pub use json_file_funnel_query::{parse_funnel_results, JsonFileFunnelQuery};
pub use sampler::{BetaPrior, BetaSampler, DEFAULT_SIMULATIONS_COUNT};
pub use significance::{best_test_variant, SignificanceClassifier, SignificanceThresholds};
pub use win_probability::WinProbabilityEngine;
