//! CLI module for the funnel experiment engine
//!
//! Provides subcommands:
//! - `analyze`: compute experiment results from exported funnel breakdowns

pub mod analyze;

use clap::{Parser, Subcommand};

/// Funnel Experiment Engine - Bayesian significance for funnel A/B tests
#[derive(Parser)]
#[command(name = "funnel-experiment")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyse funnel breakdowns and print the experiment results
    Analyze(analyze::AnalyzeArgs),
}
