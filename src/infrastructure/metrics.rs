//! Experiment analysis metrics
//!
//! Recorded through the `metrics` facade; they are dropped unless the host
//! process installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::domain::experiment::{ExperimentResultError, SignificanceCode};

/// Record a completed analysis
pub fn record_analysis(flag_key: &str, code: SignificanceCode, duration: Duration) {
    let labels = [
        ("flag", flag_key.to_string()),
        ("significance_code", code.as_str().to_string()),
    ];

    counter!("experiment_analyses_total", &labels).increment(1);
    histogram!("experiment_analysis_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record an analysis rejected during validation
pub fn record_rejection(flag_key: &str, error: &ExperimentResultError) {
    let labels = [
        ("flag", flag_key.to_string()),
        ("kind", error.kind().to_string()),
    ];

    counter!("experiment_analysis_rejections_total", &labels).increment(1);
}
