//! Variant outcome records

use serde::{Deserialize, Serialize};

/// Key reserved for the baseline variant of every experiment
pub const CONTROL_VARIANT_KEY: &str = "control";

// ============================================================================
// VariantRecord
// ============================================================================

/// Observed conversion outcome for one experiment variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Variant key (the feature flag value)
    pub key: String,
    /// Number of users who completed the funnel
    pub success_count: u64,
    /// Number of users who entered but did not complete the funnel
    pub failure_count: u64,
}

impl VariantRecord {
    /// Create a new variant record
    pub fn new(key: impl Into<String>, success_count: u64, failure_count: u64) -> Self {
        Self {
            key: key.into(),
            success_count,
            failure_count,
        }
    }

    /// Build a record from funnel totals; failures saturate at zero
    pub fn from_funnel_counts(key: impl Into<String>, total: u64, success: u64) -> Self {
        Self::new(key, success, total.saturating_sub(success))
    }

    /// Total number of observations
    pub fn total(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Observed conversion rate, 0.0 when nothing was observed
    pub fn conversion_rate(&self) -> f64 {
        let total = self.total();

        if total == 0 {
            return 0.0;
        }

        self.success_count as f64 / total as f64
    }

    /// Check if this is the control variant
    pub fn is_control(&self) -> bool {
        self.key == CONTROL_VARIANT_KEY
    }
}
