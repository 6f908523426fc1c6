//! Funnel query inputs for experiment analysis
//!
//! The funnel engine itself lives outside this crate. These types describe
//! the per-variant breakdowns it hands over and the parameters it is asked
//! to run with.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::variant::{VariantRecord, CONTROL_VARIANT_KEY};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

// ============================================================================
// FunnelStep / FunnelBreakdown
// ============================================================================

/// Aggregated count for one step of a funnel, for one breakdown value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStep {
    /// Position of the step in the funnel (0 = entry step)
    pub order: u32,
    /// Event name of the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Number of users who reached this step
    pub count: u64,
    /// Breakdown values; the first element is the variant key
    #[serde(default)]
    pub breakdown_value: Vec<String>,
    /// Remaining fields reported by the funnel engine, passed through as is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FunnelStep {
    /// Create a new funnel step for a variant
    pub fn new(order: u32, count: u64, variant_key: impl Into<String>) -> Self {
        Self {
            order,
            name: None,
            count,
            breakdown_value: vec![variant_key.into()],
            extra: Map::new(),
        }
    }

    /// Set the event name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Variant key this step was broken down by
    pub fn variant_key(&self) -> Option<&str> {
        self.breakdown_value.first().map(String::as_str)
    }

    /// Check if this is the funnel entry step
    pub fn is_entry(&self) -> bool {
        self.order == 0
    }
}

/// All funnel steps for a single breakdown value, ordered entry step first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunnelBreakdown(pub Vec<FunnelStep>);

impl FunnelBreakdown {
    /// Create a breakdown from its steps
    pub fn new(steps: Vec<FunnelStep>) -> Self {
        Self(steps)
    }

    /// Two-step breakdown: `total` users entered, `success` converted
    pub fn conversion(variant_key: &str, total: u64, success: u64) -> Self {
        Self(vec![
            FunnelStep::new(0, total, variant_key),
            FunnelStep::new(1, success, variant_key),
        ])
    }

    /// Funnel steps
    pub fn steps(&self) -> &[FunnelStep] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Variant key of the entry step
    pub fn variant_key(&self) -> Option<&str> {
        self.0.first().and_then(FunnelStep::variant_key)
    }

    /// Collapse the funnel into a variant record.
    ///
    /// Total comes from the first step and successes from the last one.
    pub fn to_variant_record(&self) -> Option<VariantRecord> {
        let first = self.0.first()?;
        let last = self.0.last()?;
        let key = first.variant_key()?;

        Some(VariantRecord::from_funnel_counts(key, first.count, last.count))
    }
}

// ============================================================================
// FeatureFlag
// ============================================================================

/// A single declared value of a multivariate feature flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagVariant {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub rollout_percentage: u8,
}

impl FlagVariant {
    pub fn new(key: impl Into<String>, rollout_percentage: u8) -> Self {
        Self {
            key: key.into(),
            name: None,
            rollout_percentage,
        }
    }
}

/// The feature flag that splits users across experiment variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub key: String,
    pub variants: Vec<FlagVariant>,
}

impl FeatureFlag {
    /// Create a flag declaring the given variants
    pub fn new(key: impl Into<String>, variants: Vec<FlagVariant>) -> Self {
        Self {
            key: key.into(),
            variants,
        }
    }

    /// Create a flag with evenly split rollout over the given variant keys
    pub fn with_variant_keys<I, S>(key: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let share = if keys.is_empty() {
            0
        } else {
            (100 / keys.len()) as u8
        };

        Self::new(
            key,
            keys.into_iter().map(|k| FlagVariant::new(k, share)).collect(),
        )
    }

    /// Declared variant keys, in declaration order
    pub fn variant_keys(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.key.clone()).collect()
    }

    /// Declared variant keys other than the control
    pub fn test_variant_keys(&self) -> Vec<String> {
        self.variants
            .iter()
            .filter(|v| v.key != CONTROL_VARIANT_KEY)
            .map(|v| v.key.clone())
            .collect()
    }

    /// Event property the funnel is broken down by
    pub fn breakdown_key(&self) -> String {
        format!("$feature/{}", self.key)
    }
}

// ============================================================================
// ExperimentWindow / FunnelQueryParams
// ============================================================================

/// Time range over which experiment events are counted.
///
/// Bounds are stored in UTC. Funnel filters read dates in the project
/// timezone, so queries convert them when one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentWindow {
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Tz>,
}

impl ExperimentWindow {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start,
            end,
            timezone: None,
        }
    }

    /// Window that starts at `start` and is still running
    pub fn open(start: DateTime<Utc>) -> Self {
        Self::new(start, None)
    }

    /// Set the project timezone
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Express an instant in the project timezone, or UTC when none is set
    pub fn localize(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self.timezone {
            Some(tz) => at.with_timezone(&tz).fixed_offset(),
            None => at.fixed_offset(),
        }
    }
}

/// Parameters handed to the funnel engine for an experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelQueryParams {
    pub date_from: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<FixedOffset>>,
    pub explicit_date: bool,
    pub breakdown: String,
    pub breakdown_type: String,
    /// Flag properties are never applied as funnel properties
    #[serde(default)]
    pub properties: Vec<serde_json::Value>,
}

impl FunnelQueryParams {
    /// Build the breakdown query for a flag over an experiment window
    pub fn for_experiment(flag: &FeatureFlag, window: &ExperimentWindow) -> Self {
        Self {
            date_from: window.localize(window.start),
            date_to: window.end.map(|end| window.localize(end)),
            explicit_date: true,
            breakdown: flag.breakdown_key(),
            breakdown_type: "event".to_string(),
            properties: Vec::new(),
        }
    }
}

// ============================================================================
// FunnelQuery
// ============================================================================

/// Source of per-variant funnel aggregates
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FunnelQuery: Send + Sync {
    /// Run the funnel broken down by variant
    async fn run(&self, params: &FunnelQueryParams) -> Result<Vec<FunnelBreakdown>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_breakdown_to_variant_record() {
        let breakdown = FunnelBreakdown::new(vec![
            FunnelStep::new(0, 200, "test").with_name("$pageview"),
            FunnelStep::new(1, 120, "test"),
            FunnelStep::new(2, 50, "test").with_name("purchase"),
        ]);

        let record = breakdown.to_variant_record().unwrap();
        assert_eq!(record, VariantRecord::new("test", 50, 150));
    }

    #[test]
    fn test_empty_breakdown_has_no_record() {
        assert!(FunnelBreakdown::default().to_variant_record().is_none());

        let no_key = FunnelBreakdown::new(vec![FunnelStep {
            order: 0,
            name: None,
            count: 10,
            breakdown_value: vec![],
            extra: Map::new(),
        }]);
        assert!(no_key.to_variant_record().is_none());
    }

    #[test]
    fn test_breakdown_deserializes_from_step_list() {
        let json = r#"[
            {"order": 0, "name": "$pageview", "count": 100, "breakdown_value": ["control"]},
            {"order": 1, "name": "signup", "count": 12, "breakdown_value": ["control"], "extra": true}
        ]"#;

        let breakdown: FunnelBreakdown = serde_json::from_str(json).unwrap();
        assert_eq!(breakdown.steps().len(), 2);
        assert_eq!(breakdown.variant_key(), Some("control"));
        assert_eq!(
            breakdown.to_variant_record(),
            Some(VariantRecord::new("control", 12, 88))
        );
    }

    #[test]
    fn test_flag_keys() {
        let flag = FeatureFlag::with_variant_keys("checkout-flow", ["control", "test_1", "test_2"]);

        assert_eq!(flag.breakdown_key(), "$feature/checkout-flow");
        assert_eq!(flag.variant_keys(), vec!["control", "test_1", "test_2"]);
        assert_eq!(flag.test_variant_keys(), vec!["test_1", "test_2"]);
        assert!(flag.variants.iter().all(|v| v.rollout_percentage == 33));
    }

    #[test]
    fn test_query_params_for_experiment() {
        let flag = FeatureFlag::with_variant_keys("signup-button", ["control", "test"]);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

        let params = FunnelQueryParams::for_experiment(&flag, &ExperimentWindow::new(start, Some(end)));

        assert_eq!(params.breakdown, "$feature/signup-button");
        assert_eq!(params.breakdown_type, "event");
        assert_eq!(params.date_from, start);
        assert_eq!(params.date_to, Some(end.fixed_offset()));
        assert!(params.explicit_date);
        assert!(params.properties.is_empty());
    }

    #[test]
    fn test_query_params_use_project_timezone() {
        let flag = FeatureFlag::with_variant_keys("signup-button", ["control", "test"]);
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let window = ExperimentWindow::new(start, Some(end)).with_timezone(chrono_tz::Europe::Berlin);

        let params = FunnelQueryParams::for_experiment(&flag, &window);
        let json = serde_json::to_value(&params).unwrap();

        // Winter offset at the start, summer offset at the end
        assert_eq!(json["date_from"], "2024-03-01T01:00:00+01:00");
        assert_eq!(json["date_to"], "2024-07-01T02:00:00+02:00");
        assert_eq!(params.date_from, start);
        assert_eq!(params.date_to.map(|d| d.to_utc()), Some(end));
    }

    #[test]
    fn test_open_window_without_timezone_stays_utc() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let params = FunnelQueryParams::for_experiment(
            &FeatureFlag::with_variant_keys("flag", ["control", "test"]),
            &ExperimentWindow::open(start),
        );

        assert_eq!(params.date_from.offset().local_minus_utc(), 0);
        assert!(params.date_to.is_none());
    }

    #[test]
    fn test_steps_keep_unknown_fields() {
        let json = serde_json::json!([
            {
                "order": 0,
                "name": "$pageview",
                "custom_name": "Landing",
                "count": 100,
                "breakdown_value": ["control"],
                "average_conversion_time": 12.5,
                "people": []
            }
        ]);

        let breakdown: FunnelBreakdown = serde_json::from_value(json.clone()).unwrap();

        assert_eq!(breakdown.steps()[0].extra["custom_name"], "Landing");
        assert_eq!(serde_json::to_value(&breakdown).unwrap(), json);
    }
}
