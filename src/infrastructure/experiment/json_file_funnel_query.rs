//! Funnel results loaded from JSON exports

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::experiment::{FunnelBreakdown, FunnelQuery, FunnelQueryParams};
use crate::domain::DomainError;

/// Reads pre-computed funnel breakdowns from a JSON file.
///
/// The file holds an array of breakdowns, each an array of funnel steps. The
/// file is re-read on every run so a refreshed export is picked up.
#[derive(Debug, Clone)]
pub struct JsonFileFunnelQuery {
    path: PathBuf,
}

impl JsonFileFunnelQuery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parse funnel breakdowns from a JSON document
pub fn parse_funnel_results(json: &str) -> Result<Vec<FunnelBreakdown>, DomainError> {
    serde_json::from_str(json)
        .map_err(|e| DomainError::validation(format!("Invalid funnel results: {}", e)))
}

#[async_trait]
impl FunnelQuery for JsonFileFunnelQuery {
    async fn run(&self, params: &FunnelQueryParams) -> Result<Vec<FunnelBreakdown>, DomainError> {
        debug!(
            path = %self.path.display(),
            breakdown = %params.breakdown,
            "Loading funnel results"
        );

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => DomainError::not_found(format!(
                    "Funnel results file '{}' not found",
                    self.path.display()
                )),
                _ => DomainError::storage(format!(
                    "Failed to read '{}': {}",
                    self.path.display(),
                    e
                )),
            })?;

        parse_funnel_results(&contents)
    }
}
