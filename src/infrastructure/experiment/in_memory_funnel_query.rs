//! In-memory funnel results

use async_trait::async_trait;

use crate::domain::experiment::{FunnelBreakdown, FunnelQuery, FunnelQueryParams};
use crate::domain::DomainError;

/// Serves a fixed set of funnel breakdowns regardless of query parameters
#[derive(Debug, Default, Clone)]
pub struct InMemoryFunnelQuery {
    results: Vec<FunnelBreakdown>,
}

impl InMemoryFunnelQuery {
    pub fn new(results: Vec<FunnelBreakdown>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl FunnelQuery for InMemoryFunnelQuery {
    async fn run(&self, _params: &FunnelQueryParams) -> Result<Vec<FunnelBreakdown>, DomainError> {
        Ok(self.results.clone())
    }
}
