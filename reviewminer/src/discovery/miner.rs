//! Target-bound queries dispatched to a search backend, with outcome logs and metrics

use std::sync::Arc;
use std::time::Instant;

use super::backend::{Environment, SearchBackend};
use super::client::DiscoveryClient;
use super::query::{QueryBuilder, QuerySpec};
use super::target::QueryTarget;
use crate::aggregations::RawResponse;
use crate::config::Config;
use crate::error::{Error, Result};

/// Entry point used by the dashboard: `query_news` / `query_reviews`.
///
/// Holds no mutable state; concurrent calls are independent.
#[derive(Clone)]
pub struct ReviewMiner {
    builder: QueryBuilder,
    backend: Arc<dyn SearchBackend>,
}

impl ReviewMiner {
    pub fn new(builder: QueryBuilder, backend: Arc<dyn SearchBackend>) -> Self {
        Self { builder, backend }
    }

    /// Target table and HTTP client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let builder = QueryBuilder::new(config.target_table()?);
        let client = DiscoveryClient::from_config(&config.discovery)?;
        tracing::info!(url = %client.url(), "Using discovery service");
        Ok(Self::new(builder, Arc::new(client)))
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub async fn query_news(&self, spec: &QuerySpec) -> Result<RawResponse> {
        self.query(QueryTarget::News, spec).await
    }

    pub async fn query_reviews(&self, spec: &QuerySpec) -> Result<RawResponse> {
        self.query(QueryTarget::Reviews, spec).await
    }

    pub async fn query(&self, target: QueryTarget, spec: &QuerySpec) -> Result<RawResponse> {
        let bound = self.builder.build(target, spec);
        let start = Instant::now();
        let result = self.dispatch(&bound).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.error_type(),
        };
        metrics::counter!(
            "reviewminer_queries_total",
            "target" => target.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!("reviewminer_query_duration_seconds", "target" => target.as_str())
            .record(start.elapsed().as_secs_f64());

        result
    }

    /// Send an already-bound spec. Fails with a config error if the spec
    /// carries no `environment_id`/`collection_id`.
    pub async fn dispatch(&self, spec: &QuerySpec) -> Result<RawResponse> {
        let collection = spec.binding().ok_or_else(|| {
            Error::Config("query spec is not bound to an environment and collection".to_string())
        })?;

        let start = Instant::now();
        match self.backend.query(&collection, spec).await {
            Ok(response) => {
                tracing::info!(
                    environment_id = %collection.environment_id,
                    collection_id = %collection.collection_id,
                    matching_results = response.matching_results,
                    aggregations = response.aggregations.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Query completed"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.backend_name(),
                    environment_id = %collection.environment_id,
                    error = %e,
                    "Query failed"
                );
                Err(e.into())
            }
        }
    }

    pub async fn environments(&self) -> Result<Vec<Environment>> {
        Ok(self.backend.environments().await?)
    }
}
