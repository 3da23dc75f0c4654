//! Search backend trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::query::QuerySpec;
use super::target::CollectionRef;
use crate::aggregations::RawResponse;
use crate::error::TransportError;

/// An environment as listed by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub environment_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

/// Transport to a hosted document-search service.
///
/// One call is one network request: no retries, caching or deduplication.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `spec` against `collection`. Routing identifiers inside `spec` are ignored.
    async fn query(
        &self,
        collection: &CollectionRef,
        spec: &QuerySpec,
    ) -> Result<RawResponse, TransportError>;

    /// List the environments visible to the configured credentials
    async fn environments(&self) -> Result<Vec<Environment>, TransportError>;

    /// Human-readable backend name
    fn backend_name(&self) -> &str;
}
