use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level query response from the discovery service.
///
/// Field names follow the backend contract exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub matching_results: u64,
    /// Matching documents, passed through untouched
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

/// One node of the aggregation tree.
///
/// Bucketed aggregations (`term`, `timeslice`, `histogram`, ...) carry
/// `results`; metric aggregations (`average`, `max`, `sum`, ...) carry
/// `value`. A node carrying both is malformed and rejected by the flattener.
///
/// Decoding is lenient: `type` may be absent and `value` may hold any JSON,
/// so a malformed node only fails when the flattener actually walks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub agg_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Filter expression of `filter` aggregations
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<AggregationBucket>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl AggregationNode {
    /// Bucket container node
    pub fn buckets(
        agg_type: impl Into<String>,
        field: impl Into<String>,
        results: Vec<AggregationBucket>,
    ) -> Self {
        Self {
            agg_type: Some(agg_type.into()),
            field: Some(field.into()),
            interval: None,
            match_expr: None,
            results: Some(results),
            value: None,
        }
    }

    /// Leaf metric node
    pub fn metric(agg_type: impl Into<String>, field: impl Into<String>, value: f64) -> Self {
        Self {
            agg_type: Some(agg_type.into()),
            field: Some(field.into()),
            interval: None,
            match_expr: None,
            results: None,
            value: Some(Value::from(value)),
        }
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    /// Aggregation type for messages; `untyped` when the backend omitted it
    pub fn type_name(&self) -> &str {
        self.agg_type.as_deref().unwrap_or("untyped")
    }

    pub fn is_bucket_container(&self) -> bool {
        self.results.is_some()
    }

    pub fn is_metric(&self) -> bool {
        self.value.is_some()
    }
}

/// One bucket of a bucketed aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBucket {
    /// Raw identity: a category string or an epoch-millisecond timestamp
    #[serde(default)]
    pub key: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_results: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationNode>,
}

impl AggregationBucket {
    pub fn new(key: impl Into<Value>, matching_results: u64) -> Self {
        Self {
            key: key.into(),
            key_as_string: None,
            matching_results: Some(matching_results),
            aggregations: Vec::new(),
        }
    }

    pub fn with_key_as_string(mut self, label: impl Into<String>) -> Self {
        self.key_as_string = Some(label.into());
        self
    }

    pub fn with_aggregation(mut self, node: AggregationNode) -> Self {
        self.aggregations.push(node);
        self
    }
}
