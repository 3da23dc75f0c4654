//! Caller query specifications and target binding

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::target::{CollectionRef, QueryTarget, TargetTable};
use crate::error::{Error, Result};

pub const ENVIRONMENT_ID: &str = "environment_id";
pub const COLLECTION_ID: &str = "collection_id";

/// Backend query parameters (`query`, `filter`, `aggregation`, `count`, ...).
///
/// Owned by the caller; binding a target produces an augmented copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuerySpec {
    params: Map<String, Value>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.params.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.params.iter()
    }

    /// Query language expression
    pub fn query(self, query: impl Into<String>) -> Self {
        self.set("query", query.into())
    }

    pub fn natural_language_query(self, query: impl Into<String>) -> Self {
        self.set("natural_language_query", query.into())
    }

    pub fn filter(self, filter: impl Into<String>) -> Self {
        self.set("filter", filter.into())
    }

    /// Aggregation pipeline, e.g. `term(hotel).timeslice(date,1year).average(...)`
    pub fn aggregation(self, aggregation: impl Into<String>) -> Self {
        self.set("aggregation", aggregation.into())
    }

    pub fn count(self, count: u64) -> Self {
        self.set("count", count)
    }

    pub fn offset(self, offset: u64) -> Self {
        self.set("offset", offset)
    }

    pub fn return_fields(self, fields: &[&str]) -> Self {
        self.set("return", fields.to_vec())
    }

    /// Environment/collection this spec is bound to, if both are present as strings
    pub fn binding(&self) -> Option<CollectionRef> {
        let environment_id = self.params.get(ENVIRONMENT_ID)?.as_str()?;
        let collection_id = self.params.get(COLLECTION_ID)?.as_str()?;
        Some(CollectionRef::new(environment_id, collection_id))
    }

    /// Caller fields rendered as query-string pairs.
    ///
    /// Routing identifiers are excluded (they travel in the URL path), nulls
    /// are dropped, arrays are comma-joined and objects are sent as JSON.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter(|(key, _)| key.as_str() != ENVIRONMENT_ID && key.as_str() != COLLECTION_ID)
            .filter_map(|(key, value)| param_value(value).map(|v| (key.clone(), v)))
            .collect()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.params
    }
}

fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(param_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

impl From<Map<String, Value>> for QuerySpec {
    fn from(params: Map<String, Value>) -> Self {
        Self { params }
    }
}

impl TryFrom<Value> for QuerySpec {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(params) => Ok(Self { params }),
            other => Err(Error::Config(format!(
                "query spec must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Attaches routing identifiers from the target table to caller specs.
///
/// Cheap to clone; the table is shared read-only.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    targets: Arc<TargetTable>,
}

impl QueryBuilder {
    pub fn new(targets: TargetTable) -> Self {
        Self {
            targets: Arc::new(targets),
        }
    }

    pub fn targets(&self) -> &TargetTable {
        &self.targets
    }

    /// Copy of `spec` with `environment_id`/`collection_id` set for `target`.
    /// No other field is touched.
    pub fn build(&self, target: QueryTarget, spec: &QuerySpec) -> QuerySpec {
        let binding = self.targets.resolve(target);
        tracing::debug!(
            query_target = %target,
            environment_id = %binding.environment_id,
            collection_id = %binding.collection_id,
            "Binding query to collection"
        );

        let mut bound = spec.clone();
        bound.insert(ENVIRONMENT_ID, binding.environment_id.clone());
        bound.insert(COLLECTION_ID, binding.collection_id.clone());
        bound
    }
}
