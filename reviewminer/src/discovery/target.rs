//! Logical query targets and their environment/collection bindings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Which document collection a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryTarget {
    News,
    Reviews,
}

impl QueryTarget {
    pub const ALL: [QueryTarget; 2] = [QueryTarget::News, QueryTarget::Reviews];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryTarget::News => "news",
            QueryTarget::Reviews => "reviews",
        }
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "news" => Ok(QueryTarget::News),
            "reviews" | "review" => Ok(QueryTarget::Reviews),
            other => Err(Error::Config(format!("unknown query target '{}'", other))),
        }
    }
}

/// Concrete routing identifiers of one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub environment_id: String,
    pub collection_id: String,
}

impl CollectionRef {
    pub fn new(environment_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            collection_id: collection_id.into(),
        }
    }
}

/// Read-only target -> collection lookup, complete for every [`QueryTarget`].
#[derive(Debug, Clone)]
pub struct TargetTable {
    bindings: BTreeMap<QueryTarget, CollectionRef>,
}

impl TargetTable {
    /// Fails with a config error when any target variant has no binding.
    pub fn new(bindings: BTreeMap<QueryTarget, CollectionRef>) -> Result<Self> {
        for target in QueryTarget::ALL {
            let binding = bindings.get(&target).ok_or_else(|| {
                Error::Config(format!("no collection bound for target '{}'", target))
            })?;
            if binding.environment_id.is_empty() || binding.collection_id.is_empty() {
                return Err(Error::Config(format!(
                    "target '{}' has an empty environment or collection id",
                    target
                )));
            }
        }

        Ok(Self { bindings })
    }

    pub fn resolve(&self, target: QueryTarget) -> &CollectionRef {
        // Completeness is checked in `new`.
        &self.bindings[&target]
    }

    /// Bindings in target order
    pub fn iter(&self) -> impl Iterator<Item = (QueryTarget, &CollectionRef)> {
        self.bindings.iter().map(|(target, binding)| (*target, binding))
    }
}
