//! Path selectors describing which route through the aggregation tree to flatten
//!
//! The default selector reproduces the dashboard's fixed route: first
//! top-level container, its first bucket, that bucket's first child
//! container, and the first metric under every child bucket.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;

use super::types::{AggregationBucket, AggregationNode};

/// Document-sentiment score field produced by the enrichment pipeline
pub const SENTIMENT_FIELD: &str = "enriched_text.docSentiment.score";

/// Renders a bucket `key` as a label when `key_as_string` is absent
pub type KeyFormatter = fn(&Value) -> Option<String>;

/// Strings as-is, numbers and booleans via display. Null and compound keys have no label.
pub fn plain_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integral epoch-millisecond keys as RFC 3339 UTC with millisecond precision,
/// the same rendering the backend uses for `key_as_string`.
pub fn timestamp_key(key: &Value) -> Option<String> {
    match key {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Picks one aggregation node out of a sibling list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMatcher {
    /// Positional pick
    At(usize),
    /// Exactly one sibling must match every given criterion
    Matching {
        agg_type: Option<String>,
        field: Option<String>,
    },
}

impl Default for NodeMatcher {
    fn default() -> Self {
        NodeMatcher::At(0)
    }
}

impl NodeMatcher {
    pub fn of_type(agg_type: impl Into<String>) -> Self {
        NodeMatcher::Matching {
            agg_type: Some(agg_type.into()),
            field: None,
        }
    }

    pub fn on_field(field: impl Into<String>) -> Self {
        NodeMatcher::Matching {
            agg_type: None,
            field: Some(field.into()),
        }
    }

    pub fn matching(agg_type: impl Into<String>, field: impl Into<String>) -> Self {
        NodeMatcher::Matching {
            agg_type: Some(agg_type.into()),
            field: Some(field.into()),
        }
    }

    /// Whether `node` satisfies a `Matching` matcher. Positional matchers match nothing here.
    pub fn matches(&self, node: &AggregationNode) -> bool {
        match self {
            NodeMatcher::At(_) => false,
            NodeMatcher::Matching { agg_type, field } => {
                agg_type.as_deref().map_or(true, |t| node.agg_type.as_deref() == Some(t))
                    && field
                        .as_deref()
                        .map_or(true, |f| node.field.as_deref() == Some(f))
            }
        }
    }
}

impl fmt::Display for NodeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMatcher::At(index) => write!(f, "position {}", index),
            NodeMatcher::Matching { agg_type, field } => write!(
                f,
                "type={} field={}",
                agg_type.as_deref().unwrap_or("*"),
                field.as_deref().unwrap_or("*")
            ),
        }
    }
}

/// Picks the faceted entity (e.g. one hotel) out of the top-level container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketSelector {
    Index(usize),
    Key(String),
}

impl Default for BucketSelector {
    fn default() -> Self {
        BucketSelector::Index(0)
    }
}

impl BucketSelector {
    pub(crate) fn matches_key(key: &str, bucket: &AggregationBucket) -> bool {
        match &bucket.key {
            Value::String(s) => s == key,
            Value::Number(n) => n.to_string() == key,
            _ => false,
        }
    }
}

/// Where each value of a series comes from, per slice bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Scalar of a nested metric aggregation
    Metric(NodeMatcher),
    /// The slice bucket's document count
    MatchingResults,
}

impl Default for ValueSource {
    fn default() -> Self {
        ValueSource::Metric(NodeMatcher::default())
    }
}

/// Ordering of slice buckets in the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SliceOrder {
    /// Backend order, assumed chronological for timeslices and not verified
    #[default]
    AsReturned,
    /// Stable sort on bucket `key`
    ByKey,
}

/// Route through the aggregation tree: facet container, facet bucket,
/// slice container, and one value source per output series.
#[derive(Clone)]
pub struct PathSelector {
    pub(crate) facet: NodeMatcher,
    pub(crate) bucket: BucketSelector,
    pub(crate) slices: NodeMatcher,
    pub(crate) values: Vec<ValueSource>,
    pub(crate) order: SliceOrder,
    /// Renders the facet bucket key into `seriesLabel`
    pub(crate) facet_key_format: KeyFormatter,
    /// Renders slice keys lacking `key_as_string`
    pub(crate) slice_key_format: KeyFormatter,
}

impl Default for PathSelector {
    fn default() -> Self {
        Self {
            facet: NodeMatcher::default(),
            bucket: BucketSelector::default(),
            slices: NodeMatcher::default(),
            values: vec![ValueSource::default()],
            order: SliceOrder::default(),
            facet_key_format: plain_key,
            slice_key_format: plain_key,
        }
    }
}

impl fmt::Debug for PathSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathSelector")
            .field("facet", &self.facet)
            .field("bucket", &self.bucket)
            .field("slices", &self.slices)
            .field("values", &self.values)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl PathSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average document sentiment per time slice of a term facet
    pub fn sentiment_timeline() -> Self {
        Self::new()
            .facet(NodeMatcher::of_type("term"))
            .slices(NodeMatcher::of_type("timeslice"))
            .value(ValueSource::Metric(NodeMatcher::matching(
                "average",
                SENTIMENT_FIELD,
            )))
            .slice_key_format(timestamp_key)
    }

    pub fn facet(mut self, matcher: NodeMatcher) -> Self {
        self.facet = matcher;
        self
    }

    pub fn bucket(mut self, bucket: BucketSelector) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn bucket_key(self, key: impl Into<String>) -> Self {
        self.bucket(BucketSelector::Key(key.into()))
    }

    pub fn slices(mut self, matcher: NodeMatcher) -> Self {
        self.slices = matcher;
        self
    }

    /// Replace all value sources with a single one
    pub fn value(mut self, source: ValueSource) -> Self {
        self.values = vec![source];
        self
    }

    /// Add another index-aligned series
    pub fn also_value(mut self, source: ValueSource) -> Self {
        self.values.push(source);
        self
    }

    pub fn order(mut self, order: SliceOrder) -> Self {
        self.order = order;
        self
    }

    pub fn facet_key_format(mut self, formatter: KeyFormatter) -> Self {
        self.facet_key_format = formatter;
        self
    }

    pub fn slice_key_format(mut self, formatter: KeyFormatter) -> Self {
        self.slice_key_format = formatter;
        self
    }

    pub fn series_count(&self) -> usize {
        self.values.len()
    }
}
