//! Aggregation response model and the flattener that turns it into chart series

mod flatten;
pub mod selector;
pub mod types;

pub use flatten::{flatten, flatten_each, ChartPoint, FlatSeries};
pub use selector::{
    plain_key, timestamp_key, BucketSelector, KeyFormatter, NodeMatcher, PathSelector,
    SliceOrder, ValueSource, SENTIMENT_FIELD,
};
pub use types::{AggregationBucket, AggregationNode, RawResponse};
