//! reviewminer: faceted review queries against a hosted discovery service
//!
//! Two pieces, composed linearly:
//! - [`discovery`]: binds a [`QueryTarget`] to its environment/collection and
//!   dispatches the query to a [`SearchBackend`].
//! - [`aggregations`]: walks the nested aggregation tree of the response and
//!   emits index-aligned label/value sequences ([`FlatSeries`]) for charting.

pub mod aggregations;
pub mod config;
pub mod discovery;
pub mod error;

pub use aggregations::{
    flatten, flatten_each, AggregationBucket, AggregationNode, BucketSelector, ChartPoint,
    FlatSeries, NodeMatcher, PathSelector, RawResponse, SliceOrder, ValueSource,
};
pub use config::Config;
pub use discovery::{
    CollectionRef, DiscoveryClient, Environment, QueryBuilder, QuerySpec, QueryTarget,
    ReviewMiner, SearchBackend, TargetTable,
};
pub use error::{Error, Result, ShapeError, ShapeErrorKind, TransportError};
