//! Property-based tests for query binding and flattening.
//!
//! Uses `proptest` to generate caller specs and aggregation trees and checks
//! the invariants the dashboard relies on: binding never disturbs caller
//! fields, flattened labels and series stay index-aligned, and flattening
//! is a pure function of its input.

use proptest::prelude::*;
use reviewminer::aggregations::SENTIMENT_FIELD;
use reviewminer::discovery::{COLLECTION_ID, ENVIRONMENT_ID};
use reviewminer::{
    flatten, flatten_each, AggregationBucket, AggregationNode, CollectionRef, PathSelector,
    QueryBuilder, QuerySpec, QueryTarget, RawResponse, TargetTable, ValueSource,
};
use serde_json::Value;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn builder() -> QueryBuilder {
    let mut map = BTreeMap::new();
    map.insert(QueryTarget::News, CollectionRef::new("news-env", "news-col"));
    map.insert(QueryTarget::Reviews, CollectionRef::new("rev-env", "rev-col"));
    QueryBuilder::new(TargetTable::new(map).unwrap())
}

fn target() -> impl Strategy<Value = QueryTarget> {
    prop_oneof![Just(QueryTarget::News), Just(QueryTarget::Reviews)]
}

fn caller_fields() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,24}", 0..8).prop_filter(
        "routing keys are reserved",
        |fields| !fields.contains_key(ENVIRONMENT_ID) && !fields.contains_key(COLLECTION_ID),
    )
}

/// Finite, non-NaN metric values as the service would emit them
fn score() -> impl Strategy<Value = f64> {
    -1.0f64..1.0f64
}

fn slices() -> impl Strategy<Value = Vec<(u64, f64)>> {
    prop::collection::vec((0u64..500, score()), 1..24)
}

fn response(hotels: Vec<Vec<(u64, f64)>>) -> RawResponse {
    let facets = hotels
        .into_iter()
        .enumerate()
        .map(|(h, years)| {
            let buckets = years
                .into_iter()
                .enumerate()
                .map(|(y, (count, value))| {
                    AggregationBucket::new(1072915200000i64 + y as i64 * 31_536_000_000, count)
                        .with_key_as_string(format!("{}", 2004 + y))
                        .with_aggregation(AggregationNode::metric("average", SENTIMENT_FIELD, value))
                })
                .collect();
            AggregationBucket::new(format!("hotel_{}", h), 1).with_aggregation(
                AggregationNode::buckets("timeslice", "date", buckets).with_interval("1y"),
            )
        })
        .collect();

    RawResponse {
        matching_results: 0,
        results: vec![],
        aggregations: vec![AggregationNode::buckets("term", "hotel", facets)],
    }
}

// ---------------------------------------------------------------------------
// Query binding
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_binding_preserves_caller_fields(target in target(), fields in caller_fields()) {
        let mut spec = QuerySpec::new();
        for (key, value) in &fields {
            spec.insert(key.clone(), value.clone());
        }

        let bound = builder().build(target, &spec);
        let expected = builder().targets().resolve(target).clone();

        prop_assert_eq!(bound.binding(), Some(expected));
        prop_assert_eq!(bound.len(), fields.len() + 2);
        for (key, value) in &fields {
            prop_assert_eq!(bound.get(key), Some(&Value::String(value.clone())));
        }
        // the caller's spec is not modified
        prop_assert_eq!(spec.len(), fields.len());
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_labels_and_series_aligned(hotels in prop::collection::vec(slices(), 1..5)) {
        let response = response(hotels.clone());
        let selector = PathSelector::sentiment_timeline().also_value(ValueSource::MatchingResults);

        let all = flatten_each(&response, &selector).unwrap();
        prop_assert_eq!(all.len(), hotels.len());

        for (flat, years) in all.iter().zip(&hotels) {
            prop_assert_eq!(flat.labels.len(), years.len());
            prop_assert_eq!(flat.series.len(), 2);
            for values in &flat.series {
                prop_assert_eq!(values.len(), flat.labels.len());
            }
            // values pass through unmodified
            let expected: Vec<f64> = years.iter().map(|(_, v)| *v).collect();
            prop_assert_eq!(flat.values(), expected.as_slice());
        }
    }

    #[test]
    fn test_flatten_is_pure(hotels in prop::collection::vec(slices(), 1..4)) {
        let response = response(hotels);
        let before = response.clone();
        let selector = PathSelector::default();

        let first = flatten(&response, &selector).unwrap();
        let second = flatten(&response, &selector).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(response, before);
    }
}
