//! Flattener scenarios over the hotel review sentiment response.

use reviewminer::aggregations::{timestamp_key, SENTIMENT_FIELD};
use reviewminer::{
    flatten, flatten_each, AggregationBucket, AggregationNode, NodeMatcher, PathSelector,
    RawResponse, ShapeErrorKind, SliceOrder, ValueSource,
};
use serde_json::json;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn allerton() -> RawResponse {
    serde_json::from_str(include_str!("fixtures/allerton_sentiment.json")).unwrap()
}

const ALLERTON_LABELS: [&str; 6] = [
    "2004-01-01T00:00:00.000Z",
    "2005-01-01T00:00:00.000Z",
    "2006-01-01T00:00:00.000Z",
    "2007-01-01T00:00:00.000Z",
    "2008-01-01T00:00:00.000Z",
    "2009-01-01T00:00:00.000Z",
];

const ALLERTON_SENTIMENT: [f64; 6] = [
    0.4747981263157895,
    0.07553482307692308,
    0.3211255518518519,
    0.19947411309090904,
    0.15336217692307694,
    0.2754325246376812,
];

fn yearly(key: i64, label: &str, count: u64, score: f64) -> AggregationBucket {
    AggregationBucket::new(key, count)
        .with_key_as_string(label)
        .with_aggregation(AggregationNode::metric("average", SENTIMENT_FIELD, score))
}

fn hotel(name: &str, years: Vec<AggregationBucket>) -> AggregationBucket {
    let count = years.iter().filter_map(|y| y.matching_results).sum();
    AggregationBucket::new(name, count).with_aggregation(
        AggregationNode::buckets("timeslice", "date", years).with_interval("1y"),
    )
}

fn two_hotels() -> RawResponse {
    RawResponse {
        matching_results: 10,
        results: vec![],
        aggregations: vec![AggregationNode::buckets(
            "term",
            "hotel",
            vec![
                hotel(
                    "allerton_hotel",
                    vec![yearly(1072915200000, "2004", 3, 0.5)],
                ),
                hotel(
                    "ace_hotel",
                    vec![
                        yearly(1072915200000, "2004", 4, 0.1),
                        yearly(1104537600000, "2005", 3, 0.2),
                    ],
                ),
            ],
        )],
    }
}

// ── Default route ───────────────────────────────────────────────────────────

#[test]
fn test_allerton_default_selector() {
    let flat = flatten(&allerton(), &PathSelector::default()).unwrap();

    assert_eq!(flat.series_label, "allerton_hotel");
    assert_eq!(flat.labels, ALLERTON_LABELS);
    assert_eq!(flat.values(), &ALLERTON_SENTIMENT);
    assert_eq!(flat.series.len(), 1);
}

#[test]
fn test_allerton_sentiment_timeline_selector() {
    let flat = flatten(&allerton(), &PathSelector::sentiment_timeline()).unwrap();

    assert_eq!(flat.series_label, "allerton_hotel");
    assert_eq!(flat.labels, ALLERTON_LABELS);
    assert_eq!(flat.values(), &ALLERTON_SENTIMENT);
}

#[test]
fn test_flatten_is_idempotent() {
    let response = allerton();
    let selector = PathSelector::sentiment_timeline();
    assert_eq!(
        flatten(&response, &selector).unwrap(),
        flatten(&response, &selector).unwrap()
    );
}

#[test]
fn test_serialized_shape_for_renderer() {
    let flat = flatten(&allerton(), &PathSelector::default()).unwrap();
    let value = serde_json::to_value(&flat).unwrap();

    assert_eq!(value["seriesLabel"], json!("allerton_hotel"));
    assert_eq!(value["labels"].as_array().unwrap().len(), 6);
    assert_eq!(value["series"][0][0], json!(0.4747981263157895));
}

// ── Structural errors ───────────────────────────────────────────────────────

#[test]
fn test_empty_aggregations_is_shape_error() {
    let err = flatten(&RawResponse::default(), &PathSelector::default()).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::EmptyAggregations);
    assert_eq!(err.path, "aggregations");
}

#[test]
fn test_leaf_metric_at_root_is_shape_error() {
    let response = RawResponse {
        aggregations: vec![AggregationNode::metric("average", SENTIMENT_FIELD, 0.3)],
        ..Default::default()
    };

    let err = flatten(&response, &PathSelector::default()).unwrap_err();
    assert_eq!(
        err.kind,
        ShapeErrorKind::NotBucketContainer {
            found: "average".to_string()
        }
    );
    assert_eq!(err.path, "aggregations[0]");
}

#[test]
fn test_empty_facet_results_is_shape_error() {
    let response = RawResponse {
        aggregations: vec![AggregationNode::buckets("term", "hotel", vec![])],
        ..Default::default()
    };

    let err = flatten(&response, &PathSelector::default()).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::EmptyBuckets);
    assert_eq!(err.path, "aggregations[0].results");
}

#[test]
fn test_missing_metric_reports_bucket_not_zero() {
    let mut response = allerton();
    let slices = response.aggregations[0].results.as_mut().unwrap()[0].aggregations[0]
        .results
        .as_mut()
        .unwrap();
    slices[3].aggregations.clear();

    let err = flatten(&response, &PathSelector::default()).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::EmptyAggregations);
    assert_eq!(
        err.path,
        "aggregations[0].results[0].aggregations[0].results[3].aggregations"
    );
}

#[test]
fn test_null_metric_value_is_missing_value() {
    let response: RawResponse = serde_json::from_value(json!({
        "aggregations": [{
            "type": "term", "field": "hotel",
            "results": [{
                "key": "allerton_hotel", "matching_results": 1,
                "aggregations": [{
                    "type": "timeslice", "field": "date",
                    "results": [{
                        "key": 1072915200000i64,
                        "key_as_string": "2004-01-01T00:00:00.000Z",
                        "matching_results": 0,
                        "aggregations": [{"type": "average", "field": "score", "value": null}]
                    }]
                }]
            }]
        }]
    }))
    .unwrap();

    let err = flatten(&response, &PathSelector::default()).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::MissingValue);
    assert!(err.path.ends_with("results[0].aggregations[0].value"));
}

#[test]
fn test_missing_count_is_missing_value() {
    let mut response = allerton();
    let slices = response.aggregations[0].results.as_mut().unwrap()[0].aggregations[0]
        .results
        .as_mut()
        .unwrap();
    slices[2].matching_results = None;

    let selector = PathSelector::new().value(ValueSource::MatchingResults);
    let err = flatten(&response, &selector).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::MissingValue);
    assert_eq!(
        err.path,
        "aggregations[0].results[0].aggregations[0].results[2].matching_results"
    );

    // the metric series alone does not need the count
    assert!(flatten(&response, &PathSelector::default()).is_ok());
}

#[test]
fn test_untyped_facet_decodes_and_reports_path() {
    let response: RawResponse =
        serde_json::from_value(json!({"aggregations": [{"field": "hotel", "results": []}]}))
            .unwrap();

    let err = flatten(&response, &PathSelector::default()).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::EmptyBuckets);
    assert_eq!(err.path, "aggregations[0].results");
}

#[test]
fn test_text_value_only_fails_on_walked_route() {
    let response: RawResponse = serde_json::from_value(json!({
        "aggregations": [{
            "type": "term", "field": "hotel",
            "results": [
                {
                    "key": "allerton_hotel", "matching_results": 1,
                    "aggregations": [{
                        "type": "timeslice", "field": "date",
                        "results": [{
                            "key": 1072915200000i64, "key_as_string": "2004",
                            "matching_results": 1,
                            "aggregations": [{"type": "average", "field": "score", "value": 0.25}]
                        }]
                    }]
                },
                {
                    "key": "ace_hotel", "matching_results": 1,
                    "aggregations": [{
                        "type": "timeslice", "field": "date",
                        "results": [{
                            "key": 1072915200000i64, "key_as_string": "2004",
                            "matching_results": 1,
                            "aggregations": [{"type": "average", "field": "score", "value": "n/a"}]
                        }]
                    }]
                }
            ]
        }]
    }))
    .unwrap();

    let flat = flatten(&response, &PathSelector::default()).unwrap();
    assert_eq!(flat.values(), &[0.25]);

    let err = flatten(&response, &PathSelector::new().bucket_key("ace_hotel")).unwrap_err();
    assert_eq!(
        err.kind,
        ShapeErrorKind::NotNumeric {
            found: "\"n/a\"".to_string()
        }
    );
    assert_eq!(
        err.path,
        "aggregations[0].results[1].aggregations[0].results[0].aggregations[0].value"
    );
}

#[test]
fn test_no_matching_slice_container() {
    let selector = PathSelector::new().slices(NodeMatcher::matching("timeslice", "published"));
    let err = flatten(&allerton(), &selector).unwrap_err();

    assert!(matches!(err.kind, ShapeErrorKind::NoMatch { .. }));
    assert_eq!(err.path, "aggregations[0].results[0].aggregations");
}

#[test]
fn test_ambiguous_metric_without_field() {
    let mut response = two_hotels();
    let facets = response.aggregations[0].results.as_mut().unwrap();
    let slices = facets[0].aggregations[0].results.as_mut().unwrap();
    slices[0]
        .aggregations
        .push(AggregationNode::metric("average", "rating", 4.5));

    let selector =
        PathSelector::new().value(ValueSource::Metric(NodeMatcher::of_type("average")));
    let err = flatten(&response, &selector).unwrap_err();
    assert!(matches!(
        err.kind,
        ShapeErrorKind::Ambiguous { candidates: 2, .. }
    ));

    // field disambiguates
    let selector = PathSelector::new()
        .value(ValueSource::Metric(NodeMatcher::matching("average", "rating")));
    assert_eq!(flatten(&response, &selector).unwrap().values(), &[4.5]);
}

#[test]
fn test_bucket_index_out_of_range() {
    let selector = PathSelector::new().bucket(reviewminer::BucketSelector::Index(5));
    let err = flatten(&two_hotels(), &selector).unwrap_err();
    assert_eq!(err.kind, ShapeErrorKind::IndexOutOfRange { index: 5, len: 2 });
}

// ── Generalized selection ───────────────────────────────────────────────────

#[test]
fn test_select_hotel_by_key() {
    let flat = flatten(&two_hotels(), &PathSelector::new().bucket_key("ace_hotel")).unwrap();
    assert_eq!(flat.series_label, "ace_hotel");
    assert_eq!(flat.labels, vec!["2004", "2005"]);
    assert_eq!(flat.values(), &[0.1, 0.2]);

    let err = flatten(&two_hotels(), &PathSelector::new().bucket_key("ritz")).unwrap_err();
    assert_eq!(
        err.kind,
        ShapeErrorKind::BucketKeyNotFound {
            key: "ritz".to_string()
        }
    );
}

#[test]
fn test_flatten_each_hotel() {
    let all = flatten_each(&two_hotels(), &PathSelector::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].series_label, "allerton_hotel");
    assert_eq!(all[1].series_label, "ace_hotel");
    assert_eq!(all[1].len(), 2);
}

#[test]
fn test_counts_alongside_sentiment() {
    let selector = PathSelector::sentiment_timeline().also_value(ValueSource::MatchingResults);
    let flat = flatten(&allerton(), &selector).unwrap();

    assert_eq!(flat.series.len(), 2);
    assert_eq!(flat.series[1], vec![19.0, 26.0, 27.0, 55.0, 65.0, 69.0]);
    for values in &flat.series {
        assert_eq!(values.len(), flat.labels.len());
    }
}

#[test]
fn test_opt_in_sort_by_timestamp() {
    let mut response = allerton();
    let slices = response.aggregations[0].results.as_mut().unwrap()[0].aggregations[0]
        .results
        .as_mut()
        .unwrap();
    slices.reverse();

    let returned = flatten(&response, &PathSelector::default()).unwrap();
    assert_eq!(returned.labels[0], "2009-01-01T00:00:00.000Z");

    let sorted = flatten(&response, &PathSelector::default().order(SliceOrder::ByKey)).unwrap();
    assert_eq!(sorted.labels, ALLERTON_LABELS);
    assert_eq!(sorted.values(), &ALLERTON_SENTIMENT);
}

#[test]
fn test_formatter_used_when_key_as_string_absent() {
    let mut response = allerton();
    let slices = response.aggregations[0].results.as_mut().unwrap()[0].aggregations[0]
        .results
        .as_mut()
        .unwrap();
    for slice in slices.iter_mut() {
        slice.key_as_string = None;
    }

    let flat = flatten(&response, &PathSelector::default().slice_key_format(timestamp_key)).unwrap();
    assert_eq!(flat.labels, ALLERTON_LABELS);
}

#[test]
fn test_numeric_facet_key_is_not_rendered_as_date() {
    let mut response = two_hotels();
    response.aggregations[0].results.as_mut().unwrap()[0].key = json!(42);

    let flat = flatten(&response, &PathSelector::sentiment_timeline()).unwrap();
    assert_eq!(flat.series_label, "42");
    assert_eq!(flat.labels, vec!["2004"]);
}
