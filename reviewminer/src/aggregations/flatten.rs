//! Aggregation tree -> flat, index-aligned chart series
//!
//! The walk is pure: it only reads the response and allocates the output,
//! so it is safe to call from any task or thread. Every structural mismatch
//! is reported as a [`ShapeError`] naming the node that failed; a missing
//! data point is never substituted with a default.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::selector::{BucketSelector, NodeMatcher, PathSelector, SliceOrder, ValueSource};
use super::types::{AggregationBucket, AggregationNode, RawResponse};
use crate::error::{ShapeError, ShapeErrorKind};

const ROOT: &str = "aggregations";

/// Chart-ready output: `labels[i]` belongs to `series[s][i]` for every series `s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSeries {
    /// Identity of the selected facet bucket, e.g. `allerton_hotel`
    pub series_label: String,
    pub labels: Vec<String>,
    /// One value sequence per value source of the selector
    pub series: Vec<Vec<f64>>,
}

/// A single `{label, value}` pair as consumed by meter/distribution widgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl FlatSeries {
    /// The first (primary) value sequence
    pub fn values(&self) -> &[f64] {
        self.series.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Zip labels with the `series`-th value sequence
    pub fn points(&self, series: usize) -> Option<Vec<ChartPoint>> {
        let values = self.series.get(series)?;
        Some(
            self.labels
                .iter()
                .zip(values)
                .map(|(label, value)| ChartPoint {
                    label: label.clone(),
                    value: *value,
                })
                .collect(),
        )
    }
}

/// Flatten the facet bucket chosen by `selector` into one series.
pub fn flatten(response: &RawResponse, selector: &PathSelector) -> Result<FlatSeries, ShapeError> {
    let (facets_path, facets) = facet_buckets(response, selector)?;
    let (index, bucket) = select_bucket(facets, &selector.bucket, &facets_path)?;
    flatten_bucket(bucket, &format!("{}[{}]", facets_path, index), selector)
}

/// Flatten every facet bucket, in backend order. The selector's bucket choice is ignored.
pub fn flatten_each(
    response: &RawResponse,
    selector: &PathSelector,
) -> Result<Vec<FlatSeries>, ShapeError> {
    let (facets_path, facets) = facet_buckets(response, selector)?;
    facets
        .iter()
        .enumerate()
        .map(|(index, bucket)| {
            flatten_bucket(bucket, &format!("{}[{}]", facets_path, index), selector)
        })
        .collect()
}

fn facet_buckets<'a>(
    response: &'a RawResponse,
    selector: &PathSelector,
) -> Result<(String, &'a [AggregationBucket]), ShapeError> {
    let (path, node) = select_node(&response.aggregations, &selector.facet, ROOT)?;
    let buckets = bucket_results(node, &path)?;
    let results_path = format!("{}.results", path);
    if buckets.is_empty() {
        return Err(ShapeError::new(results_path, ShapeErrorKind::EmptyBuckets));
    }
    Ok((results_path, buckets))
}

fn flatten_bucket(
    bucket: &AggregationBucket,
    path: &str,
    selector: &PathSelector,
) -> Result<FlatSeries, ShapeError> {
    let series_label = (selector.facet_key_format)(&bucket.key)
        .or_else(|| bucket.key_as_string.clone())
        .ok_or_else(|| ShapeError::new(format!("{}.key", path), ShapeErrorKind::MissingLabel))?;

    let (slices_path, slices_node) = select_node(
        &bucket.aggregations,
        &selector.slices,
        &format!("{}.aggregations", path),
    )?;
    let slices = bucket_results(slices_node, &slices_path)?;
    let results_path = format!("{}.results", slices_path);
    if slices.is_empty() {
        return Err(ShapeError::new(results_path, ShapeErrorKind::EmptyBuckets));
    }

    let order = slice_order(slices, selector.order, &results_path)?;
    let mut labels = Vec::with_capacity(slices.len());
    let mut series = vec![Vec::with_capacity(slices.len()); selector.values.len()];

    for index in order {
        let slice = &slices[index];
        let slice_path = format!("{}[{}]", results_path, index);

        let label = slice
            .key_as_string
            .clone()
            .or_else(|| (selector.slice_key_format)(&slice.key))
            .ok_or_else(|| ShapeError::new(slice_path.clone(), ShapeErrorKind::MissingLabel))?;
        labels.push(label);

        for (source, values) in selector.values.iter().zip(series.iter_mut()) {
            values.push(slice_value(slice, source, &slice_path)?);
        }
    }

    Ok(FlatSeries {
        series_label,
        labels,
        series,
    })
}

fn slice_value(
    slice: &AggregationBucket,
    source: &ValueSource,
    path: &str,
) -> Result<f64, ShapeError> {
    match source {
        ValueSource::MatchingResults => slice
            .matching_results
            .map(|count| count as f64)
            .ok_or_else(|| {
                ShapeError::new(
                    format!("{}.matching_results", path),
                    ShapeErrorKind::MissingValue,
                )
            }),
        ValueSource::Metric(matcher) => {
            let (metric_path, node) =
                select_node(&slice.aggregations, matcher, &format!("{}.aggregations", path))?;
            metric_value(node, &metric_path)
        }
    }
}

/// Pick one node out of `nodes`; `path` names the list itself.
fn select_node<'a>(
    nodes: &'a [AggregationNode],
    matcher: &NodeMatcher,
    path: &str,
) -> Result<(String, &'a AggregationNode), ShapeError> {
    if nodes.is_empty() {
        return Err(ShapeError::new(path, ShapeErrorKind::EmptyAggregations));
    }

    match matcher {
        NodeMatcher::At(index) => nodes
            .get(*index)
            .map(|node| (format!("{}[{}]", path, index), node))
            .ok_or_else(|| {
                ShapeError::new(
                    path,
                    ShapeErrorKind::IndexOutOfRange {
                        index: *index,
                        len: nodes.len(),
                    },
                )
            }),
        NodeMatcher::Matching { .. } => {
            let mut hits = nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| matcher.matches(node));

            let (index, node) = hits.next().ok_or_else(|| {
                ShapeError::new(
                    path,
                    ShapeErrorKind::NoMatch {
                        expected: matcher.to_string(),
                    },
                )
            })?;

            let others = hits.count();
            if others > 0 {
                return Err(ShapeError::new(
                    path,
                    ShapeErrorKind::Ambiguous {
                        expected: matcher.to_string(),
                        candidates: others + 1,
                    },
                ));
            }

            Ok((format!("{}[{}]", path, index), node))
        }
    }
}

fn select_bucket<'a>(
    buckets: &'a [AggregationBucket],
    selector: &BucketSelector,
    path: &str,
) -> Result<(usize, &'a AggregationBucket), ShapeError> {
    match selector {
        BucketSelector::Index(index) => buckets
            .get(*index)
            .map(|bucket| (*index, bucket))
            .ok_or_else(|| {
                ShapeError::new(
                    path,
                    ShapeErrorKind::IndexOutOfRange {
                        index: *index,
                        len: buckets.len(),
                    },
                )
            }),
        BucketSelector::Key(key) => buckets
            .iter()
            .enumerate()
            .find(|(_, bucket)| BucketSelector::matches_key(key, bucket))
            .ok_or_else(|| {
                ShapeError::new(
                    path,
                    ShapeErrorKind::BucketKeyNotFound { key: key.clone() },
                )
            }),
    }
}

fn bucket_results<'a>(
    node: &'a AggregationNode,
    path: &str,
) -> Result<&'a [AggregationBucket], ShapeError> {
    match (&node.results, &node.value) {
        (Some(_), Some(_)) => Err(ShapeError::new(path, ShapeErrorKind::ConflictingShape)),
        (Some(results), None) => Ok(results),
        (None, _) => Err(ShapeError::new(
            path,
            ShapeErrorKind::NotBucketContainer {
                found: node.type_name().to_string(),
            },
        )),
    }
}

fn metric_value(node: &AggregationNode, path: &str) -> Result<f64, ShapeError> {
    match (&node.results, &node.value) {
        (Some(_), Some(_)) => Err(ShapeError::new(path, ShapeErrorKind::ConflictingShape)),
        (None, Some(value)) => value.as_f64().ok_or_else(|| {
            ShapeError::new(
                format!("{}.value", path),
                ShapeErrorKind::NotNumeric {
                    found: value.to_string(),
                },
            )
        }),
        (Some(_), None) => Err(ShapeError::new(
            path,
            ShapeErrorKind::NotMetric {
                found: node.type_name().to_string(),
            },
        )),
        (None, None) => Err(ShapeError::new(
            format!("{}.value", path),
            ShapeErrorKind::MissingValue,
        )),
    }
}

/// Visit order of slice buckets. `ByKey` is a stable sort over all-numeric
/// or all-string keys; anything else cannot be ordered.
fn slice_order(
    slices: &[AggregationBucket],
    order: SliceOrder,
    path: &str,
) -> Result<Vec<usize>, ShapeError> {
    let mut indices: Vec<usize> = (0..slices.len()).collect();
    if order == SliceOrder::AsReturned {
        return Ok(indices);
    }

    if let Some(keys) = slices
        .iter()
        .map(|s| s.key.as_f64())
        .collect::<Option<Vec<f64>>>()
    {
        indices.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
        return Ok(indices);
    }

    if let Some(keys) = slices
        .iter()
        .map(|s| match &s.key {
            Value::String(k) => Some(k.as_str()),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()
    {
        indices.sort_by(|&a, &b| keys[a].cmp(keys[b]));
        return Ok(indices);
    }

    Err(ShapeError::new(path, ShapeErrorKind::UnorderableKeys))
}
