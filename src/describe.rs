//! Descriptive statistics behind the report tables and charts
//!
//! Uses trueno::Vector for SIMD mean/variance and aprender's
//! DescriptiveStats for medians.

use crate::dataset::{Dataset, LabelColumn, NumericColumn};
use aprender::stats::DescriptiveStats;
use serde::Serialize;
use trueno::Vector;

/// n, mean, sample SD, SE and median of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub level: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); NaN when n < 2
    pub sd: f64,
    pub se: f64,
    pub median: f64,
}

/// Summarize one sample; `None` when empty
pub fn summarize(level: &str, values: &[f64]) -> Option<GroupSummary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    // trueno and aprender work in f32; give amounts are integers in [0, 60]
    // so the narrowing is exact and only the accumulation runs at f32
    let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let v = Vector::from_slice(&data);

    let mean = v.mean().map(f64::from).unwrap_or(f64::NAN);
    // trueno's variance divides by n
    let sd = if n > 1 {
        let population = v.variance().map(f64::from).unwrap_or(f64::NAN);
        (population * n as f64 / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };
    let median = DescriptiveStats::new(&v)
        .quantile(0.5)
        .map(f64::from)
        .unwrap_or(f64::NAN);

    Some(GroupSummary {
        level: level.to_string(),
        n,
        mean,
        sd,
        se: sd / (n as f64).sqrt(),
        median,
    })
}

/// Summaries of `value` for every present level of `group`
pub fn group_summaries(dataset: &Dataset, group: LabelColumn, value: NumericColumn) -> Vec<GroupSummary> {
    dataset
        .levels(group)
        .iter()
        .filter_map(|level| summarize(level, &dataset.values_where(group, level, value)))
        .collect()
}

/// Group summaries computed separately inside each level of `stratum`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratifiedSummary {
    pub stratum: String,
    pub groups: Vec<GroupSummary>,
}

pub fn stratified_summaries(
    dataset: &Dataset,
    stratum: LabelColumn,
    group: LabelColumn,
    value: NumericColumn,
) -> Vec<StratifiedSummary> {
    dataset
        .levels(stratum)
        .into_iter()
        .filter_map(|level| {
            let subset = dataset.stratum(stratum.name(), &level).ok()?;
            Some(StratifiedSummary {
                groups: group_summaries(&subset, group, value),
                stratum: level,
            })
        })
        .collect()
}

/// Count of one outcome value within a facet pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub outer: String,
    pub inner: String,
    pub value: f64,
    pub count: usize,
    /// Share of the (outer, inner) pair's observations
    pub relative: f64,
}

/// Frequencies of `value` grouped by two facets
///
/// Rows follow the facets' presentation order, then ascending value.
/// Relative frequencies sum to one within each facet pair.
pub fn frequency_table(
    dataset: &Dataset,
    outer: LabelColumn,
    inner: LabelColumn,
    value: NumericColumn,
) -> Vec<FrequencyRow> {
    let mut rows = Vec::new();
    for outer_level in dataset.levels(outer) {
        for inner_level in dataset.levels(inner) {
            let mut values: Vec<f64> = dataset
                .observations()
                .iter()
                .filter(|o| o.label(outer) == outer_level && o.label(inner) == inner_level)
                .filter_map(|o| o.numeric(value))
                .filter(|v| !v.is_nan())
                .collect();
            values.sort_by(f64::total_cmp);

            let total = values.len() as f64;
            for run in values.chunk_by(|a, b| a == b) {
                rows.push(FrequencyRow {
                    outer: outer_level.clone(),
                    inner: inner_level.clone(),
                    value: run[0],
                    count: run.len(),
                    relative: run.len() as f64 / total,
                });
            }
        }
    }
    rows
}
