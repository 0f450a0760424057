// Configured comparisons run against the dataset

use super::fdr::benjamini_hochberg;
use super::kruskal::{kruskal_wallis, KruskalWallisTest};
use super::mann_whitney::{rank_sum_test, PValueMethod};
use crate::config::{ComparisonSpec, KruskalSpec, PublishedValue, Stratum};
use crate::dataset::Dataset;
use crate::error::{AnalysisError, Result};
use crate::table::round_to;
use serde::Serialize;
use std::borrow::Cow;

/// One pairwise comparison with its family-adjusted p-value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub label: String,
    pub group_a: String,
    pub group_b: String,
    pub n_a: usize,
    pub n_b: usize,
    pub statistic: f64,
    pub z: f64,
    pub p_value: f64,
    /// BH-adjusted within the comparison's family
    pub adjusted_p: f64,
    pub method: PValueMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KruskalResult {
    pub label: String,
    /// Levels that entered the test with their sizes
    pub groups: Vec<(String, usize)>,
    pub test: KruskalWallisTest,
}

/// Recomputed vs printed p-values for one comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedCheck {
    pub label: String,
    pub raw_p: f64,
    pub published_raw_p: f64,
    pub adjusted_p: f64,
    pub published_adjusted_p: f64,
    pub raw_matches: bool,
    pub adjusted_matches: bool,
}

impl PublishedCheck {
    pub fn matches(&self) -> bool {
        self.raw_matches && self.adjusted_matches
    }
}

fn restrict<'a>(dataset: &'a Dataset, within: Option<&Stratum>) -> Result<Cow<'a, Dataset>> {
    Ok(match within {
        Some(stratum) => Cow::Owned(dataset.stratum(&stratum.column, &stratum.level)?),
        None => Cow::Borrowed(dataset),
    })
}

/// Run one rank-sum comparison; `adjusted_p` is left equal to the raw p
pub fn run_comparison(
    dataset: &Dataset,
    spec: &ComparisonSpec,
    exact_threshold: usize,
) -> Result<ComparisonResult> {
    let group = Dataset::label_column(&spec.group_column)?;
    let value = Dataset::numeric_column(&spec.value_column)?;
    let subset = restrict(dataset, spec.within.as_ref())?;

    let a = subset.values_where(group, &spec.group_a, value);
    let b = subset.values_where(group, &spec.group_b, value);
    for (level, sample) in [(&spec.group_a, &a), (&spec.group_b, &b)] {
        if sample.is_empty() {
            return Err(AnalysisError::EmptyGroup {
                comparison: spec.label.clone(),
                column: spec.group_column.clone(),
                group: level.clone(),
            });
        }
    }

    let test = rank_sum_test(&a, &b, exact_threshold).ok_or_else(|| AnalysisError::EmptyGroup {
        comparison: spec.label.clone(),
        column: spec.group_column.clone(),
        group: spec.group_a.clone(),
    })?;

    tracing::debug!(
        "{}: W = {}, z = {:.3}, p = {:.4} ({:?})",
        spec.label,
        test.statistic,
        test.z,
        test.p_value,
        test.method
    );

    Ok(ComparisonResult {
        label: spec.label.clone(),
        group_a: spec.group_a.clone(),
        group_b: spec.group_b.clone(),
        n_a: test.n_a,
        n_b: test.n_b,
        statistic: test.statistic,
        z: test.z,
        p_value: test.p_value,
        adjusted_p: test.p_value,
        method: test.method,
    })
}

/// Run a family of comparisons and BH-adjust them together
pub fn run_family(
    dataset: &Dataset,
    specs: &[ComparisonSpec],
    exact_threshold: usize,
) -> Result<Vec<ComparisonResult>> {
    let mut results = specs
        .iter()
        .map(|spec| run_comparison(dataset, spec, exact_threshold))
        .collect::<Result<Vec<_>>>()?;

    let raw: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    for (result, adjusted) in results.iter_mut().zip(benjamini_hochberg(&raw)) {
        result.adjusted_p = adjusted;
    }
    Ok(results)
}

/// Kruskal-Wallis across every level of the group column
pub fn run_kruskal(dataset: &Dataset, spec: &KruskalSpec) -> Result<KruskalResult> {
    let group = Dataset::label_column(&spec.group_column)?;
    let value = Dataset::numeric_column(&spec.value_column)?;
    let subset = restrict(dataset, spec.within.as_ref())?;

    let levels: Vec<String> = match group.canonical_levels() {
        Some(levels) => levels.into_iter().map(str::to_string).collect(),
        None => subset.levels(group),
    };
    let samples: Vec<(String, Vec<f64>)> = levels
        .into_iter()
        .map(|level| {
            let values = subset.values_where(group, &level, value);
            (level, values)
        })
        .collect();

    let data: Vec<Vec<f64>> = samples.iter().map(|(_, v)| v.clone()).collect();
    let test = kruskal_wallis(&data).ok_or_else(|| AnalysisError::EmptyGroup {
        comparison: spec.label.clone(),
        column: spec.group_column.clone(),
        group: samples
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(level, _)| level.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })?;

    tracing::debug!(
        "{}: H = {:.3}, df = {}, p = {:.4}",
        spec.label,
        test.statistic,
        test.df,
        test.p_value
    );

    Ok(KruskalResult {
        label: spec.label.clone(),
        groups: samples
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(level, v)| (level, v.len()))
            .collect(),
        test,
    })
}

/// Compare recomputed p-values with the printed ones at `decimals` places
///
/// Comparisons without a published counterpart are skipped.
pub fn check_published(
    results: &[ComparisonResult],
    published: &[PublishedValue],
    decimals: u32,
) -> Vec<PublishedCheck> {
    published
        .iter()
        .filter_map(|printed| {
            let result = results.iter().find(|r| r.label == printed.label)?;
            let raw_p = round_to(result.p_value, decimals);
            let adjusted_p = round_to(result.adjusted_p, decimals);
            let published_raw_p = round_to(printed.raw_p, decimals);
            let published_adjusted_p = round_to(printed.adjusted_p, decimals);
            Some(PublishedCheck {
                label: printed.label.clone(),
                raw_p,
                published_raw_p,
                adjusted_p,
                published_adjusted_p,
                raw_matches: raw_p == published_raw_p,
                adjusted_matches: adjusted_p == published_adjusted_p,
            })
        })
        .collect()
}
