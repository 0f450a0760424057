//! The replication pipeline: acquire, derive, test, model, report
//!
//! [`analyze`] is pure over an in-memory dataset; [`run`] adds the cached
//! download and writes the report files.

use crate::config::{AnalysisConfig, ComparisonSpec, KruskalSpec, OutputConfig, Stratum};
use crate::dataset::{ensure_cached, Dataset, LabelColumn, NumericColumn};
use crate::describe::{
    frequency_table, group_summaries, stratified_summaries, FrequencyRow, GroupSummary,
    StratifiedSummary,
};
use crate::error::Result;
use crate::html_output::HtmlReport;
use crate::hurdle::{fit_all, HurdleFit};
use crate::hypothesis::{
    check_published, run_family, run_kruskal, ComparisonResult, KruskalResult, PublishedCheck,
};
use crate::plots::{frequency_chart, mean_se_chart, Bar, BarPanel, Chart, FrequencyPanel};
use crate::table::{format_number, merge_tables, MergedTable};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything the report shows
#[derive(Debug, Clone)]
pub struct Report {
    pub n_observations: usize,
    pub fdr_alpha: f64,
    pub comparisons: Vec<ComparisonResult>,
    pub crt_comparisons: Vec<ComparisonResult>,
    pub kruskal: Vec<KruskalResult>,
    pub published: Vec<PublishedCheck>,
    pub fits: Vec<HurdleFit>,
    pub count_table: MergedTable,
    pub zero_table: MergedTable,
    pub treatment_summaries: Vec<StratifiedSummary>,
    pub crt_summaries: Vec<GroupSummary>,
    pub frequencies: Vec<FrequencyRow>,
    pub charts: Vec<Chart>,
}

/// Run every analysis stage on a loaded dataset
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> Result<Report> {
    dataset.check_integrity()?;
    let exact = config.tests.exact_threshold;

    info!("Running {} pairwise comparisons", config.comparisons.len());
    let comparisons = run_family(dataset, &config.comparisons, exact)?;
    let crt_comparisons = run_family(dataset, &config.crt_comparisons, exact)?;
    let kruskal = config
        .kruskal
        .iter()
        .map(|spec| run_kruskal(dataset, spec))
        .collect::<Result<Vec<_>>>()?;

    let published = check_published(&comparisons, &config.published, config.tests.published_decimals);
    for check in published.iter().filter(|c| !c.matches()) {
        warn!(
            "{}: recomputed p = {} (adjusted {}), published p = {} (adjusted {})",
            check.label, check.raw_p, check.adjusted_p, check.published_raw_p, check.published_adjusted_p
        );
    }

    info!("Fitting {} hurdle models", config.models.variants.len());
    let fits = fit_all(dataset, &config.models)?;
    let count_table = merge_tables(&fits.iter().map(|f| f.count.table(&f.name)).collect::<Vec<_>>());
    let zero_table = merge_tables(&fits.iter().map(|f| f.zero.table(&f.name)).collect::<Vec<_>>());

    let treatment_summaries = stratified_summaries(
        dataset,
        LabelColumn::BullyType,
        LabelColumn::TreatmentGroup,
        NumericColumn::Give,
    );
    let crt_summaries = group_summaries(dataset, LabelColumn::CrtType, NumericColumn::Give);
    let frequencies = frequency_table(
        dataset,
        LabelColumn::GameType,
        LabelColumn::TreatmentGroup,
        NumericColumn::Give,
    );

    let mut report = Report {
        n_observations: dataset.len(),
        fdr_alpha: config.tests.fdr_alpha,
        comparisons,
        crt_comparisons,
        kruskal,
        published,
        fits,
        count_table,
        zero_table,
        treatment_summaries,
        crt_summaries,
        frequencies,
        charts: Vec::new(),
    };
    report.charts = build_charts(&report, config)?;
    Ok(report)
}

fn pairwise_line(result: &ComparisonResult) -> String {
    format!(
        "{} vs {}: p = {} (adj. {})",
        result.group_a,
        result.group_b,
        format_number(result.p_value),
        format_number(result.adjusted_p)
    )
}

fn kruskal_line(result: &KruskalResult) -> String {
    format!(
        "Kruskal-Wallis H = {}, p = {}",
        format_number(result.test.statistic),
        format_number(result.test.p_value)
    )
}

fn bars(summaries: &[GroupSummary]) -> Vec<Bar> {
    summaries
        .iter()
        .map(|s| Bar {
            label: s.level.clone(),
            mean: s.mean,
            se: s.se,
        })
        .collect()
}

fn in_stratum(within: Option<&Stratum>, column: LabelColumn, level: &str) -> bool {
    within.is_some_and(|s| s.column == column.name() && s.level == level)
}

/// Annotation lines for the tests on `group` restricted to one stratum
fn annotations(
    comparisons: (&[ComparisonSpec], &[ComparisonResult]),
    kruskal: (&[KruskalSpec], &[KruskalResult]),
    group: LabelColumn,
    stratum: Option<(LabelColumn, &str)>,
) -> Vec<String> {
    let matches = |group_column: &str, within: Option<&Stratum>| {
        group_column == group.name()
            && match stratum {
                Some((column, level)) => in_stratum(within, column, level),
                None => within.is_none(),
            }
    };

    let mut lines: Vec<String> = comparisons
        .0
        .iter()
        .zip(comparisons.1)
        .filter(|(spec, _)| matches(&spec.group_column, spec.within.as_ref()))
        .map(|(_, result)| pairwise_line(result))
        .collect();
    lines.extend(
        kruskal
            .0
            .iter()
            .zip(kruskal.1)
            .filter(|(spec, _)| matches(&spec.group_column, spec.within.as_ref()))
            .map(|(_, result)| kruskal_line(result)),
    );
    lines
}

fn build_charts(report: &Report, config: &AnalysisConfig) -> Result<Vec<Chart>> {
    let kruskal = (config.kruskal.as_slice(), report.kruskal.as_slice());

    let treatment_panels: Vec<BarPanel> = report
        .treatment_summaries
        .iter()
        .map(|stratum| BarPanel {
            title: LabelColumn::BullyType.display_level(&stratum.stratum),
            bars: bars(&stratum.groups),
            annotations: annotations(
                (&config.comparisons, &report.comparisons),
                kruskal,
                LabelColumn::TreatmentGroup,
                Some((LabelColumn::BullyType, &stratum.stratum)),
            ),
        })
        .collect();

    let crt_panel = BarPanel {
        title: "All subjects".to_string(),
        bars: bars(&report.crt_summaries),
        annotations: annotations(
            (&config.crt_comparisons, &report.crt_comparisons),
            kruskal,
            LabelColumn::CrtType,
            None,
        ),
    };

    let mut frequency_panels: Vec<FrequencyPanel> = Vec::new();
    for row in &report.frequencies {
        let title = LabelColumn::GameType.display_level(&row.outer);
        if frequency_panels.last().map(|p| &p.title) != Some(&title) {
            frequency_panels.push(FrequencyPanel {
                title,
                series: Vec::new(),
            });
        }
        if let Some(panel) = frequency_panels.last_mut() {
            let series_name = LabelColumn::TreatmentGroup.display_level(&row.inner);
            let point = (row.value, row.relative);
            let continues = panel.series.last().is_some_and(|(name, _)| *name == series_name);
            if !continues {
                panel.series.push((series_name, Vec::new()));
            }
            if let Some((_, points)) = panel.series.last_mut() {
                points.push(point);
            }
        }
    }

    Ok(vec![
        mean_se_chart(
            "give_by_treatment",
            "Mean give by treatment group",
            "Mean give (± SE)",
            &treatment_panels,
        )?,
        mean_se_chart(
            "give_by_crt_type",
            "Mean give by CRT type",
            "Mean give (± SE)",
            &[crt_panel],
        )?,
        frequency_chart(
            "give_distribution",
            "Distribution of give by treatment group",
            "Give",
            &frequency_panels,
        )?,
    ])
}

/// Write the HTML report and standalone charts; returns the report path
pub fn write_outputs(report: &Report, output: &OutputConfig) -> Result<PathBuf> {
    fs::create_dir_all(&output.dir)?;
    for chart in &report.charts {
        let path = output.dir.join(format!("{}.svg", chart.name));
        fs::write(&path, &chart.svg)?;
        info!("Wrote {}", path.display());
    }

    let path = output.dir.join(&output.report_name);
    fs::write(&path, HtmlReport::new(report).to_html())?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Acquire, load, analyze and write the report
pub fn run(config: &AnalysisConfig) -> Result<PathBuf> {
    let path = ensure_cached(&config.data)?;
    let dataset = Dataset::load(&path, &config.crt)?;
    info!("Loaded {} observations from {}", dataset.len(), path.display());

    let report = analyze(&dataset, config)?;
    write_outputs(&report, &config.output)
}
