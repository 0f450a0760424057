//! HTML report document
//!
//! One self-contained page: test tables, the published-value check, merged
//! hurdle tables, descriptive tables and the inline SVG charts.

use crate::dataset::LabelColumn;
use crate::describe::GroupSummary;
use crate::hypothesis::{ComparisonResult, PValueMethod};
use crate::pipeline::Report;
use crate::table::{format_number, MergedTable};

/// HTML formatter over a finished report
#[derive(Debug)]
pub struct HtmlReport<'a> {
    report: &'a Report,
}

impl<'a> HtmlReport<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Escape HTML special characters
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Generate embedded CSS styles
    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2, h3 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 6px 10px;
            text-align: right;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        td.label {
            text-align: left;
            font-family: monospace;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        .significant {
            font-weight: bold;
        }
        .mismatch {
            color: #cc0000;
        }
        .model-stats td {
            color: #666;
        }
        .chart {
            margin-bottom: 30px;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn header_row(headers: &[&str]) -> String {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| format!("<th>{}</th>", Self::escape_html(h)))
            .collect();
        format!("        <tr>{}</tr>\n", cells.join(""))
    }

    fn label_cell(text: &str) -> String {
        format!(r#"<td class="label">{}</td>"#, Self::escape_html(text))
    }

    fn render_comparisons(&self, title: &str, results: &[ComparisonResult]) -> String {
        let mut html = String::new();
        html.push_str(&format!("    <h3>{}</h3>\n", Self::escape_html(title)));
        html.push_str("    <table>\n");
        html.push_str(&Self::header_row(&[
            "Comparison",
            "n₁",
            "n₂",
            "W",
            "z",
            "p",
            "BH-adjusted p",
            "Method",
        ]));

        for r in results {
            let class = if r.adjusted_p <= self.report.fdr_alpha {
                r#" class="significant""#
            } else {
                ""
            };
            let method = match r.method {
                PValueMethod::Exact => "exact",
                PValueMethod::NormalApprox => "normal",
            };
            html.push_str(&format!(
                "        <tr{}>{}<td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td><td>{:.4}</td><td>{:.4}</td><td>{}</td></tr>\n",
                class,
                Self::label_cell(&r.label),
                r.n_a,
                r.n_b,
                r.statistic,
                r.z,
                r.p_value,
                r.adjusted_p,
                method
            ));
        }
        html.push_str("    </table>\n");
        html
    }

    fn render_kruskal(&self) -> String {
        let mut html = String::new();
        html.push_str("    <h3>Kruskal-Wallis tests</h3>\n");
        html.push_str("    <table>\n");
        html.push_str(&Self::header_row(&["Test", "Groups", "H", "df", "p"]));
        for k in &self.report.kruskal {
            let groups: Vec<String> = k
                .groups
                .iter()
                .map(|(level, n)| format!("{} ({})", level, n))
                .collect();
            html.push_str(&format!(
                "        <tr>{}{}<td>{:.3}</td><td>{}</td><td>{:.4}</td></tr>\n",
                Self::label_cell(&k.label),
                Self::label_cell(&groups.join(", ")),
                k.test.statistic,
                k.test.df,
                k.test.p_value
            ));
        }
        html.push_str("    </table>\n");
        html
    }

    fn render_published(&self) -> String {
        let mut html = String::new();
        html.push_str("    <h3>Recomputed vs published p-values</h3>\n");
        html.push_str("    <table>\n");
        html.push_str(&Self::header_row(&[
            "Comparison",
            "p",
            "Published p",
            "Adjusted p",
            "Published adjusted p",
            "Match",
        ]));
        for c in &self.report.published {
            let (class, verdict) = if c.matches() {
                ("", "yes")
            } else {
                (r#" class="mismatch""#, "no")
            };
            html.push_str(&format!(
                "        <tr{}>{}<td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                class,
                Self::label_cell(&c.label),
                c.raw_p,
                c.published_raw_p,
                c.adjusted_p,
                c.published_adjusted_p,
                verdict
            ));
        }
        html.push_str("    </table>\n");
        html
    }

    fn render_merged(&self, title: &str, table: &MergedTable, count_part: bool) -> String {
        let mut html = String::new();
        html.push_str(&format!("    <h3>{}</h3>\n", Self::escape_html(title)));
        html.push_str("    <table>\n");

        let mut headers = vec!["Predictor"];
        headers.extend(table.columns.iter().map(String::as_str));
        html.push_str(&Self::header_row(&headers));

        for (predictor, cells) in &table.rows {
            html.push_str("        <tr>");
            html.push_str(&Self::label_cell(predictor));
            for cell in cells {
                html.push_str(&format!("<td>{}</td>", Self::escape_html(cell)));
            }
            html.push_str("</tr>\n");
        }

        let fits = &self.report.fits;
        let stats: [(&str, Vec<String>); 2] = if count_part {
            [
                ("N (positive)", fits.iter().map(|f| f.count.n_obs.to_string()).collect()),
                ("Log-likelihood", fits.iter().map(|f| format_number(f.count.loglik)).collect()),
            ]
        } else {
            [
                ("N", fits.iter().map(|f| f.zero.n_obs.to_string()).collect()),
                ("Log-likelihood", fits.iter().map(|f| format_number(f.zero.loglik)).collect()),
            ]
        };
        for (name, values) in stats {
            html.push_str(r#"        <tr class="model-stats">"#);
            html.push_str(&Self::label_cell(name));
            for v in values {
                html.push_str(&format!("<td>{}</td>", v));
            }
            html.push_str("</tr>\n");
        }

        html.push_str("    </table>\n");
        html
    }

    fn summary_cells(s: &GroupSummary) -> String {
        format!(
            "<td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            s.n,
            format_number(s.mean),
            format_number(s.sd),
            format_number(s.se),
            format_number(s.median)
        )
    }

    fn render_descriptives(&self) -> String {
        let mut html = String::new();
        html.push_str("    <h3>Give by treatment group and bully type</h3>\n");
        html.push_str("    <table>\n");
        html.push_str(&Self::header_row(&["Bully type", "Treatment", "n", "Mean", "SD", "SE", "Median"]));
        for stratum in &self.report.treatment_summaries {
            for s in &stratum.groups {
                html.push_str(&format!(
                    "        <tr>{}{}{}</tr>\n",
                    Self::label_cell(&LabelColumn::BullyType.display_level(&stratum.stratum)),
                    Self::label_cell(&LabelColumn::TreatmentGroup.display_level(&s.level)),
                    Self::summary_cells(s)
                ));
            }
        }
        html.push_str("    </table>\n");

        html.push_str("    <h3>Give by CRT type</h3>\n");
        html.push_str("    <table>\n");
        html.push_str(&Self::header_row(&["CRT type", "n", "Mean", "SD", "SE", "Median"]));
        for s in &self.report.crt_summaries {
            html.push_str(&format!(
                "        <tr>{}{}</tr>\n",
                Self::label_cell(&LabelColumn::CrtType.display_level(&s.level)),
                Self::summary_cells(s)
            ));
        }
        html.push_str("    </table>\n");
        html
    }

    /// Frequencies as one row per outcome value, one column per facet pair
    fn render_frequencies(&self) -> String {
        let rows = &self.report.frequencies;
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        for r in rows {
            if !pairs.contains(&(r.outer.as_str(), r.inner.as_str())) {
                pairs.push((r.outer.as_str(), r.inner.as_str()));
            }
            if !values.contains(&r.value) {
                values.push(r.value);
            }
        }
        values.sort_by(f64::total_cmp);

        let mut html = String::new();
        html.push_str("    <h3>Frequency of give by game type and treatment</h3>\n");
        html.push_str("    <table>\n");
        let headers: Vec<String> = pairs
            .iter()
            .map(|(outer, inner)| format!("{} / {}", outer, inner))
            .collect();
        let mut header_refs = vec!["Give"];
        header_refs.extend(headers.iter().map(String::as_str));
        html.push_str(&Self::header_row(&header_refs));

        for value in values {
            html.push_str(&format!("        <tr><td>{}</td>", format_number(value)));
            for (outer, inner) in &pairs {
                let cell = rows
                    .iter()
                    .find(|r| r.outer == *outer && r.inner == *inner && r.value == value)
                    .map(|r| format!("{} ({})", r.count, format_number(r.relative)))
                    .unwrap_or_default();
                html.push_str(&format!("<td>{}</td>", cell));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("    </table>\n");
        html
    }

    fn render_charts(&self) -> String {
        let mut html = String::new();
        for chart in &self.report.charts {
            html.push_str(&format!(
                "    <div class=\"chart\">\n    <h3>{}</h3>\n{}\n    </div>\n",
                Self::escape_html(&chart.title),
                chart.svg
            ));
        }
        html
    }

    /// Generate complete HTML document
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");

        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str("    <title>Bullying Dictator Game Replication</title>\n");
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str("    <h1>Bullying Dictator Game Replication</h1>\n");
        html.push_str(&format!(
            "    <p>{} subjects. Rows in bold are significant at FDR {}.</p>\n",
            self.report.n_observations, self.report.fdr_alpha
        ));

        html.push_str("    <h2>Hypothesis tests</h2>\n");
        html.push_str(&self.render_comparisons("Treatment and bully comparisons", &self.report.comparisons));
        html.push_str(&self.render_comparisons("CRT type comparisons", &self.report.crt_comparisons));
        html.push_str(&self.render_kruskal());
        html.push_str(&self.render_published());

        html.push_str("    <h2>Hurdle models</h2>\n");
        html.push_str(&self.render_merged("Count part", &self.report.count_table, true));
        html.push_str(&self.render_merged("Zero hurdle", &self.report.zero_table, false));
        html.push_str("    <p>* p &lt; 0.1, ** p &lt; 0.05, *** p &lt; 0.01. Cells: estimate (SE) [p].</p>\n");

        html.push_str("    <h2>Descriptive statistics</h2>\n");
        html.push_str(&self.render_descriptives());
        html.push_str(&self.render_frequencies());

        html.push_str("    <h2>Charts</h2>\n");
        html.push_str(&self.render_charts());

        html.push_str("    <div class=\"footer\">\n");
        html.push_str("        Generated by bdg-replication\n");
        html.push_str("    </div>\n");

        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }
}
