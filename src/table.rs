//! Coefficient formatting and side-by-side table merging
//!
//! Cells are rendered as `estimate<stars> (SE) [p]` with every number
//! rounded to three decimals. Tables from several models are outer-joined on
//! the predictor name; a predictor missing from a model shows [`MISSING`].

use serde::Serialize;

/// Marker for a cell whose model does not contain the predictor
pub const MISSING: &str = "NA";

/// Decimal places shown in coefficient cells
pub const CELL_DECIMALS: u32 = 3;

/// Round half away from zero to `decimals` places; negative zero becomes zero
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Rounded number without trailing zeros
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return MISSING.to_string();
    }
    format!("{}", round_to(value, CELL_DECIMALS))
}

/// Significance stars: `***` below 0.01, `**` below 0.05, `*` below 0.1
pub fn stars(p_value: f64) -> &'static str {
    if p_value < 0.01 {
        "***"
    } else if p_value < 0.05 {
        "**"
    } else if p_value < 0.1 {
        "*"
    } else {
        ""
    }
}

/// `estimate<stars> (SE) [p]`
pub fn format_coefficient(estimate: f64, std_error: f64, p_value: f64) -> String {
    format!(
        "{}{} ({}) [{}]",
        format_number(estimate),
        stars(p_value),
        format_number(std_error),
        format_number(p_value)
    )
}

/// One model's formatted column, keyed by predictor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientTable {
    pub name: String,
    pub rows: Vec<(String, String)>,
}

impl CoefficientTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, predictor: impl Into<String>, cell: impl Into<String>) {
        self.rows.push((predictor.into(), cell.into()));
    }

    pub fn get(&self, predictor: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(name, _)| name == predictor)
            .map(|(_, cell)| cell.as_str())
    }
}

/// Several models side by side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTable {
    /// Model names, one per value column
    pub columns: Vec<String>,
    /// Predictor name and one cell per model
    pub rows: Vec<(String, Vec<String>)>,
}

/// Outer-join tables on predictor name
///
/// Row order follows the first table, then predictors first seen in later
/// tables in order of appearance.
pub fn merge_tables(tables: &[CoefficientTable]) -> MergedTable {
    let mut predictors: Vec<&str> = Vec::new();
    for table in tables {
        for (name, _) in &table.rows {
            if !predictors.contains(&name.as_str()) {
                predictors.push(name);
            }
        }
    }

    let rows = predictors
        .into_iter()
        .map(|predictor| {
            let cells = tables
                .iter()
                .map(|t| t.get(predictor).unwrap_or(MISSING).to_string())
                .collect();
            (predictor.to_string(), cells)
        })
        .collect();

    MergedTable {
        columns: tables.iter().map(|t| t.name.clone()).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stars_thresholds() {
        assert_eq!(stars(0.095), "*");
        assert_eq!(stars(0.03), "**");
        assert_eq!(stars(0.005), "***");
        assert_eq!(stars(0.5), "");
        // Boundaries are exclusive
        assert_eq!(stars(0.01), "**");
        assert_eq!(stars(0.05), "*");
        assert_eq!(stars(0.1), "");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(2.0005, 3), 2.001);
        assert_eq!(round_to(-0.0004, 3), 0.0);
        assert!(round_to(-0.0004, 3).is_sign_positive());
        assert!(round_to(f64::NAN, 3).is_nan());
    }

    #[test]
    fn test_format_number_drops_trailing_zeros() {
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0001), "0");
        assert_eq!(format_number(0.1239), "0.124");
        assert_eq!(format_number(f64::NAN), "NA");
    }

    #[test]
    fn test_format_coefficient() {
        assert_eq!(format_coefficient(0.4567, 0.1, 0.0049), "0.457*** (0.1) [0.005]");
        assert_eq!(format_coefficient(-1.2, 0.8, 0.134), "-1.2 (0.8) [0.134]");
        assert_eq!(format_coefficient(0.2, 0.1, 0.0455), "0.2** (0.1) [0.046]");
    }

    #[test]
    fn test_merge_keeps_every_predictor() {
        let mut base = CoefficientTable::new("(1)");
        base.push("(Intercept)", "1");
        base.push("bully", "2");
        base.push("crt_right", "3");

        let mut extended = CoefficientTable::new("(2)");
        extended.push("(Intercept)", "4");
        extended.push("crt_int", "5");
        extended.push("bully", "6");
        extended.push("ee", "7");

        let merged = merge_tables(&[base, extended]);
        assert_eq!(merged.columns, vec!["(1)", "(2)"]);

        let names: Vec<&str> = merged.rows.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["(Intercept)", "bully", "crt_right", "crt_int", "ee"]);
        assert_eq!(merged.rows[2].1, vec!["3", MISSING]);
        assert_eq!(merged.rows[3].1, vec![MISSING, "5"]);
        assert_eq!(merged.rows[1].1, vec!["2", "6"]);
    }

    #[test]
    fn test_merge_empty() {
        let merged = merge_tables(&[]);
        assert!(merged.columns.is_empty());
        assert!(merged.rows.is_empty());
    }
}
