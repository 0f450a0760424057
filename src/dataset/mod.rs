//! Survey dataset: loading, derivation and schema-validated column access
//!
//! The dataset is an immutable value. Stages receive `&Dataset` and build
//! subsets with [`Dataset::stratum`] instead of mutating rows.

mod acquire;
mod observation;

pub use acquire::{ensure_cached, sha256_file};
pub use observation::{
    BullyType, Column, CrtThresholds, CrtType, GameType, LabelColumn, NumericColumn,
    Observation, RawObservation, TreatmentGroup, ENDOWMENT,
};

use crate::error::{AnalysisError, Result, SchemaError};
use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Columns the input file must provide
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "treatment",
    "bully",
    "kept",
    "crt_right",
    "crt_int",
    "female",
    "household_income",
    "ee",
    "nb",
    "ne",
];

/// Extensions read as workbooks; anything else is read as CSV
const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Cell spellings treated as missing
const MISSING_TOKENS: [&str; 4] = ["", "NA", ".", "nan"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Derive labels for every raw row
    pub fn from_raw(raws: Vec<RawObservation>, thresholds: &CrtThresholds) -> Result<Self> {
        let observations = raws
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| Observation::derive(raw, thresholds, idx + 1))
            .collect::<std::result::Result<Vec<_>, SchemaError>>()?;
        Ok(Self { observations })
    }

    /// Load a cached file, choosing the reader from its extension
    pub fn load<P: AsRef<Path>>(path: P, thresholds: &CrtThresholds) -> Result<Self> {
        let path = path.as_ref();
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SPREADSHEET_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)));
        if is_workbook {
            Self::load_spreadsheet(path, thresholds)
        } else {
            Self::load_csv(path, thresholds)
        }
    }

    /// Load the first worksheet of a workbook; its first row is the header
    pub fn load_spreadsheet<P: AsRef<Path>>(path: P, thresholds: &CrtThresholds) -> Result<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let parse_err = |reason: String| AnalysisError::Parse {
            path: source.clone(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| parse_err(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| parse_err("workbook has no worksheets".to_string()))?
            .map_err(|e| parse_err(e.to_string()))?;

        let mut rows = range.rows().map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect::<StringRecord>()
        });
        let headers = rows
            .next()
            .ok_or_else(|| parse_err("worksheet is empty".to_string()))?;

        let dataset = Self::from_records(&headers, rows.map(Ok), thresholds)?;
        tracing::debug!("Parsed {} observations from {}", dataset.len(), source);
        Ok(dataset)
    }

    /// Load a cached comma-separated file
    pub fn load_csv<P: AsRef<Path>>(path: P, thresholds: &CrtThresholds) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| AnalysisError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_reader(file, &path.display().to_string(), thresholds)
    }

    /// Parse comma-separated data from any reader
    ///
    /// `source` names the input in error messages.
    pub fn from_reader<R: Read>(reader: R, source: &str, thresholds: &CrtThresholds) -> Result<Self> {
        let parse_err = |reason: String| AnalysisError::Parse {
            path: source.to_string(),
            reason,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| parse_err(e.to_string()))?
            .clone();
        let records = reader
            .records()
            .map(|record| record.map_err(|e| parse_err(e.to_string())));

        let dataset = Self::from_records(&headers, records, thresholds)?;
        tracing::debug!("Parsed {} observations from {}", dataset.len(), source);
        Ok(dataset)
    }

    fn from_records<I>(headers: &StringRecord, records: I, thresholds: &CrtThresholds) -> Result<Self>
    where
        I: Iterator<Item = Result<StringRecord>>,
    {
        let index = HeaderIndex::new(headers)?;
        let mut raws = Vec::new();
        for (idx, record) in records.enumerate() {
            raws.push(index.parse_row(&record?, idx + 1)?);
        }
        Self::from_raw(raws, thresholds)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Resolve a numeric column by name, failing fast on unknown names
    ///
    /// The schema is fixed, so no dataset is needed to resolve a name.
    pub fn numeric_column(name: &str) -> std::result::Result<NumericColumn, SchemaError> {
        match name.parse::<Column>()? {
            Column::Numeric(col) => Ok(col),
            Column::Label(_) => Err(SchemaError::NotNumeric {
                column: name.to_string(),
            }),
        }
    }

    /// Resolve a label column by name, failing fast on unknown names
    pub fn label_column(name: &str) -> std::result::Result<LabelColumn, SchemaError> {
        match name.parse::<Column>()? {
            Column::Label(col) => Ok(col),
            Column::Numeric(_) => Err(SchemaError::NotCategorical {
                column: name.to_string(),
            }),
        }
    }

    pub fn values(&self, column: NumericColumn) -> Vec<Option<f64>> {
        self.observations.iter().map(|o| o.numeric(column)).collect()
    }

    /// Values of `value` for rows whose `group` label equals `level`
    pub fn values_where(&self, group: LabelColumn, level: &str, value: NumericColumn) -> Vec<f64> {
        self.observations
            .iter()
            .filter(|o| o.label(group) == level)
            .filter_map(|o| o.numeric(value))
            .collect()
    }

    /// Rows whose `column` label equals `level`
    pub fn stratum(&self, column: &str, level: &str) -> std::result::Result<Dataset, SchemaError> {
        let col = Self::label_column(column)?;
        Ok(Dataset {
            observations: self
                .observations
                .iter()
                .filter(|o| o.label(col) == level)
                .cloned()
                .collect(),
        })
    }

    /// Levels present in a label column, in presentation order
    pub fn levels(&self, column: LabelColumn) -> Vec<String> {
        match column.canonical_levels() {
            Some(levels) => levels
                .into_iter()
                .filter(|lvl| self.observations.iter().any(|o| o.label(column) == *lvl))
                .map(str::to_string)
                .collect(),
            None => {
                let mut seen: Vec<String> = Vec::new();
                for obs in &self.observations {
                    let lvl = obs.label(column);
                    if !seen.iter().any(|s| s == lvl) {
                        seen.push(lvl.to_string());
                    }
                }
                seen
            }
        }
    }

    /// Verify give + kept = ENDOWMENT on every row
    pub fn check_integrity(&self) -> Result<()> {
        for (idx, obs) in self.observations.iter().enumerate() {
            if obs.give + obs.kept != ENDOWMENT {
                return Err(SchemaError::OutOfRange {
                    column: "give".to_string(),
                    row: idx + 1,
                    value: obs.give,
                    min: ENDOWMENT - obs.kept,
                    max: ENDOWMENT - obs.kept,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Header positions of the required columns
struct HeaderIndex {
    positions: HashMap<&'static str, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> std::result::Result<Self, SchemaError> {
        let mut positions = HashMap::new();
        for name in REQUIRED_COLUMNS {
            let pos = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
            positions.insert(name, pos);
        }
        Ok(Self { positions })
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: &'static str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|&pos| record.get(pos))
            .unwrap_or("")
    }

    fn optional(
        &self,
        record: &StringRecord,
        column: &'static str,
        row: usize,
    ) -> std::result::Result<Option<f64>, SchemaError> {
        let cell = self.cell(record, column);
        if MISSING_TOKENS.contains(&cell) {
            return Ok(None);
        }
        cell.parse::<f64>()
            .map(Some)
            .map_err(|_| SchemaError::InvalidValue {
                column: column.to_string(),
                row,
                value: cell.to_string(),
            })
    }

    fn required_int(
        &self,
        record: &StringRecord,
        column: &'static str,
        row: usize,
    ) -> std::result::Result<i64, SchemaError> {
        let value = self
            .optional(record, column, row)?
            .ok_or_else(|| SchemaError::MissingValue {
                column: column.to_string(),
                row,
            })?;
        if value.fract() != 0.0 {
            return Err(SchemaError::InvalidValue {
                column: column.to_string(),
                row,
                value: self.cell(record, column).to_string(),
            });
        }
        Ok(value as i64)
    }

    fn required_flag(
        &self,
        record: &StringRecord,
        column: &'static str,
        row: usize,
    ) -> std::result::Result<bool, SchemaError> {
        let cell = self.cell(record, column);
        match cell.to_ascii_lowercase().as_str() {
            "true" => return Ok(true),
            "false" => return Ok(false),
            _ => {}
        }
        match self.required_int(record, column, row)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(SchemaError::InvalidValue {
                column: column.to_string(),
                row,
                value: cell.to_string(),
            }),
        }
    }

    fn parse_row(
        &self,
        record: &StringRecord,
        row: usize,
    ) -> std::result::Result<RawObservation, SchemaError> {
        let treatment = self.cell(record, "treatment");
        if treatment.is_empty() {
            return Err(SchemaError::MissingValue {
                column: "treatment".to_string(),
                row,
            });
        }

        Ok(RawObservation {
            treatment: treatment.to_string(),
            bully: self.required_flag(record, "bully", row)?,
            kept: self.required_int(record, "kept", row)?,
            crt_right: self.required_int(record, "crt_right", row)?,
            crt_int: self.required_int(record, "crt_int", row)?,
            female: self.optional(record, "female", row)?,
            household_income: self.optional(record, "household_income", row)?,
            ee: self.optional(record, "ee", row)?,
            nb: self.optional(record, "nb", row)?,
            ne: self.optional(record, "ne", row)?,
        })
    }
}
