//! Observation rows and the categorical labels derived from raw columns

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dictator game endowment; every row satisfies give + kept = ENDOWMENT
pub const ENDOWMENT: i64 = 60;

/// Experimental treatment arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TreatmentGroup {
    Control,
    Delay,
    MultipleDelay,
}

impl TreatmentGroup {
    pub const ALL: [TreatmentGroup; 3] = [Self::Control, Self::Delay, Self::MultipleDelay];

    pub fn code(self) -> &'static str {
        match self {
            Self::Control => "C",
            Self::Delay => "TD",
            Self::MultipleDelay => "MD",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Control => "Control",
            Self::Delay => "Delay",
            Self::MultipleDelay => "Multiple Delay",
        }
    }

    /// Map a raw survey label onto a treatment arm (case-insensitive)
    pub fn from_raw(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "c" | "control" | "0" => Some(Self::Control),
            "td" | "d" | "delay" | "time delay" | "1" => Some(Self::Delay),
            "md" | "multiple delay" | "multiple-delay" | "multiple_delay" | "2" => {
                Some(Self::MultipleDelay)
            }
            _ => None,
        }
    }
}

/// Standard vs bullying dictator game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameType {
    Standard,
    Bullying,
}

impl GameType {
    pub const ALL: [GameType; 2] = [Self::Standard, Self::Bullying];

    pub fn from_bully(bully: bool) -> Self {
        if bully {
            Self::Bullying
        } else {
            Self::Standard
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Standard => "SDG",
            Self::Bullying => "BDG",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Standard => "Standard Dictator Game",
            Self::Bullying => "Bullying Dictator Game",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BullyType {
    Bully,
    NonBully,
}

impl BullyType {
    pub const ALL: [BullyType; 2] = [Self::Bully, Self::NonBully];

    pub fn from_bully(bully: bool) -> Self {
        if bully {
            Self::Bully
        } else {
            Self::NonBully
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Bully => "B",
            Self::NonBully => "NB",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Bully => "Bully",
            Self::NonBully => "Non-bully",
        }
    }
}

/// Reasoning style classified from Cognitive Reflection Test answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CrtType {
    Reflective,
    Impulsive,
    Residual,
}

impl CrtType {
    pub const ALL: [CrtType; 3] = [Self::Reflective, Self::Impulsive, Self::Residual];

    /// Reflective wins over impulsive when both thresholds are met
    pub fn classify(crt_right: i64, crt_int: i64, thresholds: &CrtThresholds) -> Self {
        if crt_right >= thresholds.reflective_min_right {
            Self::Reflective
        } else if crt_int >= thresholds.impulsive_min_intuitive {
            Self::Impulsive
        } else {
            Self::Residual
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Reflective => "R",
            Self::Impulsive => "I",
            Self::Residual => "Res",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Reflective => "Reflective",
            Self::Impulsive => "Impulsive",
            Self::Residual => "Residual",
        }
    }
}

/// Score cut-offs for [`CrtType::classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrtThresholds {
    /// Minimum correct answers to count as reflective
    pub reflective_min_right: i64,
    /// Minimum intuitive (wrong-but-tempting) answers to count as impulsive
    pub impulsive_min_intuitive: i64,
}

impl Default for CrtThresholds {
    fn default() -> Self {
        Self {
            reflective_min_right: 2,
            impulsive_min_intuitive: 2,
        }
    }
}

/// Raw survey columns of one subject, before derivation
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub treatment: String,
    pub bully: bool,
    pub kept: i64,
    pub crt_right: i64,
    pub crt_int: i64,
    pub female: Option<f64>,
    pub household_income: Option<f64>,
    pub ee: Option<f64>,
    pub nb: Option<f64>,
    pub ne: Option<f64>,
}

/// One experimental subject with derived group labels
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub treatment: String,
    pub bully: bool,
    pub kept: i64,
    pub give: i64,
    pub crt_right: i64,
    pub crt_int: i64,
    pub female: Option<f64>,
    pub household_income: Option<f64>,
    pub ee: Option<f64>,
    pub nb: Option<f64>,
    pub ne: Option<f64>,
    pub treatment_group: TreatmentGroup,
    pub game_type: GameType,
    pub bully_type: BullyType,
    pub crt_type: CrtType,
}

impl Observation {
    /// Derive group labels from raw columns
    ///
    /// `row` is the 1-based data row, used only for error messages.
    pub fn derive(
        raw: RawObservation,
        thresholds: &CrtThresholds,
        row: usize,
    ) -> Result<Self, SchemaError> {
        if !(0..=ENDOWMENT).contains(&raw.kept) {
            return Err(SchemaError::OutOfRange {
                column: "kept".to_string(),
                row,
                value: raw.kept,
                min: 0,
                max: ENDOWMENT,
            });
        }

        let treatment_group =
            TreatmentGroup::from_raw(&raw.treatment).ok_or_else(|| SchemaError::InvalidValue {
                column: "treatment".to_string(),
                row,
                value: raw.treatment.clone(),
            })?;

        Ok(Self {
            give: ENDOWMENT - raw.kept,
            treatment_group,
            game_type: GameType::from_bully(raw.bully),
            bully_type: BullyType::from_bully(raw.bully),
            crt_type: CrtType::classify(raw.crt_right, raw.crt_int, thresholds),
            treatment: raw.treatment,
            bully: raw.bully,
            kept: raw.kept,
            crt_right: raw.crt_right,
            crt_int: raw.crt_int,
            female: raw.female,
            household_income: raw.household_income,
            ee: raw.ee,
            nb: raw.nb,
            ne: raw.ne,
        })
    }

    pub fn numeric(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Bully => Some(if self.bully { 1.0 } else { 0.0 }),
            NumericColumn::Kept => Some(self.kept as f64),
            NumericColumn::Give => Some(self.give as f64),
            NumericColumn::CrtRight => Some(self.crt_right as f64),
            NumericColumn::CrtInt => Some(self.crt_int as f64),
            NumericColumn::Female => self.female,
            NumericColumn::HouseholdIncome => self.household_income,
            NumericColumn::Ee => self.ee,
            NumericColumn::Nb => self.nb,
            NumericColumn::Ne => self.ne,
        }
    }

    pub fn label(&self, column: LabelColumn) -> &str {
        match column {
            LabelColumn::Treatment => &self.treatment,
            LabelColumn::TreatmentGroup => self.treatment_group.code(),
            LabelColumn::GameType => self.game_type.code(),
            LabelColumn::BullyType => self.bully_type.code(),
            LabelColumn::CrtType => self.crt_type.code(),
        }
    }
}

/// Columns holding numbers (possibly missing for optional covariates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericColumn {
    Bully,
    Kept,
    Give,
    CrtRight,
    CrtInt,
    Female,
    HouseholdIncome,
    Ee,
    Nb,
    Ne,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 10] = [
        Self::Bully,
        Self::Kept,
        Self::Give,
        Self::CrtRight,
        Self::CrtInt,
        Self::Female,
        Self::HouseholdIncome,
        Self::Ee,
        Self::Nb,
        Self::Ne,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Bully => "bully",
            Self::Kept => "kept",
            Self::Give => "give",
            Self::CrtRight => "crt_right",
            Self::CrtInt => "crt_int",
            Self::Female => "female",
            Self::HouseholdIncome => "household_income",
            Self::Ee => "ee",
            Self::Nb => "nb",
            Self::Ne => "ne",
        }
    }
}

/// Columns holding categorical labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelColumn {
    Treatment,
    TreatmentGroup,
    GameType,
    BullyType,
    CrtType,
}

impl LabelColumn {
    pub const ALL: [LabelColumn; 5] = [
        Self::Treatment,
        Self::TreatmentGroup,
        Self::GameType,
        Self::BullyType,
        Self::CrtType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Treatment => "treatment",
            Self::TreatmentGroup => "treatment_group",
            Self::GameType => "game_type",
            Self::BullyType => "bully_type",
            Self::CrtType => "crt_type",
        }
    }

    /// Level codes in presentation order; `None` for the free-form raw column
    pub fn canonical_levels(self) -> Option<Vec<&'static str>> {
        match self {
            Self::Treatment => None,
            Self::TreatmentGroup => Some(TreatmentGroup::ALL.iter().map(|t| t.code()).collect()),
            Self::GameType => Some(GameType::ALL.iter().map(|g| g.code()).collect()),
            Self::BullyType => Some(BullyType::ALL.iter().map(|b| b.code()).collect()),
            Self::CrtType => Some(CrtType::ALL.iter().map(|c| c.code()).collect()),
        }
    }

    /// Human-readable name of a level code, falling back to the code itself
    pub fn display_level(self, code: &str) -> String {
        let name = match self {
            Self::Treatment => None,
            Self::TreatmentGroup => TreatmentGroup::ALL
                .iter()
                .find(|t| t.code() == code)
                .map(|t| t.display_name()),
            Self::GameType => GameType::ALL
                .iter()
                .find(|g| g.code() == code)
                .map(|g| g.display_name()),
            Self::BullyType => BullyType::ALL
                .iter()
                .find(|b| b.code() == code)
                .map(|b| b.display_name()),
            Self::CrtType => CrtType::ALL
                .iter()
                .find(|c| c.code() == code)
                .map(|c| c.display_name()),
        };
        name.map(str::to_string).unwrap_or_else(|| code.to_string())
    }
}

/// Any addressable column, resolved from a runtime name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Numeric(NumericColumn),
    Label(LabelColumn),
}

impl FromStr for Column {
    type Err = SchemaError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        if let Some(col) = NumericColumn::ALL.iter().find(|c| c.name() == name) {
            return Ok(Column::Numeric(*col));
        }
        if let Some(col) = LabelColumn::ALL.iter().find(|c| c.name() == name) {
            return Ok(Column::Label(*col));
        }
        Err(SchemaError::UnknownColumn(name.to_string()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Numeric(c) => f.write_str(c.name()),
            Column::Label(c) => f.write_str(c.name()),
        }
    }
}
