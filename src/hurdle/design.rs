// Design matrix for one model variant

use crate::config::{ModelConfig, ModelSpec};
use crate::dataset::{Dataset, NumericColumn, TreatmentGroup};
use crate::error::{AnalysisError, Result};
use ndarray::{Array1, Array2};

pub const INTERCEPT: &str = "(Intercept)";

/// Predictors and outcome after listwise deletion
#[derive(Debug, Clone)]
pub struct Design {
    pub names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Rows dropped for missing values
    pub dropped: usize,
}

impl Design {
    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Rows with a positive outcome, for the truncated count part
    pub fn positive(&self) -> (Array2<f64>, Array1<f64>) {
        let rows: Vec<usize> = (0..self.y.len()).filter(|&i| self.y[i] > 0.0).collect();
        let x = self.x.select(ndarray::Axis(0), &rows);
        let y = self.y.select(ndarray::Axis(0), &rows);
        (x, y)
    }

    /// 0/1 indicator of a positive outcome, for the zero hurdle
    pub fn crossed(&self) -> Array1<f64> {
        self.y.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }
}

/// Numeric predictors of a variant, in column order
pub fn covariates(models: &ModelConfig, spec: &ModelSpec) -> Vec<String> {
    let mut names = vec!["bully".to_string(), spec.crt_encoding.column().to_string()];
    names.extend(models.base_covariates.iter().cloned());
    if spec.extended {
        names.extend(models.extended_covariates.iter().cloned());
    }
    names
}

/// Intercept, treatment dummies against Control, then the numeric covariates
pub fn build_design(dataset: &Dataset, models: &ModelConfig, spec: &ModelSpec) -> Result<Design> {
    let outcome = Dataset::numeric_column(&models.outcome)?;
    let numeric = covariates(models, spec)
        .iter()
        .map(|name| Dataset::numeric_column(name))
        .collect::<std::result::Result<Vec<NumericColumn>, _>>()?;

    let mut names = vec![
        INTERCEPT.to_string(),
        format!("treatment_group{}", TreatmentGroup::Delay.code()),
        format!("treatment_group{}", TreatmentGroup::MultipleDelay.code()),
    ];
    names.extend(numeric.iter().map(|c| c.name().to_string()));

    let mut cells = Vec::with_capacity(dataset.len() * names.len());
    let mut y = Vec::with_capacity(dataset.len());
    let mut dropped = 0;

    'rows: for obs in dataset.observations() {
        let Some(outcome_value) = obs.numeric(outcome) else {
            dropped += 1;
            continue;
        };
        let mut row = Vec::with_capacity(names.len());
        row.push(1.0);
        row.push(f64::from(u8::from(obs.treatment_group == TreatmentGroup::Delay)));
        row.push(f64::from(u8::from(obs.treatment_group == TreatmentGroup::MultipleDelay)));
        for &column in &numeric {
            match obs.numeric(column) {
                Some(v) => row.push(v),
                None => {
                    dropped += 1;
                    continue 'rows;
                }
            }
        }
        cells.extend(row);
        y.push(outcome_value);
    }

    let model_err = |reason: String| AnalysisError::Model {
        model: spec.name.clone(),
        reason,
    };

    if y.is_empty() {
        return Err(model_err("no complete rows after dropping missing values".to_string()));
    }

    let x = Array2::from_shape_vec((y.len(), names.len()), cells)
        .map_err(|e| model_err(e.to_string()))?;

    if dropped > 0 {
        tracing::debug!("Model {}: dropped {} incomplete rows", spec.name, dropped);
    }

    Ok(Design {
        names,
        x,
        y: Array1::from(y),
        dropped,
    })
}
