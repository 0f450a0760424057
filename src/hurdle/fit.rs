// Fitting both hurdle parts and collecting Wald statistics

use super::design::{build_design, Design};
use super::likelihood::{LogLikelihood, Logit, TruncatedNegBin, TruncatedPoisson};
use super::optimizer::{maximize, NewtonOptions, Optimum};
use crate::config::{CountDistribution, ModelConfig, ModelSpec};
use crate::dataset::Dataset;
use crate::error::{AnalysisError, Result};
use crate::special::normal_two_sided;
use crate::table::{format_coefficient, CoefficientTable};
use ndarray::Array1;
use serde::Serialize;

/// Row name of the negative-binomial dispersion parameter
pub const LOG_THETA: &str = "Log(theta)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
}

/// One maximized part of the hurdle model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartFit {
    pub coefficients: Vec<Coefficient>,
    pub loglik: f64,
    pub n_obs: usize,
    pub iterations: usize,
}

impl PartFit {
    fn from_optimum(names: &[String], optimum: &Optimum, n_obs: usize) -> Self {
        let std_errors = optimum.std_errors();
        let coefficients = names
            .iter()
            .zip(optimum.params.iter().zip(std_errors.iter()))
            .map(|(name, (&estimate, &std_error))| {
                let z = estimate / std_error;
                Coefficient {
                    name: name.clone(),
                    estimate,
                    std_error,
                    z,
                    p_value: normal_two_sided(z),
                }
            })
            .collect();
        Self {
            coefficients,
            loglik: optimum.loglik,
            n_obs,
            iterations: optimum.iterations,
        }
    }

    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Formatted `estimate<stars> (SE) [p]` cells under `model`
    pub fn table(&self, model: &str) -> CoefficientTable {
        let mut table = CoefficientTable::new(model);
        for c in &self.coefficients {
            table.push(&c.name, format_coefficient(c.estimate, c.std_error, c.p_value));
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HurdleFit {
    pub name: String,
    pub distribution: CountDistribution,
    /// Truncated count part over positive outcomes
    pub count: PartFit,
    /// Binomial logit on outcome > 0 over all complete rows
    pub zero: PartFit,
    /// Dispersion for the negative-binomial count part
    pub theta: Option<f64>,
    pub n_obs: usize,
    pub n_positive: usize,
    pub dropped: usize,
}

impl HurdleFit {
    /// Joint log-likelihood; the parts are independent
    pub fn loglik(&self) -> f64 {
        self.count.loglik + self.zero.loglik
    }
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Fit one model variant
pub fn fit_hurdle(dataset: &Dataset, models: &ModelConfig, spec: &ModelSpec) -> Result<HurdleFit> {
    let design = build_design(dataset, models, spec)?;
    let model_err = |reason: String| AnalysisError::Model {
        model: spec.name.clone(),
        reason,
    };
    let options = NewtonOptions {
        max_iterations: models.max_iterations,
        tolerance: models.tolerance,
    };
    let k = design.names.len();

    let crossed = design.crossed();
    let n_positive = crossed.iter().filter(|&&v| v > 0.0).count();
    if n_positive == 0 || n_positive == design.n_obs() {
        return Err(model_err(format!(
            "zero hurdle needs both zero and positive outcomes ({} of {} positive)",
            n_positive,
            design.n_obs()
        )));
    }
    if n_positive <= k {
        return Err(model_err(format!(
            "{} positive outcomes cannot identify {} count parameters",
            n_positive, k
        )));
    }

    let mut zero_start = Array1::zeros(k);
    zero_start[0] = logit(n_positive as f64 / design.n_obs() as f64);
    let zero_model = Logit::new(design.x.clone(), crossed);
    let zero_opt = maximize(&zero_model, zero_start, &options)
        .map_err(|e| model_err(format!("zero hurdle: {}", e)))?;
    let zero = PartFit::from_optimum(&design.names, &zero_opt, design.n_obs());

    let (count, theta) = fit_count(&design, models.count_distribution, &options)
        .map_err(|e| model_err(format!("count part: {}", e)))?;

    tracing::info!(
        "Model {}: n = {}, positive = {}, loglik = {:.3}",
        spec.name,
        design.n_obs(),
        n_positive,
        count.loglik + zero.loglik
    );

    Ok(HurdleFit {
        name: spec.name.clone(),
        distribution: models.count_distribution,
        count,
        zero,
        theta,
        n_obs: design.n_obs(),
        n_positive,
        dropped: design.dropped,
    })
}

fn fit_count(
    design: &Design,
    distribution: CountDistribution,
    options: &NewtonOptions,
) -> std::result::Result<(PartFit, Option<f64>), super::optimizer::OptimizeError> {
    let (x, y) = design.positive();
    let n = y.len();
    let k = design.names.len();
    let mean = y.mean().unwrap_or(1.0);

    match distribution {
        CountDistribution::Poisson => {
            let mut start = Array1::zeros(k);
            start[0] = mean.ln();
            let model = TruncatedPoisson::new(x, y);
            let opt = maximize(&model, start, options)?;
            Ok((PartFit::from_optimum(&design.names, &opt, n), None))
        }
        CountDistribution::NegBin => {
            let model = TruncatedNegBin::new(x, y);
            let mut start = Array1::zeros(model.n_params());
            start[0] = mean.ln();
            let opt = maximize(&model, start, options)?;
            let mut names = design.names.clone();
            names.push(LOG_THETA.to_string());
            let theta = opt.params[k].exp();
            Ok((PartFit::from_optimum(&names, &opt, n), Some(theta)))
        }
    }
}

/// Fit every configured variant in order
pub fn fit_all(dataset: &Dataset, models: &ModelConfig) -> Result<Vec<HurdleFit>> {
    models
        .variants
        .iter()
        .map(|spec| fit_hurdle(dataset, models, spec))
        .collect()
}
