// Log-likelihoods of the two hurdle parts
//
// Each part is maximized on its own: the binomial logit on I(y > 0) over all
// rows, and a zero-truncated count density over the positive rows. The
// linear predictor is η = Xβ with a logit or log link.

use crate::special::{digamma, ln_gamma, ln_one_minus_exp_neg};
use ndarray::{Array1, Array2};

/// A log-likelihood with an analytic gradient
pub trait LogLikelihood {
    fn n_params(&self) -> usize;

    fn value(&self, params: &Array1<f64>) -> f64;

    fn gradient(&self, params: &Array1<f64>) -> Array1<f64>;
}

/// log(1 + e^x) without overflow
fn log1p_exp(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Binomial logit for the zero hurdle
pub struct Logit {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Logit {
    pub fn new(x: Array2<f64>, y: Array1<f64>) -> Self {
        Self { x, y }
    }
}

impl LogLikelihood for Logit {
    fn n_params(&self) -> usize {
        self.x.ncols()
    }

    fn value(&self, params: &Array1<f64>) -> f64 {
        let eta = self.x.dot(params);
        eta.iter()
            .zip(self.y.iter())
            .map(|(&e, &y)| y * e - log1p_exp(e))
            .sum()
    }

    fn gradient(&self, params: &Array1<f64>) -> Array1<f64> {
        let eta = self.x.dot(params);
        let residual = &self.y - &eta.mapv(sigmoid);
        self.x.t().dot(&residual)
    }
}

/// Poisson truncated at zero, log link
pub struct TruncatedPoisson {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl TruncatedPoisson {
    pub fn new(x: Array2<f64>, y: Array1<f64>) -> Self {
        Self { x, y }
    }
}

impl LogLikelihood for TruncatedPoisson {
    fn n_params(&self) -> usize {
        self.x.ncols()
    }

    fn value(&self, params: &Array1<f64>) -> f64 {
        let eta = self.x.dot(params);
        eta.iter()
            .zip(self.y.iter())
            .map(|(&e, &y)| {
                let mu = e.exp();
                y * e - mu - ln_gamma(y + 1.0) - ln_one_minus_exp_neg(mu)
            })
            .sum()
    }

    fn gradient(&self, params: &Array1<f64>) -> Array1<f64> {
        let eta = self.x.dot(params);
        let score: Array1<f64> = eta
            .iter()
            .zip(self.y.iter())
            .map(|(&e, &y)| {
                let mu = e.exp();
                // P(0) / (1 - P(0)) * d log P(0) / dη = -μ / (e^μ - 1)
                y - mu - mu / mu.exp_m1()
            })
            .collect();
        self.x.t().dot(&score)
    }
}

/// Negative binomial (NB2) truncated at zero; the last parameter is log(θ)
pub struct TruncatedNegBin {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl TruncatedNegBin {
    pub fn new(x: Array2<f64>, y: Array1<f64>) -> Self {
        Self { x, y }
    }

    fn split<'a>(&self, params: &'a Array1<f64>) -> (ndarray::ArrayView1<'a, f64>, f64) {
        let k = self.x.ncols();
        (params.slice(ndarray::s![..k]), params[k].exp())
    }
}

impl LogLikelihood for TruncatedNegBin {
    fn n_params(&self) -> usize {
        self.x.ncols() + 1
    }

    fn value(&self, params: &Array1<f64>) -> f64 {
        let (beta, theta) = self.split(params);
        let eta = self.x.dot(&beta);
        let ln_gamma_theta = ln_gamma(theta);
        eta.iter()
            .zip(self.y.iter())
            .map(|(&e, &y)| {
                let mu = e.exp();
                let ln_total = (theta + mu).ln();
                let ln_p0 = theta * (theta.ln() - ln_total);
                ln_gamma(y + theta) - ln_gamma_theta - ln_gamma(y + 1.0)
                    + ln_p0
                    + y * (e - ln_total)
                    - ln_one_minus_exp_neg(-ln_p0)
            })
            .sum()
    }

    fn gradient(&self, params: &Array1<f64>) -> Array1<f64> {
        let (beta, theta) = self.split(params);
        let eta = self.x.dot(&beta);
        let psi_theta = digamma(theta);

        let mut d_log_theta = 0.0;
        let score: Array1<f64> = eta
            .iter()
            .zip(self.y.iter())
            .map(|(&e, &y)| {
                let mu = e.exp();
                let total = theta + mu;
                let ln_ratio = (theta / total).ln();
                let ln_p0 = theta * ln_ratio;
                // p0 / (1 - p0)
                let odds = 1.0 / (-ln_p0).exp_m1();

                let d_eta = theta * (y - mu) / total;
                let d_p0_eta = -theta * mu / total;

                let d_theta = digamma(y + theta) - psi_theta + ln_ratio + 1.0 - (theta + y) / total;
                let d_p0_theta = ln_ratio + mu / total;
                d_log_theta += theta * (d_theta + odds * d_p0_theta);

                d_eta + odds * d_p0_eta
            })
            .collect();

        let mut gradient = Array1::zeros(self.n_params());
        gradient
            .slice_mut(ndarray::s![..self.x.ncols()])
            .assign(&self.x.t().dot(&score));
        gradient[self.x.ncols()] = d_log_theta;
        gradient
    }
}
