// Damped Newton-Raphson maximizer
//
// The Hessian is a central difference of the analytic gradient. When the
// negated Hessian is not positive definite a ridge is added until the
// Cholesky factorization succeeds; steps are halved until the log-likelihood
// does not decrease. Standard errors come from the inverse of the observed
// information at the optimum, which must factor without a ridge.

use super::likelihood::LogLikelihood;
use ndarray::{Array1, Array2};

const MAX_HALVINGS: usize = 40;
const MAX_RIDGE_TRIES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonOptions {
    pub max_iterations: usize,
    /// Convergence threshold on the Newton decrement g'(-H)^-1 g / 2
    pub tolerance: f64,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Optimum {
    pub params: Array1<f64>,
    pub loglik: f64,
    pub covariance: Array2<f64>,
    pub iterations: usize,
}

impl Optimum {
    pub fn std_errors(&self) -> Array1<f64> {
        self.covariance.diag().mapv(f64::sqrt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError {
    NonFinite,
    NotConverged { iterations: usize },
    Singular,
}

impl std::fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite => write!(f, "log-likelihood is not finite at the start values"),
            Self::NotConverged { iterations } => {
                write!(f, "Newton-Raphson did not converge in {} iterations", iterations)
            }
            Self::Singular => write!(f, "information matrix is singular"),
        }
    }
}

/// Hessian by central differences of the gradient, symmetrized
pub fn numerical_hessian<L: LogLikelihood>(model: &L, params: &Array1<f64>) -> Array2<f64> {
    let k = params.len();
    let mut hessian = Array2::zeros((k, k));
    for j in 0..k {
        let h = 1e-5 * params[j].abs().max(1.0);
        let mut up = params.clone();
        let mut down = params.clone();
        up[j] += h;
        down[j] -= h;
        let column = (model.gradient(&up) - model.gradient(&down)) / (2.0 * h);
        hessian.column_mut(j).assign(&column);
    }
    (&hessian + &hessian.t()) / 2.0
}

/// Lower-triangular L with A = L L', or `None` if A is not positive definite
pub fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve L L' x = b by forward then back substitution
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Inverse of a symmetric positive definite matrix
pub fn spd_inverse(a: &Array2<f64>) -> Option<Array2<f64>> {
    let l = cholesky(a)?;
    let n = a.nrows();
    let mut inverse = Array2::zeros((n, n));
    for j in 0..n {
        let mut e = Array1::zeros(n);
        e[j] = 1.0;
        inverse.column_mut(j).assign(&cholesky_solve(&l, &e));
    }
    Some(inverse)
}

/// Factor `info`, adding a growing ridge if it is not positive definite
fn damped_cholesky(info: &Array2<f64>) -> Option<Array2<f64>> {
    if let Some(l) = cholesky(info) {
        return Some(l);
    }
    let n = info.nrows();
    let scale = (info.diag().iter().map(|d| d.abs()).sum::<f64>() / n as f64).max(1e-8);
    let mut ridge = 1e-6 * scale;
    for _ in 0..MAX_RIDGE_TRIES {
        let mut damped = info.clone();
        for i in 0..n {
            damped[[i, i]] += ridge;
        }
        if let Some(l) = cholesky(&damped) {
            return Some(l);
        }
        ridge *= 10.0;
    }
    None
}

/// Maximize `model` from `start`
pub fn maximize<L: LogLikelihood>(
    model: &L,
    start: Array1<f64>,
    options: &NewtonOptions,
) -> Result<Optimum, OptimizeError> {
    let mut params = start;
    let mut loglik = model.value(&params);
    if !loglik.is_finite() {
        return Err(OptimizeError::NonFinite);
    }

    let mut converged = false;
    let mut iterations = 0;
    while iterations < options.max_iterations {
        iterations += 1;
        let gradient = model.gradient(&params);
        let info = -numerical_hessian(model, &params);
        let l = damped_cholesky(&info).ok_or(OptimizeError::Singular)?;
        let step = cholesky_solve(&l, &gradient);

        let decrement = gradient.dot(&step) / 2.0;
        tracing::trace!("iteration {}: loglik = {:.8}, decrement = {:.3e}", iterations, loglik, decrement);
        if decrement.abs() < options.tolerance {
            converged = true;
            break;
        }

        let mut scale = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_HALVINGS {
            let candidate = &params + &(&step * scale);
            let value = model.value(&candidate);
            if value.is_finite() && value >= loglik {
                params = candidate;
                loglik = value;
                accepted = true;
                break;
            }
            scale /= 2.0;
        }
        if !accepted {
            // No ascent direction left at machine precision
            converged = decrement.abs() < options.tolerance.sqrt();
            break;
        }
    }

    if !converged {
        return Err(OptimizeError::NotConverged { iterations });
    }

    let info = -numerical_hessian(model, &params);
    let covariance = spd_inverse(&info).ok_or(OptimizeError::Singular)?;
    tracing::debug!("Converged after {} iterations, loglik = {:.4}", iterations, loglik);

    Ok(Optimum {
        params,
        loglik,
        covariance,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Concave quadratic -(x - c)' A (x - c) / 2
    struct Quadratic {
        a: Array2<f64>,
        center: Array1<f64>,
    }

    impl LogLikelihood for Quadratic {
        fn n_params(&self) -> usize {
            self.center.len()
        }

        fn value(&self, params: &Array1<f64>) -> f64 {
            let d = params - &self.center;
            -d.dot(&self.a.dot(&d)) / 2.0
        }

        fn gradient(&self, params: &Array1<f64>) -> Array1<f64> {
            -self.a.dot(&(params - &self.center))
        }
    }

    #[test]
    fn test_cholesky_round_trip() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let l = cholesky(&a).unwrap();
        let rebuilt = l.dot(&l.t());
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        assert!(cholesky(&array![[1.0, 2.0], [2.0, 1.0]]).is_none());
        assert!(cholesky(&array![[0.0, 0.0], [0.0, 1.0]]).is_none());
    }

    #[test]
    fn test_spd_inverse() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let inv = spd_inverse(&a).unwrap();
        let identity = a.dot(&inv);
        assert!((identity[[0, 0]] - 1.0).abs() < 1e-12);
        assert!(identity[[0, 1]].abs() < 1e-12);
        assert!((inv[[0, 0]] - 3.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_maximize_quadratic() {
        let model = Quadratic {
            a: array![[2.0, 0.5], [0.5, 1.0]],
            center: array![1.5, -2.0],
        };
        let opt = maximize(&model, array![0.0, 0.0], &NewtonOptions::default()).unwrap();
        assert!((opt.params[0] - 1.5).abs() < 1e-6);
        assert!((opt.params[1] + 2.0).abs() < 1e-6);
        // Covariance is A^-1
        let expected = spd_inverse(&model.a).unwrap();
        for (x, y) in opt.covariance.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_flat_direction_is_singular() {
        let model = Quadratic {
            a: array![[1.0, 0.0], [0.0, 0.0]],
            center: array![0.0, 0.0],
        };
        let err = maximize(&model, array![1.0, 1.0], &NewtonOptions::default()).unwrap_err();
        assert_eq!(err, OptimizeError::Singular);
    }

    #[test]
    fn test_iteration_limit() {
        let model = Quadratic {
            a: array![[1.0]],
            center: array![10.0],
        };
        let options = NewtonOptions {
            max_iterations: 1,
            tolerance: 1e-8,
        };
        let err = maximize(&model, array![0.0], &options).unwrap_err();
        assert_eq!(err, OptimizeError::NotConverged { iterations: 1 });
    }
}
