// Hurdle count regression for the amount given
//
// Two independent parts share one predictor set:
// - zero hurdle: binomial logit for P(give > 0) over all complete rows
// - count part: zero-truncated Poisson or negative binomial (log link) over
//   the positive rows
//
// Both are maximized by damped Newton-Raphson with analytic gradients and a
// numerical Hessian; standard errors come from the inverse observed
// information, with Wald z tests and two-sided normal p-values.

mod design;
mod fit;
mod likelihood;
mod optimizer;

pub use design::{build_design, covariates, Design, INTERCEPT};
pub use fit::{fit_all, fit_hurdle, Coefficient, HurdleFit, PartFit, LOG_THETA};
pub use likelihood::{LogLikelihood, Logit, TruncatedNegBin, TruncatedPoisson};
pub use optimizer::{maximize, NewtonOptions, OptimizeError, Optimum};
