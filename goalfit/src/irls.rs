//! Iteratively reweighted least squares.
//!
//! Each iteration linearises the model around the current means, forming working weights
//! `w = 1 / (V(μ) g′(μ)²)` and a working response `z = η + (y − μ) g′(μ)`, and solves the resulting
//! weighted least squares problem for the next set of coefficients. Iteration stops once the
//! relative change in deviance `|D − D′| / (|D| + 0.1)` drops below the configured tolerance.

use anyhow::anyhow;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::design::Design;
use crate::family::{Family, Link};
use crate::linear::solve_weighted;
use crate::model::{FitError, ValidationError};

/// Offset added to each observed count to seed the initial means.
const INIT_MU_OFFSET: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrlsConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub min_weight: f64,
}
impl IrlsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_iterations == 0 {
            return Err(anyhow!("at least one iteration must be permitted").into());
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(anyhow!("tolerance ({}) must be positive and finite", self.tolerance).into());
        }
        if !(self.min_weight > 0.0) || !self.min_weight.is_finite() {
            return Err(
                anyhow!("min weight ({}) must be positive and finite", self.min_weight).into(),
            );
        }
        Ok(())
    }
}

impl Default for IrlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            tolerance: 1e-8,
            min_weight: 1e-10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrlsOutcome {
    pub coefficients: Vec<f64>,
    pub fitted_values: Vec<f64>,
    pub linear_predictor: Vec<f64>,
    pub deviance: f64,
    pub iterations: usize,

    /// Unscaled covariance `(X′WX)⁻¹`, evaluated at the final means.
    pub covariance: DMatrix<f64>,
    pub rank: usize,
}

/// Fits `family` under `link` to the counts `y`. If `start` is given, it seeds the initial means in
/// place of `y + 0.1`.
pub fn fit(
    design: &Design,
    y: &[f64],
    family: &Family,
    link: Link,
    config: &IrlsConfig,
    start: Option<&[f64]>,
) -> Result<IrlsOutcome, FitError> {
    if y.len() != design.rows() {
        return Err(FitError::SchemaMismatch(format!(
            "{} responses for {} design rows",
            y.len(),
            design.rows()
        )));
    }

    let mut mu: Vec<f64> = match start {
        Some(start) if start.len() == y.len() => start.to_vec(),
        _ => y.iter().map(|y| y + INIT_MU_OFFSET).collect(),
    };
    let mut eta: Vec<f64> = mu.iter().map(|&mu| link.link(mu)).collect();
    let mut deviance = family.deviance(y, &mu);
    let mut coefficients = vec![0.0; design.cols()];

    for iteration in 1..=config.max_iterations {
        let (z, w) = working(y, &mu, &eta, family, link, config.min_weight);
        let solution = solve_weighted(design, &z, &w).map_err(|err| FitError::ConvergenceFailure {
            iterations: iteration,
            reason: err.to_string(),
        })?;
        coefficients = solution.coefficients;
        eta = design.linear_predictor(&coefficients);
        mu = eta.iter().map(|&eta| link.inverse(eta)).collect();

        let new_deviance = family.deviance(y, &mu);
        if !new_deviance.is_finite() {
            return Err(FitError::ConvergenceFailure {
                iterations: iteration,
                reason: format!("deviance became {new_deviance}"),
            });
        }
        let change = (new_deviance - deviance).abs() / (new_deviance.abs() + 0.1);
        deviance = new_deviance;
        trace!("iteration {iteration}: deviance {deviance:.6}, change {change:.3e}");

        if change < config.tolerance {
            let (z, w) = working(y, &mu, &eta, family, link, config.min_weight);
            let solution =
                solve_weighted(design, &z, &w).map_err(|err| FitError::ConvergenceFailure {
                    iterations: iteration,
                    reason: err.to_string(),
                })?;
            return Ok(IrlsOutcome {
                coefficients,
                fitted_values: mu,
                linear_predictor: eta,
                deviance,
                iterations: iteration,
                covariance: solution.covariance,
                rank: solution.rank,
            });
        }
    }

    Err(FitError::ConvergenceFailure {
        iterations: config.max_iterations,
        reason: format!(
            "deviance {deviance:.6} still changing by more than {:e}",
            config.tolerance
        ),
    })
}

fn working(
    y: &[f64],
    mu: &[f64],
    eta: &[f64],
    family: &Family,
    link: Link,
    min_weight: f64,
) -> (Vec<f64>, Vec<f64>) {
    y.iter()
        .zip(mu)
        .zip(eta)
        .map(|((&y, &mu), &eta)| {
            let derivative = link.derivative(mu);
            let weight = 1.0 / (family.variance(mu) * derivative * derivative);
            (
                eta + (y - mu) * derivative,
                weight.max(min_weight).min(1e10),
            )
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use goalfit_testing::assert_slice_f64_relative;

    use super::*;
    use crate::design::Factor;

    #[test]
    fn config_validation() {
        assert!(IrlsConfig::default().validate().is_ok());
        let config = IrlsConfig {
            max_iterations: 0,
            ..IrlsConfig::default()
        };
        assert_eq!(
            "at least one iteration must be permitted",
            config.validate().unwrap_err().to_string()
        );
        let config = IrlsConfig {
            tolerance: f64::NAN,
            ..IrlsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn one_factor_poisson_recovers_group_means() {
        let design = Design::build(&[Factor::new("team", &[1, 1, 2, 2, 2, 3])]).unwrap();
        let y = [1.0, 3.0, 0.0, 2.0, 4.0, 5.0];
        let outcome = fit(
            &design,
            &y,
            &Family::Poisson,
            Link::Log,
            &IrlsConfig::default(),
            None,
        )
        .unwrap();
        assert_slice_f64_relative(
            &[2.0, 2.0, 2.0, 2.0, 2.0, 5.0],
            &outcome.fitted_values,
            1e-6,
        );
        assert_float_relative_eq!(2f64.ln(), outcome.coefficients[0], 1e-6);
        assert_float_absolute_eq!(0.0, outcome.coefficients[1], 1e-6);
        assert_float_relative_eq!(2.5f64.ln(), outcome.coefficients[2], 1e-6);
        // var(β₀) = 1/(n₁μ₁)
        assert_float_relative_eq!(0.25, outcome.covariance[(0, 0)], 1e-5);
        assert!(outcome.iterations <= 25);
    }

    #[test]
    fn iteration_cap_is_a_convergence_failure() {
        let design = Design::build(&[Factor::new("team", &[1, 1, 2, 2])]).unwrap();
        let config = IrlsConfig {
            max_iterations: 1,
            ..IrlsConfig::default()
        };
        let err = fit(
            &design,
            &[1.0, 4.0, 0.0, 7.0],
            &Family::Poisson,
            Link::Log,
            &config,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FitError::ConvergenceFailure { iterations: 1, .. }
        ));
    }

    #[test]
    fn mismatched_response_length() {
        let design = Design::build(&[Factor::new("team", &[1, 2])]).unwrap();
        let err = fit(
            &design,
            &[1.0],
            &Family::Poisson,
            Link::Log,
            &IrlsConfig::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, FitError::SchemaMismatch(_)));
    }
}
