//! Negative Binomial fitting by alternating IRLS over the coefficients with profile maximum
//! likelihood over θ.

use std::time::Instant;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::design::Design;
use crate::family::{negative_binomial_log_likelihood, Family, FamilyKind, MU_MIN};
use crate::irls;
use crate::irls::IrlsConfig;
use crate::model::{FitError, FittedModel, Frame, ModelSpec, ValidationError};
use crate::opt::{univariate_descent, UnivariateDescentConfig};
use crate::special::trigamma;

/// Smallest θ considered by the profile search.
const MIN_THETA: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThetaConfig {
    /// Initial step of the search, in `ln θ`.
    pub init_step: f64,

    /// The search stops once its step (in `ln θ`) shrinks below this.
    pub min_step: f64,
    pub max_steps: u64,

    /// Estimates above this are indistinguishable from a Poisson fit and are rejected.
    pub max_theta: f64,
}
impl ThetaConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.init_step > 0.0) || !self.init_step.is_finite() {
            return Err(anyhow!("initial step ({}) must be positive and finite", self.init_step).into());
        }
        if !(self.min_step > 0.0) || self.min_step >= self.init_step {
            return Err(anyhow!(
                "min step ({}) must be positive and below the initial step",
                self.min_step
            )
            .into());
        }
        if self.max_steps == 0 {
            return Err(anyhow!("at least one step must be permitted").into());
        }
        if !(self.max_theta > 1.0) || !self.max_theta.is_finite() {
            return Err(anyhow!("max theta ({}) must be finite and above 1", self.max_theta).into());
        }
        Ok(())
    }
}

impl Default for ThetaConfig {
    fn default() -> Self {
        Self {
            init_step: 0.5,
            min_step: 1e-8,
            max_steps: 1_000,
            max_theta: 1e6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativeBinomialConfig {
    pub irls: IrlsConfig,
    pub theta: ThetaConfig,
    pub max_alternations: usize,
    pub tolerance: f64,
}
impl NegativeBinomialConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.irls.validate()?;
        self.theta.validate()?;
        if self.max_alternations == 0 {
            return Err(anyhow!("at least one alternation must be permitted").into());
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(anyhow!("tolerance ({}) must be positive and finite", self.tolerance).into());
        }
        Ok(())
    }
}

impl Default for NegativeBinomialConfig {
    fn default() -> Self {
        Self {
            irls: IrlsConfig::default(),
            theta: ThetaConfig::default(),
            max_alternations: 25,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NegativeBinomialFitter {
    config: NegativeBinomialConfig,
}
impl NegativeBinomialFitter {
    /// Fits from scratch, seeding θ from an internal Poisson fit.
    pub fn fit<F: Frame>(
        &self,
        spec: &ModelSpec<F::Column>,
        frame: &F,
    ) -> Result<FittedModel, FitError> {
        spec.require_family(FamilyKind::NegativeBinomial)?;
        let (design, y) = spec.prepare(frame)?;
        let poisson = irls::fit(
            &design,
            &y,
            &Family::Poisson,
            spec.link,
            &self.config.irls,
            None,
        )?;
        self.alternate(spec, &design, y, poisson.fitted_values)
    }

    /// Fits starting from the means of an earlier fit of the same response over the same frame,
    /// typically a Poisson fit that was found to be overdispersed.
    pub fn refit<F: Frame>(
        &self,
        spec: &ModelSpec<F::Column>,
        frame: &F,
        start: &FittedModel,
    ) -> Result<FittedModel, FitError> {
        spec.require_family(FamilyKind::NegativeBinomial)?;
        let (design, y) = spec.prepare(frame)?;
        if start.fitted_values.len() != y.len() {
            return Err(FitError::SchemaMismatch(format!(
                "starting fit has {} fitted values for {} records",
                start.fitted_values.len(),
                y.len()
            )));
        }
        self.alternate(spec, &design, y, start.fitted_values.clone())
    }

    fn alternate<C: std::fmt::Display>(
        &self,
        spec: &ModelSpec<C>,
        design: &Design,
        y: Vec<f64>,
        mut mu: Vec<f64>,
    ) -> Result<FittedModel, FitError> {
        let start_time = Instant::now();
        let df = (design.rows() as f64 - design.cols() as f64).max(1.0);
        let mut theta = estimate_theta(&y, &mu, &self.config.theta)?;
        let mut log_likelihood = negative_binomial_log_likelihood(&y, &mu, theta);
        debug!("initial θ for {}: {theta:.6}", spec.response);

        for alternation in 1..=self.config.max_alternations {
            let family = Family::NegativeBinomial { theta };
            let outcome = irls::fit(
                design,
                &y,
                &family,
                spec.link,
                &self.config.irls,
                Some(&mu),
            )?;
            mu = outcome.fitted_values.clone();

            let new_theta = estimate_theta(&y, &mu, &self.config.theta)?;
            let new_log_likelihood = negative_binomial_log_likelihood(&y, &mu, new_theta);
            let change = (new_log_likelihood - log_likelihood).abs() / (2.0 * df).sqrt()
                + (new_theta - theta).abs() / theta;
            trace!(
                "alternation {alternation}: θ {new_theta:.6}, log-likelihood {new_log_likelihood:.6}, change {change:.3e}"
            );
            theta = new_theta;
            log_likelihood = new_log_likelihood;

            if change < self.config.tolerance {
                let family = Family::NegativeBinomial { theta };
                let mut model = FittedModel::assemble(spec, design, y, family, outcome);
                model.theta_std_error = Some(theta_std_error(&model.observed, &model.fitted_values, theta));
                model.alternations = Some(alternation);
                debug!(
                    "fitted Negative Binomial model for {} with θ {theta:.6} in {alternation} alternations, took {:?}",
                    spec.response,
                    start_time.elapsed()
                );
                return Ok(model);
            }
        }

        Err(FitError::ConvergenceFailure {
            iterations: self.config.max_alternations,
            reason: format!("θ alternation did not settle (last θ {theta:.6})"),
        })
    }
}

impl TryFrom<NegativeBinomialConfig> for NegativeBinomialFitter {
    type Error = ValidationError;

    fn try_from(config: NegativeBinomialConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}

/// Maximum likelihood estimate of θ for fixed means `mu`, searched over `ln θ` from the
/// method-of-moments starting point `n / Σ(y/μ − 1)²`.
pub fn estimate_theta(y: &[f64], mu: &[f64], config: &ThetaConfig) -> Result<f64, FitError> {
    let (lower, upper) = (MIN_THETA.ln(), config.max_theta.ln() + 1.0);
    let moments = y
        .iter()
        .zip(mu)
        .map(|(&y, &mu)| (y / mu.max(MU_MIN) - 1.0).powi(2))
        .sum::<f64>();
    let moment_estimate = y.len() as f64 / moments;
    let init_value = if moment_estimate.is_finite() && moment_estimate > 0.0 {
        moment_estimate.ln().clamp(lower, upper)
    } else {
        upper
    };

    let descent_config = UnivariateDescentConfig {
        init_value,
        init_step: config.init_step,
        min_step: config.min_step,
        max_steps: config.max_steps,
        acceptable_residual: f64::NEG_INFINITY,
    };
    let outcome = univariate_descent(&descent_config, |ln_theta| {
        if ln_theta < lower || ln_theta > upper {
            f64::NAN
        } else {
            -negative_binomial_log_likelihood(y, mu, ln_theta.exp())
        }
    })
    .map_err(|err| FitError::DispersionEstimationFailure(err.to_string()))?;

    let theta = outcome.optimal_value.exp();
    if !outcome.converged {
        return Err(FitError::DispersionEstimationFailure(format!(
            "θ search did not settle after {} steps (last θ {theta})",
            outcome.steps
        )));
    }
    if !theta.is_finite() || theta <= 0.0 {
        return Err(FitError::DispersionEstimationFailure(format!(
            "θ estimate {theta} is not a positive number"
        )));
    }
    if theta > config.max_theta {
        return Err(FitError::DispersionEstimationFailure(format!(
            "θ estimate {theta:.3e} exceeds {:.3e}; the data show no overdispersion",
            config.max_theta
        )));
    }
    Ok(theta)
}

/// Standard error of θ from the observed information of the profile likelihood.
pub fn theta_std_error(y: &[f64], mu: &[f64], theta: f64) -> f64 {
    let information = y
        .iter()
        .zip(mu)
        .map(|(&y, &mu)| {
            -trigamma(theta + y) + trigamma(theta) - 1.0 / theta + 2.0 / (mu + theta)
                - (y + theta) / (mu + theta).powi(2)
        })
        .sum::<f64>();
    if information > 0.0 && information.is_finite() {
        (1.0 / information).sqrt()
    } else {
        f64::NAN
    }
}
