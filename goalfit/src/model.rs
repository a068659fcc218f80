//! Model definitions, fitted models and the errors raised while fitting them.

use std::error::Error;
use std::fmt::{Debug, Display};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

use crate::design::{Design, Factor, FactorEncoding};
use crate::family::{Family, FamilyKind, Link};
use crate::inference::two_sided_normal;

pub mod nb_fitter;
pub mod poisson_fitter;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("failed to converge after {iterations} iterations: {reason}")]
    ConvergenceFailure { iterations: usize, reason: String },

    #[error("dispersion estimation failed: {0}")]
    DispersionEstimationFailure(String),

    #[error("{0}")]
    InvalidConfig(#[from] ValidationError),
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(#[from] pub Box<dyn Error + Send + Sync>);

impl From<anyhow::Error> for ValidationError {
    fn from(value: anyhow::Error) -> Self {
        ValidationError(value.into())
    }
}

/// The role a column may play in a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ColumnKind {
    Identifier,
    Categorical,
    Count,
}

/// A read-only table that can supply responses and factors to a fitter.
pub trait Frame {
    type Column: Copy + Eq + Debug + Display;

    fn rows(&self) -> usize;

    fn kind(&self, column: Self::Column) -> ColumnKind;

    /// Values of a [ColumnKind::Count] column.
    fn counts(&self, column: Self::Column) -> Result<Vec<f64>, FitError>;

    /// Levels of a [ColumnKind::Categorical] column, one per row.
    fn factor(&self, column: Self::Column) -> Result<Factor, FitError>;
}

/// What to fit: a count response explained by categorical predictors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec<C> {
    pub response: C,
    pub predictors: Vec<C>,
    pub family: FamilyKind,
    pub link: Link,
}
impl<C: Copy + Eq + Debug + Display> ModelSpec<C> {
    pub fn new(response: C, predictors: Vec<C>, family: FamilyKind) -> Self {
        Self {
            response,
            predictors,
            family,
            link: Link::Log,
        }
    }

    pub fn validate<F: Frame<Column = C>>(&self, frame: &F) -> Result<(), FitError> {
        if frame.kind(self.response) != ColumnKind::Count {
            return Err(FitError::SchemaMismatch(format!(
                "response {} is {}, not a count",
                self.response,
                frame.kind(self.response)
            )));
        }
        if self.predictors.is_empty() {
            return Err(FitError::SchemaMismatch(
                "at least one predictor must be specified".into(),
            ));
        }
        for (index, predictor) in self.predictors.iter().enumerate() {
            if frame.kind(*predictor) != ColumnKind::Categorical {
                return Err(FitError::SchemaMismatch(format!(
                    "predictor {predictor} is {}, not categorical",
                    frame.kind(*predictor)
                )));
            }
            if self.predictors[..index].contains(predictor) {
                return Err(FitError::SchemaMismatch(format!(
                    "predictor {predictor} specified more than once"
                )));
            }
        }
        Ok(())
    }

    fn require_family(&self, family: FamilyKind) -> Result<(), FitError> {
        if self.family != family {
            return Err(FitError::SchemaMismatch(format!(
                "model requests {} but fitter is {family}",
                self.family
            )));
        }
        Ok(())
    }

    /// Validates against `frame` and builds the design and response vector.
    pub(crate) fn prepare<F: Frame<Column = C>>(
        &self,
        frame: &F,
    ) -> Result<(Design, Vec<f64>), FitError> {
        self.validate(frame)?;
        let y = frame.counts(self.response)?;
        if y.len() != frame.rows() {
            return Err(FitError::SchemaMismatch(format!(
                "response {} has {} values for {} rows",
                self.response,
                y.len(),
                frame.rows()
            )));
        }
        if let Some(bad) = y.iter().find(|&&y| !(y >= 0.0) || !y.is_finite()) {
            return Err(FitError::SchemaMismatch(format!(
                "response {} contains {bad}, which is not a count",
                self.response
            )));
        }
        let factors = self
            .predictors
            .iter()
            .map(|&predictor| frame.factor(predictor))
            .collect::<Result<Vec<_>, _>>()?;
        let design = Design::build(&factors)?;
        Ok((design, y))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,

    /// Undefined (`NaN`) for coefficients that are not estimable.
    #[serde(with = "crate::file::nullable_f64")]
    pub std_error: f64,
    #[serde(with = "crate::file::nullable_f64")]
    pub z: f64,
    #[serde(with = "crate::file::nullable_f64")]
    pub p_value: f64,
}

/// Wald statistics for each coefficient from the unscaled covariance matrix.
pub(crate) fn coefficients(
    names: &[String],
    estimates: &[f64],
    covariance: &DMatrix<f64>,
) -> Vec<Coefficient> {
    names
        .iter()
        .zip(estimates)
        .enumerate()
        .map(|(index, (name, &estimate))| {
            let variance = covariance[(index, index)];
            let std_error = if variance > 0.0 && variance.is_finite() {
                variance.sqrt()
            } else {
                f64::NAN
            };
            let z = estimate / std_error;
            Coefficient {
                name: name.clone(),
                estimate,
                std_error,
                z,
                p_value: two_sided_normal(z),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub response: String,
    pub predictors: Vec<String>,
    pub family: Family,
    pub link: Link,

    /// Starting with the intercept, followed by each factor's non-reference levels.
    pub coefficients: Vec<Coefficient>,
    pub encodings: Vec<FactorEncoding>,
    pub observed: Vec<f64>,
    pub fitted_values: Vec<f64>,
    pub linear_predictor: Vec<f64>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub iterations: usize,
    pub n_records: usize,

    /// Intercept plus all indicator columns, whether or not they are estimable.
    pub n_parameters: usize,

    /// `n_records − n_parameters`; negative when the design has more columns than rows.
    pub degrees_of_freedom: i64,
    pub rank: usize,
    pub theta_std_error: Option<f64>,
    pub alternations: Option<usize>,
}
impl FittedModel {
    pub(crate) fn assemble<C: Display>(
        spec: &ModelSpec<C>,
        design: &Design,
        observed: Vec<f64>,
        family: Family,
        fit: crate::irls::IrlsOutcome,
    ) -> Self {
        let n_records = observed.len();
        let n_parameters = design.cols();
        let mean = observed.iter().sum::<f64>() / n_records as f64;
        let null_deviance = family.deviance(&observed, &vec![mean; n_records]);
        let deviance = family.deviance(&observed, &fit.fitted_values);
        let log_likelihood = family.log_likelihood(&observed, &fit.fitted_values);
        let aic = -2.0 * log_likelihood + 2.0 * (fit.rank + family.extra_parameters()) as f64;
        Self {
            response: spec.response.to_string(),
            predictors: spec.predictors.iter().map(ToString::to_string).collect(),
            family,
            link: spec.link,
            coefficients: coefficients(design.column_names(), &fit.coefficients, &fit.covariance),
            encodings: design.encodings().to_vec(),
            observed,
            fitted_values: fit.fitted_values,
            linear_predictor: fit.linear_predictor,
            deviance,
            null_deviance,
            log_likelihood,
            aic,
            iterations: fit.iterations,
            n_records,
            n_parameters,
            degrees_of_freedom: n_records as i64 - n_parameters as i64,
            rank: fit.rank,
            theta_std_error: None,
            alternations: None,
        }
    }

    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients
            .iter()
            .find(|coefficient| coefficient.name == name)
    }

    pub fn estimates(&self) -> Vec<f64> {
        self.coefficients
            .iter()
            .map(|coefficient| coefficient.estimate)
            .collect()
    }

    pub fn encoding(&self, factor: &str) -> Option<&FactorEncoding> {
        self.encodings
            .iter()
            .find(|encoding| encoding.factor == factor)
    }

    pub fn theta(&self) -> Option<f64> {
        self.family.theta()
    }
}
