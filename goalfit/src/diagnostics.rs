//! Overdispersion diagnostics from Pearson residuals.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inference::chi_squared_upper_tail;
use crate::model::{FitError, FittedModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub pearson_residuals: Vec<f64>,

    /// Sample variance of the Pearson residuals.
    pub residual_variance: f64,

    /// Sum of squared Pearson residuals.
    pub chi_squared: f64,
    pub degrees_of_freedom: i64,

    /// `P(χ²(df) ≥ chi_squared)`
    pub p_value: f64,

    /// Whether the residual variance exceeds 1.
    pub overdispersion: bool,

    /// `chi_squared / degrees_of_freedom`, the moment estimate of the dispersion.
    pub dispersion_ratio: f64,
}

/// `(y − μ) / √V(μ)` under the model's family.
pub fn pearson_residuals(model: &FittedModel) -> Vec<f64> {
    model
        .observed
        .iter()
        .zip(&model.fitted_values)
        .map(|(&y, &mu)| (y - mu) / model.family.variance(mu).sqrt())
        .collect()
}

pub fn diagnose(model: &FittedModel) -> Result<DiagnosticsReport, FitError> {
    let n = model.observed.len();
    if n != model.fitted_values.len() {
        return Err(FitError::SchemaMismatch(format!(
            "{n} observations for {} fitted values",
            model.fitted_values.len()
        )));
    }
    if n < 2 {
        return Err(FitError::InsufficientData(format!(
            "{n} records are too few to estimate a residual variance"
        )));
    }
    let degrees_of_freedom = model.degrees_of_freedom;
    if degrees_of_freedom <= 0 {
        return Err(FitError::InsufficientData(format!(
            "{} records for {} parameters leaves {degrees_of_freedom} degrees of freedom",
            model.n_records, model.n_parameters
        )));
    }

    let pearson_residuals = pearson_residuals(model);
    let mean = pearson_residuals.iter().sum::<f64>() / n as f64;
    let residual_variance = pearson_residuals
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let chi_squared = pearson_residuals.iter().map(|r| r * r).sum::<f64>();
    let df = degrees_of_freedom as f64;
    let p_value = chi_squared_upper_tail(chi_squared, df);
    let overdispersion = residual_variance > 1.0;
    debug!(
        "{} under {}: residual variance {residual_variance:.4}, χ² {chi_squared:.2} on {degrees_of_freedom} df",
        model.response, model.family
    );

    Ok(DiagnosticsReport {
        pearson_residuals,
        residual_variance,
        chi_squared,
        degrees_of_freedom,
        p_value,
        overdispersion,
        dispersion_ratio: chi_squared / df,
    })
}
