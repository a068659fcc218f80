//! On-disk snapshots of fitted models.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::design::FactorEncoding;
use crate::diagnostics::DiagnosticsReport;
use crate::family::{Family, Link};
use crate::file::{ReadJsonFile, WriteJsonFile};
use crate::model::{Coefficient, FittedModel};

/// The scalar part of a [DiagnosticsReport].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    pub residual_variance: f64,
    pub chi_squared: f64,
    pub degrees_of_freedom: i64,
    pub p_value: f64,
    pub overdispersion: bool,
    pub dispersion_ratio: f64,
}
impl From<&DiagnosticsReport> for DiagnosticsSummary {
    fn from(report: &DiagnosticsReport) -> Self {
        Self {
            residual_variance: report.residual_variance,
            chi_squared: report.chi_squared,
            degrees_of_freedom: report.degrees_of_freedom,
            p_value: report.p_value,
            overdispersion: report.overdispersion,
            dispersion_ratio: report.dispersion_ratio,
        }
    }
}

/// A [FittedModel] without its per-record vectors, optionally with the diagnostics of the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub created: DateTime<Utc>,
    pub response: String,
    pub predictors: Vec<String>,
    pub family: Family,
    pub link: Link,
    pub coefficients: Vec<Coefficient>,
    pub encodings: Vec<FactorEncoding>,
    pub deviance: f64,
    pub null_deviance: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub iterations: usize,
    pub n_records: usize,
    pub n_parameters: usize,
    pub degrees_of_freedom: i64,
    pub rank: usize,
    pub theta_std_error: Option<f64>,
    pub alternations: Option<usize>,
    pub diagnostics: Option<DiagnosticsSummary>,
}
impl ModelSnapshot {
    pub fn new(model: &FittedModel, diagnostics: Option<&DiagnosticsReport>) -> Self {
        Self {
            created: Utc::now(),
            response: model.response.clone(),
            predictors: model.predictors.clone(),
            family: model.family,
            link: model.link,
            coefficients: model.coefficients.clone(),
            encodings: model.encodings.clone(),
            deviance: model.deviance,
            null_deviance: model.null_deviance,
            log_likelihood: model.log_likelihood,
            aic: model.aic,
            iterations: model.iterations,
            n_records: model.n_records,
            n_parameters: model.n_parameters,
            degrees_of_freedom: model.degrees_of_freedom,
            rank: model.rank,
            theta_std_error: model.theta_std_error.filter(|se| se.is_finite()),
            alternations: model.alternations,
            diagnostics: diagnostics.map(DiagnosticsSummary::from),
        }
    }

    /// `<response>.<family>.json`
    pub fn file_name(&self) -> String {
        format!("{}.{}.json", self.response, self.family.kind().slug())
    }

    /// Writes the snapshot into `dir` under its [file_name](Self::file_name), returning the path.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<PathBuf, io::Error> {
        let path = dir.as_ref().join(self.file_name());
        self.write_json_file(&path)?;
        Ok(path)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        Self::read_json_file(path)
    }
}
