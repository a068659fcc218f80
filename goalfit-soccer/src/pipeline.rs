//! Per-response analysis: fit a Poisson model, diagnose it, and refit with a Negative Binomial
//! family if the Poisson fit is overdispersed.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::{debug, info};

use goalfit::diagnostics::{diagnose, DiagnosticsReport};
use goalfit::family::FamilyKind;
use goalfit::irls::IrlsConfig;
use goalfit::model::nb_fitter::{NegativeBinomialConfig, NegativeBinomialFitter};
use goalfit::model::poisson_fitter::PoissonFitter;
use goalfit::model::{FitError, FittedModel, ModelSpec, ValidationError};
use goalfit::snapshot::ModelSnapshot;

use crate::dataset::{Column, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Response {
    HomeGoals,
    AwayGoals,
}
impl Response {
    pub fn column(&self) -> Column {
        match self {
            Response::HomeGoals => Column::HomeGoals,
            Response::AwayGoals => Column::AwayGoals,
        }
    }

    /// Goals explained by the identities of both sides.
    pub fn spec(&self, family: FamilyKind) -> ModelSpec<Column> {
        ModelSpec::new(
            self.column(),
            vec![Column::HomeTeamId, Column::AwayTeamId],
            family,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum Stage {
    Raw,
    Cleaned,
    PoissonFit,
    Diagnosed,
    NegativeBinomialFit,
    Accepted,
}
impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::NegativeBinomialFit | Stage::Accepted)
    }
}

/// A fitted model together with its diagnostics.
#[derive(Debug, Clone)]
pub struct Fit {
    pub model: FittedModel,
    pub diagnostics: DiagnosticsReport,
}
impl Fit {
    fn diagnosed(model: FittedModel) -> Result<Self, FitError> {
        let diagnostics = diagnose(&model)?;
        Ok(Self { model, diagnostics })
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::new(&self.model, Some(&self.diagnostics))
    }
}

/// The terminal state of one response's analysis.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub response: Response,
    pub poisson: Fit,
    pub negative_binomial: Option<Fit>,
}
impl Outcome {
    pub fn stage(&self) -> Stage {
        match self.negative_binomial {
            None => Stage::Accepted,
            Some(_) => Stage::NegativeBinomialFit,
        }
    }

    /// The fit that the analysis settled on.
    pub fn selected(&self) -> &Fit {
        self.negative_binomial.as_ref().unwrap_or(&self.poisson)
    }

    pub fn fits(&self) -> impl Iterator<Item = &Fit> {
        std::iter::once(&self.poisson).chain(self.negative_binomial.iter())
    }
}

/// A failure that ended the analysis of `response` while entering `stage`.
#[derive(Debug, Error)]
#[error("{response} failed at {stage}: {source}")]
pub struct AnalysisError {
    pub response: Response,
    pub stage: Stage,
    #[source]
    pub source: FitError,
}

/// Raised when one or more responses of an [Analysis] failed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{failed} of {total} responses could not be analysed")]
pub struct IncompleteAnalysis {
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug)]
pub struct Analysis {
    pub home_goals: Result<Outcome, AnalysisError>,
    pub away_goals: Result<Outcome, AnalysisError>,
}
impl Analysis {
    pub fn results(&self) -> [&Result<Outcome, AnalysisError>; 2] {
        [&self.home_goals, &self.away_goals]
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.results().into_iter().filter_map(|result| result.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &AnalysisError> {
        self.results().into_iter().filter_map(|result| result.as_ref().err())
    }

    pub fn is_complete(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn ensure_complete(&self) -> Result<(), IncompleteAnalysis> {
        match self.errors().count() {
            0 => Ok(()),
            failed => Err(IncompleteAnalysis {
                failed,
                total: self.results().len(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub poisson: IrlsConfig,
    pub negative_binomial: NegativeBinomialConfig,
    /// Whether the two responses are analysed concurrently.
    pub parallel: bool,
}
impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.poisson.validate()?;
        self.negative_binomial.validate()?;
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            poisson: IrlsConfig::default(),
            negative_binomial: NegativeBinomialConfig::default(),
            parallel: true,
        }
    }
}

/// Intermediate states of one response's analysis. Each transition consumes the previous state.
enum State<'a> {
    Raw(&'a Dataset),
    Cleaned(&'a Dataset),
    PoissonFit(&'a Dataset, FittedModel),
    Diagnosed(&'a Dataset, Fit),
    Done(Outcome),
}
impl State<'_> {
    fn stage(&self) -> Stage {
        match self {
            State::Raw(_) => Stage::Raw,
            State::Cleaned(_) => Stage::Cleaned,
            State::PoissonFit(..) => Stage::PoissonFit,
            State::Diagnosed(..) => Stage::Diagnosed,
            State::Done(outcome) => outcome.stage(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analyser {
    poisson: PoissonFitter,
    negative_binomial: NegativeBinomialFitter,
    parallel: bool,
}
impl Analyser {
    pub fn analyse(&self, dataset: &Dataset) -> Analysis {
        let start_time = Instant::now();
        let (home_goals, away_goals) = if self.parallel {
            rayon::join(
                || self.analyse_response(dataset, Response::HomeGoals),
                || self.analyse_response(dataset, Response::AwayGoals),
            )
        } else {
            (
                self.analyse_response(dataset, Response::HomeGoals),
                self.analyse_response(dataset, Response::AwayGoals),
            )
        };
        info!(
            "analysed {} matches (parallel: {}), took {:?}",
            dataset.len(),
            self.parallel,
            start_time.elapsed()
        );
        Analysis {
            home_goals,
            away_goals,
        }
    }

    pub fn analyse_response(
        &self,
        dataset: &Dataset,
        response: Response,
    ) -> Result<Outcome, AnalysisError> {
        let mut state = State::Raw(dataset);
        loop {
            let from = state.stage();
            state = match self.advance(response, state) {
                Ok(State::Done(outcome)) => {
                    debug!("{response}: {from} → {}", outcome.stage());
                    return Ok(outcome);
                }
                Ok(next) => {
                    debug!("{response}: {from} → {}", next.stage());
                    next
                }
                Err((stage, source)) => {
                    return Err(AnalysisError {
                        response,
                        stage,
                        source,
                    })
                }
            };
        }
    }

    fn advance<'a>(
        &self,
        response: Response,
        state: State<'a>,
    ) -> Result<State<'a>, (Stage, FitError)> {
        match state {
            State::Raw(dataset) => {
                let fail = |err| (Stage::Cleaned, err);
                if dataset.is_empty() {
                    return Err(fail(FitError::InsufficientData("no matches".into())));
                }
                for family in [FamilyKind::Poisson, FamilyKind::NegativeBinomial] {
                    response.spec(family).validate(dataset).map_err(fail)?;
                }
                Ok(State::Cleaned(dataset))
            }
            State::Cleaned(dataset) => {
                let model = self
                    .poisson
                    .fit(&response.spec(FamilyKind::Poisson), dataset)
                    .map_err(|err| (Stage::PoissonFit, err))?;
                Ok(State::PoissonFit(dataset, model))
            }
            State::PoissonFit(dataset, model) => {
                let fit = Fit::diagnosed(model).map_err(|err| (Stage::Diagnosed, err))?;
                info!(
                    "{response}: Poisson residual variance {:.4}, overdispersion: {}",
                    fit.diagnostics.residual_variance, fit.diagnostics.overdispersion
                );
                Ok(State::Diagnosed(dataset, fit))
            }
            State::Diagnosed(dataset, poisson) if poisson.diagnostics.overdispersion => {
                let fail = |err| (Stage::NegativeBinomialFit, err);
                let model = self
                    .negative_binomial
                    .refit(
                        &response.spec(FamilyKind::NegativeBinomial),
                        dataset,
                        &poisson.model,
                    )
                    .map_err(fail)?;
                let negative_binomial = Fit::diagnosed(model).map_err(fail)?;
                Ok(State::Done(Outcome {
                    response,
                    poisson,
                    negative_binomial: Some(negative_binomial),
                }))
            }
            State::Diagnosed(_, poisson) => Ok(State::Done(Outcome {
                response,
                poisson,
                negative_binomial: None,
            })),
            State::Done(outcome) => Ok(State::Done(outcome)),
        }
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self {
            poisson: PoissonFitter::default(),
            negative_binomial: NegativeBinomialFitter::default(),
            parallel: true,
        }
    }
}

impl TryFrom<AnalysisConfig> for Analyser {
    type Error = ValidationError;

    fn try_from(config: AnalysisConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self {
            poisson: PoissonFitter::try_from(config.poisson)?,
            negative_binomial: NegativeBinomialFitter::try_from(config.negative_binomial)?,
            parallel: config.parallel,
        })
    }
}
