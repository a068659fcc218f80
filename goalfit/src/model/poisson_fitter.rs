use std::time::Instant;

use tracing::debug;

use crate::family::{Family, FamilyKind};
use crate::irls;
use crate::irls::IrlsConfig;
use crate::model::{FitError, FittedModel, Frame, ModelSpec, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct PoissonFitter {
    config: IrlsConfig,
}
impl PoissonFitter {
    pub fn fit<F: Frame>(
        &self,
        spec: &ModelSpec<F::Column>,
        frame: &F,
    ) -> Result<FittedModel, FitError> {
        spec.require_family(FamilyKind::Poisson)?;
        let (design, y) = spec.prepare(frame)?;
        let start_time = Instant::now();
        let outcome = irls::fit(&design, &y, &Family::Poisson, spec.link, &self.config, None)?;
        debug!(
            "fitted Poisson model for {} over {} records and {} parameters in {} iterations, took {:?}",
            spec.response,
            design.rows(),
            design.cols(),
            outcome.iterations,
            start_time.elapsed()
        );
        Ok(FittedModel::assemble(
            spec,
            &design,
            y,
            Family::Poisson,
            outcome,
        ))
    }
}

impl TryFrom<IrlsConfig> for PoissonFitter {
    type Error = ValidationError;

    fn try_from(config: IrlsConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(Self { config })
    }
}
