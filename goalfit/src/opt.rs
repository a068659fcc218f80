//! Derivative-free univariate minimisation.

use anyhow::bail;

#[derive(Clone, Debug)]
pub struct UnivariateDescentConfig {
    pub init_value: f64,
    pub init_step: f64,
    pub min_step: f64,
    pub max_steps: u64,
    pub acceptable_residual: f64,
}
impl UnivariateDescentConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.init_value.is_finite() {
            bail!("initial value must be finite")
        }
        if self.init_step == 0.0 || !self.init_step.is_finite() {
            bail!("initial step must be finite and non-zero")
        }
        if self.min_step <= 0.0 {
            bail!("min step must be positive")
        }
        if self.max_steps == 0 {
            bail!("at least one step must be specified")
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnivariateDescentOutcome {
    pub steps: u64,
    pub optimal_value: f64,
    pub optimal_residual: f64,

    /// Whether the search settled (the step shrank below the minimum, or an acceptable residual
    /// was reached) before running out of steps.
    pub converged: bool,
}

/// Univariate, derivative-free search. Walks in the direction of decreasing loss, reversing and
/// halving the step whenever the loss increases.
pub fn univariate_descent(
    config: &UnivariateDescentConfig,
    mut loss_f: impl FnMut(f64) -> f64,
) -> Result<UnivariateDescentOutcome, anyhow::Error> {
    config.validate()?;

    let mut residual = loss_f(config.init_value);
    if residual <= config.acceptable_residual {
        return Ok(UnivariateDescentOutcome {
            steps: 0,
            optimal_value: config.init_value,
            optimal_residual: residual,
            converged: true,
        });
    }

    let mut steps = 0;
    let mut converged = false;
    let (mut value, mut step) = (config.init_value, config.init_step);
    let (mut optimal_value, mut optimal_residual) = (value, residual);
    while steps < config.max_steps {
        steps += 1;
        let new_value = value + step;
        let new_residual = loss_f(new_value);

        // a NaN loss is treated as an increase
        if !(new_residual <= residual) {
            step = -step * 0.5;
            if step.abs() < config.min_step {
                converged = true;
                break;
            }
            continue;
        }
        if new_residual < optimal_residual {
            optimal_residual = new_residual;
            optimal_value = new_value;

            if optimal_residual <= config.acceptable_residual {
                converged = true;
                break;
            }
        }
        residual = new_residual;
        value = new_value;
    }
    Ok(UnivariateDescentOutcome {
        steps,
        optimal_value,
        optimal_residual,
        converged,
    })
}

#[cfg(test)]
mod tests;
