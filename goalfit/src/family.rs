//! Response distributions and link functions.

use std::fmt::Formatter;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::special::{ln_factorial, ln_gamma};

/// Smallest mean admitted into the variance and deviance calculations.
pub const MU_MIN: f64 = 1e-10;

/// The distribution family requested of a fitter, before any dispersion parameter is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum FamilyKind {
    Poisson,
    NegativeBinomial,
}
impl FamilyKind {
    /// A lowercase, file-name-friendly label.
    pub fn slug(&self) -> &'static str {
        match self {
            FamilyKind::Poisson => "poisson",
            FamilyKind::NegativeBinomial => "negative_binomial",
        }
    }
}

/// A fully parametrised family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Family {
    Poisson,

    /// `theta` is the shape of the gamma mixing distribution; `V(μ) = μ + μ²/θ`.
    NegativeBinomial { theta: f64 },
}
impl Family {
    pub fn kind(&self) -> FamilyKind {
        match self {
            Family::Poisson => FamilyKind::Poisson,
            Family::NegativeBinomial { .. } => FamilyKind::NegativeBinomial,
        }
    }

    pub fn theta(&self) -> Option<f64> {
        match self {
            Family::Poisson => None,
            Family::NegativeBinomial { theta } => Some(*theta),
        }
    }

    /// Number of distribution parameters estimated in addition to the regression coefficients.
    pub fn extra_parameters(&self) -> usize {
        match self {
            Family::Poisson => 0,
            Family::NegativeBinomial { .. } => 1,
        }
    }

    /// The variance function `V(μ)`.
    #[inline]
    pub fn variance(&self, mu: f64) -> f64 {
        match self {
            Family::Poisson => mu,
            Family::NegativeBinomial { theta } => mu + mu * mu / theta,
        }
    }

    #[inline]
    pub fn unit_deviance(&self, y: f64, mu: f64) -> f64 {
        let mu = mu.max(MU_MIN);
        match self {
            Family::Poisson => 2.0 * (xlogy(y, y / mu) - (y - mu)),
            Family::NegativeBinomial { theta } => {
                2.0 * (xlogy(y, y / mu) - (y + theta) * ((y + theta) / (mu + theta)).ln())
            }
        }
    }

    pub fn deviance(&self, y: &[f64], mu: &[f64]) -> f64 {
        debug_assert_eq!(y.len(), mu.len());
        y.iter()
            .zip(mu)
            .map(|(&y, &mu)| self.unit_deviance(y, mu))
            .sum()
    }

    pub fn log_likelihood(&self, y: &[f64], mu: &[f64]) -> f64 {
        debug_assert_eq!(y.len(), mu.len());
        match self {
            Family::Poisson => y
                .iter()
                .zip(mu)
                .map(|(&y, &mu)| {
                    let mu = mu.max(MU_MIN);
                    xlogy(y, mu) - mu - ln_factorial(y)
                })
                .sum(),
            Family::NegativeBinomial { theta } => negative_binomial_log_likelihood(y, mu, *theta),
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Poisson => write!(f, "Poisson"),
            Family::NegativeBinomial { theta } => write!(f, "Negative Binomial(θ = {theta:.4})"),
        }
    }
}

/// Log-likelihood of a negative binomial sample, as a function of `theta` for fixed means.
pub fn negative_binomial_log_likelihood(y: &[f64], mu: &[f64], theta: f64) -> f64 {
    let ln_gamma_theta = ln_gamma(theta);
    let theta_ln_theta = theta * theta.ln();
    y.iter()
        .zip(mu)
        .map(|(&y, &mu)| {
            let mu = mu.max(MU_MIN);
            ln_gamma(theta + y) - ln_gamma_theta - ln_factorial(y) + theta_ln_theta
                + xlogy(y, mu)
                - (theta + y) * (theta + mu).ln()
        })
        .sum()
}

/// `x · ln(y)`, taken as zero when `x` is zero.
#[inline]
fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum Link {
    Log,
}
impl Link {
    /// `η = g(μ)`
    #[inline]
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Link::Log => mu.max(MU_MIN).ln(),
        }
    }

    /// `μ = g⁻¹(η)`
    #[inline]
    pub fn inverse(&self, eta: f64) -> f64 {
        match self {
            Link::Log => eta.exp().max(MU_MIN),
        }
    }

    /// `g′(μ)`
    #[inline]
    pub fn derivative(&self, mu: f64) -> f64 {
        match self {
            Link::Log => 1.0 / mu.max(MU_MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn variance_functions() {
        assert_eq!(2.5, Family::Poisson.variance(2.5));
        assert_float_relative_eq!(
            2.0 + 4.0 / 0.5,
            Family::NegativeBinomial { theta: 0.5 }.variance(2.0),
            1e-12
        );
    }

    #[test]
    fn poisson_deviance_zero_at_saturation() {
        let y = [0.0, 1.0, 3.0];
        assert_float_absolute_eq!(0.0, Family::Poisson.deviance(&y, &[MU_MIN, 1.0, 3.0]), 1e-9);
        // 2 · (3 ln(3/2) − 1)
        assert_float_relative_eq!(
            2.0 * (3.0 * 1.5f64.ln() - 1.0),
            Family::Poisson.unit_deviance(3.0, 2.0),
            1e-12
        );
    }

    #[test]
    fn poisson_log_likelihood() {
        // ln P(Y = 2 | μ = 1.5) = 2 ln 1.5 − 1.5 − ln 2
        assert_float_relative_eq!(
            2.0 * 1.5f64.ln() - 1.5 - 2f64.ln(),
            Family::Poisson.log_likelihood(&[2.0], &[1.5]),
            1e-12
        );
    }

    #[test]
    fn negative_binomial_approaches_poisson() {
        let (y, mu) = ([0.0, 1.0, 4.0], [0.7, 1.2, 2.9]);
        let poisson = Family::Poisson.log_likelihood(&y, &mu);
        let nb = Family::NegativeBinomial { theta: 1e7 }.log_likelihood(&y, &mu);
        assert_float_absolute_eq!(poisson, nb, 1e-5);
        let poisson = Family::Poisson.deviance(&y, &mu);
        let nb = Family::NegativeBinomial { theta: 1e7 }.deviance(&y, &mu);
        assert_float_absolute_eq!(poisson, nb, 1e-5);
    }

    #[test]
    fn negative_binomial_geometric_case() {
        // with θ = 1 the distribution is geometric: P(Y = y) = (1 − p)^y p, p = 1/(1 + μ)
        let (y, mu) = (3.0, 2.0);
        let p: f64 = 1.0 / (1.0 + mu);
        assert_float_relative_eq!(
            3.0 * (1.0 - p).ln() + p.ln(),
            negative_binomial_log_likelihood(&[y], &[mu], 1.0),
            1e-10
        );
    }

    #[test]
    fn log_link() {
        let link = Link::Log;
        assert_float_relative_eq!(1.5, link.link(link.inverse(1.5)), 1e-12);
        assert_eq!(0.25, link.derivative(4.0));
    }

    #[test]
    fn display() {
        assert_eq!("Poisson", Family::Poisson.to_string());
        assert_eq!(
            "Negative Binomial(θ = 1.2500)",
            Family::NegativeBinomial { theta: 1.25 }.to_string()
        );
        assert_eq!("negative_binomial", FamilyKind::NegativeBinomial.slug());
    }
}
