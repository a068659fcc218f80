//! Tail probabilities for Wald and goodness-of-fit tests.

use std::fmt::{Display, Formatter};
use std::ops::Range;

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use strum::IntoEnumIterator;
use strum_macros::{EnumCount, EnumIter};

/// Two-sided p-value of a standard normal `z` statistic. `NaN` if `z` is not finite.
pub fn two_sided_normal(z: f64) -> f64 {
    if !z.is_finite() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => 2.0 * normal.sf(z.abs()),
        Err(_) => f64::NAN,
    }
}

/// `P(X ≥ statistic)` for `X ~ χ²(df)`. `NaN` when `df` is not positive.
pub fn chi_squared_upper_tail(statistic: f64, df: f64) -> f64 {
    if df <= 0.0 || statistic.is_nan() {
        return f64::NAN;
    }
    match ChiSquared::new(df) {
        Ok(chi_squared) => chi_squared.sf(statistic.max(0.0)),
        Err(_) => f64::NAN,
    }
}

#[derive(Debug, Clone, PartialEq, EnumCount, EnumIter)]
pub enum Significance {
    A,
    B,
    C,
    D,
    E,
}
impl Significance {
    pub fn label(&self) -> &'static str {
        match self {
            Significance::A => "***",
            Significance::B => "**",
            Significance::C => "*",
            Significance::D => ".",
            Significance::E => "",
        }
    }

    pub fn range(&self) -> Range<f64> {
        match self {
            Significance::A => 0.0..0.001,
            Significance::B => 0.001..0.01,
            Significance::C => 0.01..0.05,
            Significance::D => 0.05..0.1,
            Significance::E => 0.1..1.0 + f64::EPSILON,
        }
    }

    /// Undefined p-values are not significant.
    pub fn lookup(p_value: f64) -> Self {
        Self::iter()
            .find(|sig| sig.range().contains(&p_value))
            .unwrap_or(Significance::E)
    }
}
impl Display for Significance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
