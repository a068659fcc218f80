//! Special functions not covered by [statrs].

pub use statrs::function::gamma::ln_gamma;

/// Natural logarithm of `k!`.
#[inline]
pub fn ln_factorial(k: f64) -> f64 {
    ln_gamma(k + 1.0)
}

/// The trigamma function ψ₁(x), the second derivative of `ln Γ(x)`, for `x > 0`.
///
/// Shifts `x` upward by the recurrence ψ₁(x) = ψ₁(x + 1) + 1/x², then applies the asymptotic
/// expansion through the x⁻¹³ term, whose truncation error is below 1e-15 once `x ≥ 10`.
pub fn trigamma(x: f64) -> f64 {
    if x <= 0.0 || !x.is_finite() {
        return f64::NAN;
    }
    let mut x = x;
    let mut acc = 0.0;
    while x < 10.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    // 1/x + 1/2x² + 1/6x³ − 1/30x⁵ + 1/42x⁷ − 1/30x⁹ + 5/66x¹¹ − 691/2730x¹³
    let series = inv2
        * (1.0 / 6.0
            + inv2
                * (-1.0 / 30.0
                    + inv2
                        * (1.0 / 42.0
                            + inv2
                                * (-1.0 / 30.0
                                    + inv2 * (5.0 / 66.0 - inv2 * 691.0 / 2730.0)))));
    acc + inv + 0.5 * inv2 + inv * series
}
