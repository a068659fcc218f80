//! Random variates for simulating count data.

use tinyrand::Rand;

/// Largest Poisson rate sampled in a single pass; larger rates are split into chunks.
const POISSON_CHUNK: f64 = 30.0;

/// A uniform sample from the open interval (0, 1).
#[inline]
pub fn uniform(rand: &mut impl Rand) -> f64 {
    ((rand.next_u64() >> 11) as f64 + 0.5) / (1u64 << 53) as f64
}

/// A uniform index in `0..n`.
#[inline]
pub fn index(n: usize, rand: &mut impl Rand) -> usize {
    debug_assert!(n > 0);
    ((uniform(rand) * n as f64) as usize).min(n - 1)
}

/// Box–Muller transform.
pub fn standard_normal(rand: &mut impl Rand) -> f64 {
    let (u_1, u_2) = (uniform(rand), uniform(rand));
    (-2.0 * u_1.ln()).sqrt() * (std::f64::consts::TAU * u_2).cos()
}

/// Marsaglia–Tsang gamma sampler, boosted for `shape < 1`.
pub fn gamma(shape: f64, scale: f64, rand: &mut impl Rand) -> f64 {
    debug_assert!(shape > 0.0 && scale > 0.0, "shape {shape}, scale {scale}");
    if shape < 1.0 {
        let boost = uniform(rand).powf(1.0 / shape);
        return gamma(shape + 1.0, scale, rand) * boost;
    }
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = standard_normal(rand);
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u = uniform(rand);
        if u.ln() < 0.5 * x * x + d - d * v + d * v.ln() {
            return d * v * scale;
        }
    }
}

/// Knuth's multiplication method.
pub fn poisson(lambda: f64, rand: &mut impl Rand) -> u32 {
    debug_assert!(lambda >= 0.0, "lambda {lambda}");
    let mut remaining = lambda;
    let mut count = 0;
    while remaining > 0.0 {
        let chunk = remaining.min(POISSON_CHUNK);
        remaining -= chunk;
        let limit = (-chunk).exp();
        let mut product = uniform(rand);
        while product > limit {
            count += 1;
            product *= uniform(rand);
        }
    }
    count
}

/// A gamma–Poisson mixture with the given `mean` and dispersion `theta`, having variance
/// `mean + mean²/theta`.
pub fn negative_binomial(mean: f64, theta: f64, rand: &mut impl Rand) -> u32 {
    let lambda = gamma(theta, mean / theta, rand);
    poisson(lambda, rand)
}

#[cfg(test)]
mod tests {
    use goalfit_testing::assert_within;
    use tinyrand::{Seeded, StdRand};

    use super::*;

    fn moments(samples: &[f64]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, variance)
    }

    #[test]
    fn uniform_bounds() {
        let mut rand = StdRand::seed(7);
        for _ in 0..10_000 {
            let u = uniform(&mut rand);
            assert!(u > 0.0 && u < 1.0);
        }
        for _ in 0..10_000 {
            assert!(index(3, &mut rand) < 3);
        }
    }

    #[test]
    fn normal_moments() {
        let mut rand = StdRand::seed(11);
        let samples: Vec<_> = (0..20_000).map(|_| standard_normal(&mut rand)).collect();
        let (mean, variance) = moments(&samples);
        assert_within("mean", 0.0, mean, 0.03);
        assert_within("variance", 1.0, variance, 0.05);
    }

    #[test]
    fn gamma_moments() {
        let mut rand = StdRand::seed(13);
        let samples: Vec<_> = (0..20_000).map(|_| gamma(2.5, 0.8, &mut rand)).collect();
        let (mean, variance) = moments(&samples);
        assert_within("mean", 2.0, mean, 0.05);
        assert_within("variance", 1.6, variance, 0.12);

        let samples: Vec<_> = (0..20_000).map(|_| gamma(0.5, 2.0, &mut rand)).collect();
        let (mean, _) = moments(&samples);
        assert_within("mean", 1.0, mean, 0.05);
    }

    #[test]
    fn poisson_moments() {
        let mut rand = StdRand::seed(17);
        let samples: Vec<_> = (0..20_000)
            .map(|_| poisson(2.0, &mut rand) as f64)
            .collect();
        let (mean, variance) = moments(&samples);
        assert_within("mean", 2.0, mean, 0.05);
        assert_within("variance", 2.0, variance, 0.1);

        let samples: Vec<_> = (0..5_000)
            .map(|_| poisson(45.0, &mut rand) as f64)
            .collect();
        let (mean, _) = moments(&samples);
        assert_within("mean", 45.0, mean, 0.5);
    }

    #[test]
    fn negative_binomial_moments() {
        let mut rand = StdRand::seed(19);
        let samples: Vec<_> = (0..50_000)
            .map(|_| negative_binomial(2.0, 1.5, &mut rand) as f64)
            .collect();
        let (mean, variance) = moments(&samples);
        assert_within("mean", 2.0, mean, 0.05);
        assert_within("variance", 2.0 + 4.0 / 1.5, variance, 0.35);
    }
}
