//! Weighted least squares over a sparse indicator design.

use anyhow::{anyhow, bail};
use nalgebra::{DMatrix, DVector};

use crate::design::Design;

/// Singular values below this fraction of the largest are treated as zero.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Cholesky factors whose squared diagonal ratio falls below this are considered ill-conditioned.
const CONDITION_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct WeightedSolution {
    pub coefficients: Vec<f64>,

    /// `(X′WX)⁻¹`, or its pseudo-inverse when the design is rank-deficient.
    pub covariance: DMatrix<f64>,

    pub rank: usize,
}

/// Minimises `Σ wᵢ (zᵢ − xᵢ′β)²`. Solves the normal equations by Cholesky decomposition when the
/// design has full column rank; otherwise takes the minimum-norm solution from a singular value
/// decomposition of `W^½ X`.
pub fn solve_weighted(
    design: &Design,
    z: &[f64],
    w: &[f64],
) -> Result<WeightedSolution, anyhow::Error> {
    if z.len() != design.rows() || w.len() != design.rows() {
        bail!(
            "expected {} working responses and weights, got {} and {}",
            design.rows(),
            z.len(),
            w.len()
        );
    }
    if design.rows() >= design.cols() {
        if let Some(solution) = solve_normal(design, z, w) {
            return Ok(solution);
        }
    }
    solve_svd(design, z, w)
}

fn solve_normal(design: &Design, z: &[f64], w: &[f64]) -> Option<WeightedSolution> {
    let cols = design.cols();
    let mut xtwx = DMatrix::<f64>::zeros(cols, cols);
    let mut xtwz = DVector::<f64>::zeros(cols);
    let mut active = Vec::with_capacity(4);
    for row in 0..design.rows() {
        active.clear();
        active.push(0);
        active.extend(design.active(row));
        let (weight, weighted_z) = (w[row], w[row] * z[row]);
        for &i in &active {
            xtwz[i] += weighted_z;
            for &j in &active {
                xtwx[(i, j)] += weight;
            }
        }
    }

    let chol = xtwx.cholesky()?;
    let (min_diag, max_diag) = chol
        .l_dirty()
        .diagonal()
        .iter()
        .fold((f64::INFINITY, 0.0f64), |(min, max), &d| (min.min(d), max.max(d)));
    if !(min_diag * min_diag > CONDITION_FLOOR * max_diag * max_diag) {
        return None;
    }

    let coefficients = chol.solve(&xtwz);
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }
    Some(WeightedSolution {
        coefficients: coefficients.iter().copied().collect(),
        covariance: chol.inverse(),
        rank: cols,
    })
}

fn solve_svd(design: &Design, z: &[f64], w: &[f64]) -> Result<WeightedSolution, anyhow::Error> {
    let sqrt_w: Vec<f64> = w.iter().map(|w| w.sqrt()).collect();
    let weighted_design = design.to_dense_scaled(&sqrt_w);
    let weighted_z = DVector::from_iterator(
        z.len(),
        z.iter().zip(&sqrt_w).map(|(z, sqrt_w)| z * sqrt_w),
    );

    let svd = weighted_design.svd(true, true);
    let max_singular = svd
        .singular_values
        .iter()
        .fold(0.0f64, |max, &s| max.max(s));
    if !(max_singular > 0.0) || !max_singular.is_finite() {
        bail!("weighted design has no usable singular values");
    }
    let eps = max_singular * SINGULAR_TOLERANCE;
    let coefficients = svd.solve(&weighted_z, eps).map_err(|err| anyhow!(err))?;

    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| anyhow!("right singular vectors were not computed"))?;
    let inv_sq = DVector::from_iterator(
        svd.singular_values.len(),
        svd.singular_values
            .iter()
            .map(|&s| if s > eps { 1.0 / (s * s) } else { 0.0 }),
    );
    let rank = inv_sq.iter().filter(|&&s| s > 0.0).count();
    let covariance = v_t.transpose() * DMatrix::from_diagonal(&inv_sq) * v_t;

    Ok(WeightedSolution {
        coefficients: coefficients.iter().copied().collect(),
        covariance,
        rank,
    })
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use goalfit_testing::assert_slice_f64_relative;

    use super::*;
    use crate::design::Factor;

    #[test]
    fn full_rank_matches_group_means() {
        // a single factor: fitted values are the weighted group means
        let design = Design::build(&[Factor::new("team", &[1, 1, 2, 2, 3])]).unwrap();
        let z = [1.0, 3.0, 5.0, 7.0, 4.0];
        let w = [1.0, 1.0, 1.0, 3.0, 2.0];
        let solution = solve_weighted(&design, &z, &w).unwrap();
        assert_eq!(3, solution.rank);
        // intercept = mean of team 1; offsets relative to it
        assert_slice_f64_relative(&[2.0, 6.5 - 2.0, 4.0 - 2.0], &solution.coefficients, 1e-9);
        // var(intercept) = 1/Σw in group 1
        assert_float_relative_eq!(0.5, solution.covariance[(0, 0)], 1e-9);
    }

    #[test]
    fn rank_deficient_takes_minimum_norm() {
        let design = Design::build(&[
            Factor::new("home", &[1, 2, 1, 3]),
            Factor::new("away", &[2, 1, 3, 1]),
        ])
        .unwrap();
        let z = [0.5, 1.0, 1.5, 0.2];
        let w = [1.0; 4];
        let solution = solve_weighted(&design, &z, &w).unwrap();
        assert_eq!(4, solution.rank);
        assert_eq!(5, solution.coefficients.len());
        // with more parameters than rows, the fit interpolates
        let fitted = design.linear_predictor(&solution.coefficients);
        for (expected, actual) in z.iter().zip(&fitted) {
            assert_float_absolute_eq!(*expected, *actual, 1e-9);
        }
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let design = Design::build(&[Factor::new("team", &[1, 2])]).unwrap();
        assert!(solve_weighted(&design, &[1.0], &[1.0, 1.0]).is_err());
    }
}
