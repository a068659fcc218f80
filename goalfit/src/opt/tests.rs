use super::*;
use assert_float_eq::*;

#[test]
fn univariate_descent_sqrt() {
    let config = UnivariateDescentConfig {
        init_value: 0.0,
        init_step: 0.1,
        min_step: 0.00001,
        max_steps: 1_000,
        acceptable_residual: 0.0,
    };
    let outcome = univariate_descent(&config, |value| (81.0 - value.powi(2)).powi(2)).unwrap();
    assert!(outcome.converged);
    assert_float_absolute_eq!(9.0, outcome.optimal_value, 1e-4);
}

#[test]
fn univariate_descent_parabola_from_above() {
    let config = UnivariateDescentConfig {
        init_value: 10.0,
        init_step: 1.0,
        min_step: 1e-9,
        max_steps: 10_000,
        acceptable_residual: f64::NEG_INFINITY,
    };
    let outcome = univariate_descent(&config, |value| (value - 2.5).powi(2) + 1.0).unwrap();
    assert!(outcome.converged);
    assert_float_absolute_eq!(2.5, outcome.optimal_value, 1e-6);
    assert_float_absolute_eq!(1.0, outcome.optimal_residual, 1e-9);
}

#[test]
fn univariate_descent_unbounded() {
    let config = UnivariateDescentConfig {
        init_value: 0.0,
        init_step: 0.5,
        min_step: 1e-6,
        max_steps: 100,
        acceptable_residual: f64::NEG_INFINITY,
    };
    let outcome = univariate_descent(&config, |value| -value).unwrap();
    assert!(!outcome.converged);
    assert_eq!(100, outcome.steps);
    assert_float_absolute_eq!(50.0, outcome.optimal_value);
}

#[test]
fn univariate_descent_invalid_config() {
    let config = UnivariateDescentConfig {
        init_value: 0.0,
        init_step: 0.0,
        min_step: 1e-6,
        max_steps: 100,
        acceptable_residual: 0.0,
    };
    let err = univariate_descent(&config, |value| value).unwrap_err();
    assert_eq!("initial step must be finite and non-zero", err.to_string());
}
