//! Count regression for scoring data. Fits Poisson and Negative Binomial generalised linear models
//! over categorical predictors by iteratively reweighted least squares, and tests the fitted models
//! for overdispersion.

#![allow(clippy::too_many_arguments)]

pub mod csv;
pub mod design;
pub mod diagnostics;
pub mod family;
pub mod file;
pub mod inference;
pub mod irls;
pub mod linear;
pub mod model;
pub mod opt;
pub mod print;
pub mod sample;
pub mod snapshot;
pub mod special;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
