//! Treatment coding of categorical predictors into a sparse design matrix.
//!
//! Every factor contributes one indicator column per level, except for its reference level, which
//! is the smallest level under the natural ordering of the factor's values. The reference level and
//! the generated column names are reported in a [FactorEncoding] so that callers can see exactly
//! which level was absorbed into the intercept.

use std::collections::BTreeSet;
use std::hash::Hash;

use nalgebra::DMatrix;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::model::FitError;

pub const INTERCEPT: &str = "(Intercept)";

const REFERENCE: usize = usize::MAX;

/// A categorical predictor: its sorted distinct levels and, for each record, the index of that
/// record's level.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    name: String,
    levels: Vec<String>,
    codes: Vec<usize>,
}
impl Factor {
    pub fn new<L>(name: impl Into<String>, values: &[L]) -> Self
    where
        L: Ord + Hash + ToString,
    {
        let sorted: BTreeSet<&L> = values.iter().collect();
        let mut index = FxHashMap::with_capacity_and_hasher(sorted.len(), Default::default());
        let mut levels = Vec::with_capacity(sorted.len());
        for (ordinal, &level) in sorted.iter().enumerate() {
            index.insert(level, ordinal);
            levels.push(level.to_string());
        }
        let codes = values.iter().map(|value| index[value]).collect();
        Self {
            name: name.into(),
            levels,
            codes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    fn encoding(&self) -> FactorEncoding {
        FactorEncoding {
            factor: self.name.clone(),
            reference: self.levels.first().cloned().unwrap_or_default(),
            columns: self
                .levels
                .iter()
                .skip(1)
                .map(|level| column_name(&self.name, level))
                .collect(),
            levels: self.levels.clone(),
        }
    }
}

pub fn column_name(factor: &str, level: &str) -> String {
    format!("{factor}[{level}]")
}

/// How one factor was expanded into design columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorEncoding {
    pub factor: String,

    /// The level whose coefficient is fixed at zero.
    pub reference: String,

    /// All levels, in sorted order, starting with the reference.
    pub levels: Vec<String>,

    /// Generated column names for the non-reference levels, in level order.
    pub columns: Vec<String>,
}

/// An intercept plus indicator columns. Each row has at most one active column per factor, so only
/// the active column indices are stored.
#[derive(Debug, Clone)]
pub struct Design {
    rows: usize,
    column_names: Vec<String>,
    encodings: Vec<FactorEncoding>,
    stride: usize,
    active: Vec<usize>,
}
impl Design {
    pub fn build(factors: &[Factor]) -> Result<Self, FitError> {
        let rows = factors.first().map(Factor::len).unwrap_or_default();
        if rows == 0 {
            return Err(FitError::InsufficientData("no records to fit".into()));
        }
        if let Some(factor) = factors.iter().find(|factor| factor.len() != rows) {
            return Err(FitError::SchemaMismatch(format!(
                "factor {} has {} values, expected {rows}",
                factor.name(),
                factor.len()
            )));
        }

        let mut column_names = vec![INTERCEPT.to_string()];
        let mut offsets = Vec::with_capacity(factors.len());
        let mut encodings = Vec::with_capacity(factors.len());
        for factor in factors {
            let encoding = factor.encoding();
            // column of level k (k ≥ 1) is offset + k − 1
            offsets.push(column_names.len());
            column_names.extend(encoding.columns.iter().cloned());
            encodings.push(encoding);
        }

        let stride = factors.len();
        let mut active = Vec::with_capacity(rows * stride);
        for row in 0..rows {
            for (factor, &offset) in factors.iter().zip(&offsets) {
                let code = factor.codes[row];
                active.push(if code == 0 { REFERENCE } else { offset + code - 1 });
            }
        }

        Ok(Self {
            rows,
            column_names,
            encodings,
            stride,
            active,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.column_names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn encodings(&self) -> &[FactorEncoding] {
        &self.encodings
    }

    /// Indices of the non-intercept columns set to one in the given `row`.
    #[inline]
    pub fn active(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        let start = row * self.stride;
        self.active[start..start + self.stride]
            .iter()
            .copied()
            .filter(|&col| col != REFERENCE)
    }

    /// `Xβ`
    pub fn linear_predictor(&self, coefficients: &[f64]) -> Vec<f64> {
        debug_assert_eq!(self.cols(), coefficients.len());
        (0..self.rows)
            .map(|row| {
                coefficients[0]
                    + self
                        .active(row)
                        .map(|col| coefficients[col])
                        .sum::<f64>()
            })
            .collect()
    }

    /// The design with each row scaled by the corresponding `row_scales` entry, in dense form.
    pub fn to_dense_scaled(&self, row_scales: &[f64]) -> DMatrix<f64> {
        debug_assert_eq!(self.rows, row_scales.len());
        let mut dense = DMatrix::zeros(self.rows, self.cols());
        for (row, &scale) in row_scales.iter().enumerate() {
            dense[(row, 0)] = scale;
            for col in self.active(row) {
                dense[(row, col)] = scale;
            }
        }
        dense
    }
}
