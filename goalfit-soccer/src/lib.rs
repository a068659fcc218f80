//! Football match records and the goal-count analysis built on them: loading matches from a SQLite
//! store, the cleaned dataset and its flat-file form, synthetic leagues, and the per-response
//! Poisson → diagnostics → Negative Binomial pipeline.

pub mod data;
pub mod dataset;
pub mod pipeline;
pub mod sim;
