//! Global cost of an activation vector and its incremental maintenance.
//!
//! ```text
//! cost = -explained + regularizer * duplicity + clutter_regularizer * clutter
//!        + bad_info + active_hypothesis_penalty * n_active
//!        + cm_duplicity_weight * cm_duplicity
//! ```
//!
//! Overview
//! - [`CostProblem`] is the static input of one conflict component: per
//!   hypothesis explained / clutter lists over a dense local point range,
//!   per-point duplicity weights and occupancy cells.
//! - [`CostModel`] keeps the per-point counters and the running
//!   [`CostTotals`]. Toggling a hypothesis touches only its own point lists.
//!
//! Toggle protocol (sign = +1 on, -1 off)
//! 1. `update_explained`: counts, explainer lists and the explained /
//!    duplicity / clutter contribution of every explained point.
//! 2. `update_unexplained`: clutter accumulators of the neighbourhood.
//! 3. `update_cm_duplicity`: occupancy counters of the covered cells.
//!
//! [`CostModel::recompute`] rebuilds the totals from scratch and is used by
//! the tests to check the running values.

mod state;

pub use state::CostModel;

use crate::verifier::GhvParams;
use serde::{Deserialize, Serialize};

/// How the scores of several active explainers of one point are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainedAggregation {
    /// Best score among the active explainers.
    #[default]
    Best,
    Sum,
    /// Sum capped at 1.0 so duplicates cannot inflate the explained value.
    CappedSum,
}

impl ExplainedAggregation {
    pub(crate) fn combine(self, best: f64, sum: f64) -> f64 {
        match self {
            ExplainedAggregation::Best => best,
            ExplainedAggregation::Sum => sum,
            ExplainedAggregation::CappedSum => sum.min(1.0),
        }
    }
}

/// Scalar weights of the cost terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostWeights {
    pub regularizer: f64,
    pub clutter_regularizer: f64,
    pub active_hypothesis_penalty: f64,
    pub cm_duplicity_weight: f64,
    pub aggregation: ExplainedAggregation,
    pub penalize_duplicates_once: bool,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self::from_params(&GhvParams::default())
    }
}

impl CostWeights {
    pub fn from_params(params: &GhvParams) -> Self {
        Self {
            regularizer: params.regularizer,
            clutter_regularizer: params.clutter_regularizer,
            active_hypothesis_penalty: params.active_hypothesis_penalty,
            cm_duplicity_weight: params.cm_duplicity_weight,
            aggregation: params.explained_aggregation,
            penalize_duplicates_once: params.penalize_duplicates_once,
        }
    }
}

/// Running values of the cost terms (unweighted).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    pub explained: f64,
    pub duplicity: f64,
    pub clutter: f64,
    pub bad_info: f64,
    pub cm_duplicity: f64,
    pub active: usize,
}

impl CostTotals {
    pub fn cost(&self, w: &CostWeights) -> f64 {
        -self.explained
            + w.regularizer * self.duplicity
            + w.clutter_regularizer * self.clutter
            + self.bad_info
            + w.active_hypothesis_penalty * self.active as f64
            + w.cm_duplicity_weight * self.cm_duplicity
    }

    /// Term-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &CostTotals, tol: f64) -> bool {
        self.active == other.active
            && (self.explained - other.explained).abs() <= tol
            && (self.duplicity - other.duplicity).abs() <= tol
            && (self.clutter - other.clutter).abs() <= tol
            && (self.bad_info - other.bad_info).abs() <= tol
            && (self.cm_duplicity - other.cm_duplicity).abs() <= tol
    }
}

/// Static terms of one hypothesis expressed over local point indices.
#[derive(Clone, Debug, Default)]
pub struct HypothesisTerms {
    /// `(point, score)` sorted by point.
    pub explained: Vec<(u32, f64)>,
    /// `(point, weight)` sorted by point, disjoint from `explained`.
    pub clutter: Vec<(u32, f64)>,
    /// Outlier cost already multiplied by the outlier weight.
    pub bad_info: f64,
    pub cells: Vec<u32>,
}

/// Static input of the cost model for one component.
#[derive(Clone, Debug, Default)]
pub struct CostProblem {
    pub hypotheses: Vec<HypothesisTerms>,
    /// Duplicity weight per local point.
    pub duplicity_weights: Vec<f64>,
    pub num_cells: usize,
    /// Index-based conflict adjacency between local hypotheses.
    pub conflicts: Vec<Vec<usize>>,
}

impl CostProblem {
    pub fn num_points(&self) -> usize {
        self.duplicity_weights.len()
    }
}
