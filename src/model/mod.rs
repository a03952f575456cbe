//! Per-hypothesis bookkeeping computed once before optimization.
//!
//! Overview
//! - [`RecognitionModel`] stores, for one hypothesis, the scene points it
//!   explains (with their scores), its clutter neighbourhood (with weights),
//!   the model points left unexplained, and the occupancy cells it covers.
//! - [`build_models`] runs the explanation search for every hypothesis and
//!   assigns dense ids to the `(model_id, voxel)` occupancy cells.
//!
//! Notes
//! - The explained set and the clutter set of one hypothesis are disjoint and
//!   both sorted by scene index.
//! - Nothing here depends on the activation state; the cost model owns all
//!   mutable counters.

mod builder;

pub use builder::{build_model, build_models, ModelSet};

use crate::types::HypothesisKind;

/// Static explanation data for one hypothesis.
#[derive(Clone, Debug)]
pub struct RecognitionModel {
    pub model_id: String,
    pub kind: HypothesisKind,
    /// Explained scene points, sorted, without duplicates.
    pub explained: Vec<u32>,
    /// Score per entry of `explained`.
    pub explained_scores: Vec<f64>,
    /// Unexplained scene points near the explained set, sorted.
    pub clutter: Vec<u32>,
    /// Weight per entry of `clutter`.
    pub clutter_weights: Vec<f64>,
    /// Indices into the hypothesis' visible points that found no scene match.
    pub outlier_points: Vec<usize>,
    /// Weighted outlier count.
    pub bad_information: f64,
    pub outlier_weight: f64,
    /// Dense occupancy cell ids (empty for planar hypotheses).
    pub occupied_cells: Vec<u32>,
    /// Finite visible model points; non-finite ones never reach the search.
    pub visible_points: usize,
}

impl RecognitionModel {
    /// Cost contributed by the outliers while the hypothesis is active.
    pub fn bad_info_cost(&self) -> f64 {
        self.outlier_weight * self.bad_information
    }

    pub fn explains(&self, scene_idx: u32) -> bool {
        self.explained.binary_search(&scene_idx).is_ok()
    }

    /// Fraction of visible points that found a scene match.
    pub fn inlier_ratio(&self) -> f64 {
        if self.visible_points == 0 {
            return 0.0;
        }
        1.0 - self.outlier_points.len() as f64 / self.visible_points as f64
    }
}
