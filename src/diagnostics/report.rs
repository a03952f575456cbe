use super::{CostLogEntry, TimingBreakdown};
use crate::cost::CostTotals;
use nalgebra::Point3;
use serde::Serialize;

/// Result of a verification call.
///
/// `mask` is aligned with the object hypotheses passed in, `plane_mask` with
/// the planar ones.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub mask: Vec<bool>,
    pub plane_mask: Vec<bool>,
    /// Unexplained model points of every accepted hypothesis.
    pub outliers: Vec<HypothesisOutliers>,
    pub components: Vec<ComponentTrace>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cost_log: Vec<CostLogEntry>,
    /// Sum of the final component costs.
    pub final_cost: f64,
    /// Visible model points over all hypotheses.
    pub visible_points: usize,
    /// Scene points after preparation.
    pub scene_points: usize,
    pub timings: TimingBreakdown,
}

impl VerificationReport {
    /// Report for a call without hypotheses.
    pub fn empty(num_hypotheses: usize, num_planes: usize) -> Self {
        Self {
            mask: vec![false; num_hypotheses],
            plane_mask: vec![false; num_planes],
            ..Default::default()
        }
    }

    pub fn num_accepted(&self) -> usize {
        self.mask.iter().chain(&self.plane_mask).filter(|a| **a).count()
    }

    /// Indices of accepted object hypotheses.
    pub fn accepted(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.then_some(i))
    }

    pub fn outliers_of(&self, hypothesis: usize, planar: bool) -> Option<&HypothesisOutliers> {
        self.outliers
            .iter()
            .find(|o| o.hypothesis == hypothesis && o.planar == planar)
    }

    pub fn summary(&self) -> String {
        format!(
            "accepted={}/{} planes={}/{} components={} cost={:.4} total_ms={:.3}",
            self.mask.iter().filter(|a| **a).count(),
            self.mask.len(),
            self.plane_mask.iter().filter(|a| **a).count(),
            self.plane_mask.len(),
            self.components.len(),
            self.final_cost,
            self.timings.total_ms
        )
    }
}

/// Outlier cloud of one accepted hypothesis.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisOutliers {
    /// Index into the object or plane list, depending on `planar`.
    pub hypothesis: usize,
    pub planar: bool,
    pub points: Vec<Point3<f32>>,
}

/// Trace of one conflict component.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTrace {
    pub index: usize,
    /// Global ids (objects first, then planes).
    pub hypotheses: Vec<usize>,
    pub scene_points: usize,
    pub strategy: String,
    pub initial_cost: f64,
    pub final_cost: f64,
    pub totals: CostTotals,
    pub iterations: usize,
    pub evaluations: usize,
    pub elapsed_ms: f64,
}
