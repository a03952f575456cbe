//! Verification pipeline orchestrating the GHV stages.
//!
//! The [`HypothesisVerifier`] takes a scene and a list of candidate
//! placements and returns an accept/reject mask with diagnostics.
//!
//! Typical usage:
//! ```no_run
//! use ghv::{GhvParams, Hypothesis, HypothesisVerifier, SceneCloud};
//!
//! # fn example(scene: SceneCloud, hypotheses: Vec<Hypothesis>) -> Result<(), ghv::VerifyError> {
//! let mut verifier = HypothesisVerifier::new(GhvParams::default())?;
//! let report = verifier.verify(&scene, &hypotheses)?;
//! for idx in report.accepted() {
//!     println!("accepted {}", hypotheses[idx].model_id);
//! }
//! # Ok(())
//! # }
//! ```

// Stages
// - Scene: sampling, normals, colors, smooth segmentation (cached in the workspace).
// - Models: explained / clutter / outlier / occupancy bookkeeping per hypothesis.
// - Conflicts: union-find over shared points, clutter overlap and cells.
// - Optimize: one cost model and search strategy per component.
// - Merge: index-wise masks, outlier clouds, traces and cost log.

use super::workspace::VerifierWorkspace;
use super::GhvParams;
use crate::conflict::{conflict_components, extract_problem};
use crate::cost::{CostModel, CostWeights};
use crate::diagnostics::{
    ComponentTrace, CostLog, CostLogEntry, HypothesisOutliers, TimingBreakdown, VerificationReport,
};
use crate::error::VerifyError;
use crate::model::{build_models, RecognitionModel};
use crate::optimizer::{run_component, strategy_for};
use crate::scene::SceneModel;
use crate::types::{Hypothesis, SceneCloud};
use log::{debug, info};
use std::time::Instant;

/// Input of one verification call.
#[derive(Clone, Copy, Debug)]
pub struct VerificationRequest<'a> {
    pub scene: &'a SceneCloud,
    pub hypotheses: &'a [Hypothesis],
    /// Planar hypotheses from an external plane segmentation.
    pub planes: &'a [Hypothesis],
    /// Optional score multiplier per object hypothesis.
    pub inlier_weights: Option<&'a [f32]>,
}

impl<'a> VerificationRequest<'a> {
    pub fn new(scene: &'a SceneCloud, hypotheses: &'a [Hypothesis]) -> Self {
        Self {
            scene,
            hypotheses,
            planes: &[],
            inlier_weights: None,
        }
    }

    pub fn with_planes(mut self, planes: &'a [Hypothesis]) -> Self {
        self.planes = planes;
        self
    }

    pub fn with_inlier_weights(mut self, weights: &'a [f32]) -> Self {
        self.inlier_weights = Some(weights);
        self
    }
}

/// Global hypothesis verifier.
pub struct HypothesisVerifier {
    params: GhvParams,
    workspace: VerifierWorkspace,
}

struct ComponentResult {
    trace: ComponentTrace,
    active: Vec<bool>,
    log: Vec<CostLogEntry>,
}

impl HypothesisVerifier {
    /// Create a verifier; fails on invalid parameters.
    pub fn new(params: GhvParams) -> Result<Self, VerifyError> {
        params.validate()?;
        Ok(Self {
            params,
            workspace: VerifierWorkspace::new(),
        })
    }

    pub fn params(&self) -> &GhvParams {
        &self.params
    }

    /// Replace the parameters. A cached scene is only reused while the
    /// scene-related values stay the same.
    pub fn set_params(&mut self, params: GhvParams) -> Result<(), VerifyError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn workspace(&self) -> &VerifierWorkspace {
        &self.workspace
    }

    /// Verify object hypotheses only.
    pub fn verify(&mut self, scene: &SceneCloud, hypotheses: &[Hypothesis]) -> Result<VerificationReport, VerifyError> {
        self.verify_request(&VerificationRequest::new(scene, hypotheses))
    }

    /// Run all stages and capture diagnostics.
    pub fn verify_request(&mut self, request: &VerificationRequest<'_>) -> Result<VerificationReport, VerifyError> {
        let total_start = Instant::now();
        let n_objects = request.hypotheses.len();
        let n_planes = request.planes.len();

        if let Some(weights) = request.inlier_weights {
            if weights.len() != n_objects {
                return Err(VerifyError::length_mismatch(
                    "hypotheses",
                    n_objects,
                    "inlier weights",
                    weights.len(),
                ));
            }
        }
        if n_objects + n_planes == 0 {
            info!("HypothesisVerifier::verify called without hypotheses");
            let mut report = VerificationReport::empty(0, 0);
            report.timings.finish(total_start);
            return Ok(report);
        }

        let params = &self.params;
        let mut timings = TimingBreakdown::default();

        let stage = Instant::now();
        let scene = self.workspace.scene(request.scene, params)?;
        timings.push_since("scene", stage);

        let all: Vec<&Hypothesis> = request.hypotheses.iter().chain(request.planes).collect();
        let weights: Option<Vec<f32>> = request.inlier_weights.map(|w| {
            w.iter()
                .copied()
                .chain(std::iter::repeat(1.0).take(n_planes))
                .collect()
        });
        let model_set = build_models(scene, &all, weights.as_deref(), params);
        timings.push("models", model_set.elapsed_ms);

        let stage = Instant::now();
        let components = conflict_components(&model_set.models, scene.len(), model_set.num_cells);
        timings.push_since("conflicts", stage);
        debug!(
            "HypothesisVerifier hypotheses={} planes={} scene_points={} components={}",
            n_objects,
            n_planes,
            scene.len(),
            components.len()
        );

        let stage = Instant::now();
        let results = optimize_components(&components, &model_set.models, scene, params);
        timings.push_since("optimize", stage);

        let mut active = vec![false; all.len()];
        let mut traces = Vec::with_capacity(results.len());
        let mut cost_log = Vec::new();
        let mut final_cost = 0.0;
        for result in results {
            for (local, &global) in result.trace.hypotheses.iter().enumerate() {
                active[global] = result.active[local];
            }
            final_cost += result.trace.final_cost;
            cost_log.extend(result.log);
            traces.push(result.trace);
        }

        let outliers = active
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(g, _)| {
                let h = all[g];
                HypothesisOutliers {
                    hypothesis: if g < n_objects { g } else { g - n_objects },
                    planar: g >= n_objects,
                    points: model_set.models[g]
                        .outlier_points
                        .iter()
                        .map(|&i| h.visible_points[i].position)
                        .collect(),
                }
            })
            .collect();

        timings.finish(total_start);
        debug!("HypothesisVerifier merge_ms={:.3}", timings.unattributed_ms());
        let report = VerificationReport {
            plane_mask: active[n_objects..].to_vec(),
            mask: {
                active.truncate(n_objects);
                active
            },
            outliers,
            components: traces,
            cost_log,
            final_cost,
            visible_points: all.iter().map(|h| h.visible_points.len()).sum(),
            scene_points: scene.len(),
            timings,
        };
        info!("HypothesisVerifier {}", report.summary());
        Ok(report)
    }
}

fn optimize_components(
    components: &[Vec<usize>],
    models: &[RecognitionModel],
    scene: &SceneModel,
    params: &GhvParams,
) -> Vec<ComponentResult> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        components
            .par_iter()
            .enumerate()
            .map(|(i, members)| solve_component(i, members, models, scene, params))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        components
            .iter()
            .enumerate()
            .map(|(i, members)| solve_component(i, members, models, scene, params))
            .collect()
    }
}

fn solve_component(
    index: usize,
    members: &[usize],
    models: &[RecognitionModel],
    scene: &SceneModel,
    params: &GhvParams,
) -> ComponentResult {
    let start = Instant::now();
    let local = extract_problem(members, models, scene);
    let mut cost_model = CostModel::new(&local.cost, CostWeights::from_params(params));
    let mut strategy = strategy_for(params, index);
    let mut log = CostLog::new(index, params.record_cost_log);

    let run = run_component(
        &mut cost_model,
        strategy.as_mut(),
        params.initial_status,
        params.max_iterations,
        &mut log,
    );
    let strategy_name = if members.len() < 2 {
        "direct"
    } else {
        strategy.name()
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(
        "component {} hypotheses={} points={} strategy={} cost {:.4} -> {:.4} iterations={}",
        index,
        members.len(),
        local.scene_points.len(),
        strategy_name,
        run.initial_cost,
        run.solution.cost,
        run.iterations
    );

    ComponentResult {
        trace: ComponentTrace {
            index,
            hypotheses: local.members.clone(),
            scene_points: local.scene_points.len(),
            strategy: strategy_name.to_string(),
            initial_cost: run.initial_cost,
            final_cost: run.solution.cost,
            totals: run.solution.totals,
            iterations: run.iterations,
            evaluations: run.evaluations,
            elapsed_ms,
        },
        active: run.solution.active,
        log: log.into_global(&local.members),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointRecord;
    use nalgebra::{Isometry3, Point3};

    fn scene() -> SceneCloud {
        SceneCloud::new((0..40).map(|i| Point3::new(i as f32 * 0.005, 0.0, 1.0)).collect())
    }

    #[test]
    fn no_hypotheses_is_not_an_error() {
        let mut v = HypothesisVerifier::new(GhvParams::default()).unwrap();
        let report = v.verify(&scene(), &[]).unwrap();
        assert!(report.mask.is_empty());
        assert!(report.components.is_empty());
    }

    #[test]
    fn inlier_weight_count_must_match() {
        let mut v = HypothesisVerifier::new(GhvParams::default()).unwrap();
        let s = scene();
        let hyps = vec![Hypothesis::new(
            "bar",
            Isometry3::identity(),
            s.points.iter().map(|p| PointRecord::new(*p)).collect(),
        )];
        let weights = [1.0, 1.0];
        let request = VerificationRequest::new(&s, &hyps).with_inlier_weights(&weights);
        let err = v.verify_request(&request).err();
        assert!(matches!(err, Some(VerifyError::LengthMismatch { right_len: 2, .. })));
    }

    #[test]
    fn invalid_params_are_rejected_up_front() {
        let params = GhvParams {
            inlier_threshold: -1.0,
            ..Default::default()
        };
        assert!(HypothesisVerifier::new(params).is_err());
    }
}
