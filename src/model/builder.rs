use super::RecognitionModel;
use crate::scene::SceneModel;
use crate::spatial::voxel_key;
use crate::types::{Hypothesis, HypothesisKind, PointRecord};
use crate::verifier::GhvParams;
use log::debug;
use std::collections::HashMap;
use std::time::Instant;

/// Recognition models for one verification call plus the occupancy grid size.
pub struct ModelSet {
    pub models: Vec<RecognitionModel>,
    pub num_cells: usize,
    pub elapsed_ms: f64,
}

/// Build the models of every hypothesis and index the shared occupancy grid.
///
/// `inlier_weights` has one entry per hypothesis; lengths are checked by the
/// caller.
pub fn build_models(
    scene: &SceneModel,
    hypotheses: &[&Hypothesis],
    inlier_weights: Option<&[f32]>,
    params: &GhvParams,
) -> ModelSet {
    let start = Instant::now();
    let weight_of = |i: usize| inlier_weights.map_or(1.0, |w| w[i]);

    #[cfg(feature = "parallel")]
    let built: Vec<(RecognitionModel, Vec<[i32; 3]>)> = {
        use rayon::prelude::*;
        hypotheses
            .par_iter()
            .enumerate()
            .map(|(i, h)| build_model(scene, h, weight_of(i), params))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let built: Vec<(RecognitionModel, Vec<[i32; 3]>)> = hypotheses
        .iter()
        .enumerate()
        .map(|(i, h)| build_model(scene, h, weight_of(i), params))
        .collect();

    let mut cell_ids: HashMap<(String, [i32; 3]), u32> = HashMap::new();
    let mut models = Vec::with_capacity(built.len());
    for (mut model, keys) in built {
        model.occupied_cells = keys
            .into_iter()
            .map(|key| {
                let next = cell_ids.len() as u32;
                *cell_ids.entry((model.model_id.clone(), key)).or_insert(next)
            })
            .collect();
        models.push(model);
    }

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(
        "build_models hypotheses={} cells={} elapsed_ms={:.3}",
        models.len(),
        cell_ids.len(),
        elapsed_ms
    );
    ModelSet {
        models,
        num_cells: cell_ids.len(),
        elapsed_ms,
    }
}

/// Explanation search for a single hypothesis. Returns the model with empty
/// `occupied_cells` and the voxel keys it covers.
pub fn build_model(
    scene: &SceneModel,
    hypothesis: &Hypothesis,
    inlier_weight: f32,
    params: &GhvParams,
) -> (RecognitionModel, Vec<[i32; 3]>) {
    let tolerance = params.color_tolerance();
    let use_color = !params.ignore_color && scene.has_colors();
    let inlier_threshold = params.inlier_threshold;
    let sigma2 = 2.0 * (inlier_threshold as f64).powi(2);
    let cos_view = params.max_view_angle_deg.to_radians().cos();
    let bcw = params.best_color_weight as f64;

    let mut best: HashMap<u32, f64> = HashMap::new();
    let mut outlier_points = Vec::new();
    let mut bad_information = 0.0;
    let mut neighbors = Vec::new();

    for (mi, mp) in hypothesis.visible_points.iter().enumerate() {
        if !mp.is_finite() {
            continue;
        }
        let normal_factor = if has_bad_normal(mp, cos_view) {
            params.bad_normal_weight as f64
        } else {
            1.0
        };
        let model_color = match (use_color, mp.color) {
            (true, Some(c)) => Some(params.color_space.convert(c)),
            _ => None,
        };

        scene
            .index
            .radius_search(&mp.position, inlier_threshold, &mut neighbors);
        let mut matched = false;
        for nb in &neighbors {
            let mut color_factor = 1.0;
            if let (Some(mc), Some(sc)) = (&model_color, &scene.records[nb.index as usize].color) {
                let diff = params.color_space.difference(mc, sc);
                if !tolerance.accepts(&diff) {
                    continue;
                }
                color_factor = (1.0 - bcw) + bcw * tolerance.weight(&diff) as f64;
            }
            let d = nb.distance as f64;
            let score = (-d * d / sigma2).exp() * color_factor * normal_factor * inlier_weight as f64;
            matched = true;
            let entry = best.entry(nb.index).or_insert(score);
            if score > *entry {
                *entry = score;
            }
        }

        if !matched {
            outlier_points.push(mi);
            let curved = mp
                .normal
                .is_some_and(|n| n.curvature.is_finite() && n.curvature > params.outlier_curvature_threshold);
            let curvature_factor = if curved {
                params.curved_outlier_weight as f64
            } else {
                1.0
            };
            bad_information += normal_factor * curvature_factor;
        }
    }

    let mut explained: Vec<(u32, f64)> = best.into_iter().collect();
    explained.sort_unstable_by_key(|(idx, _)| *idx);

    let clutter = if params.detect_clutter && params.radius_neighborhood_clutter > 0.0 {
        clutter_neighborhood(scene, &explained, params.radius_neighborhood_clutter)
    } else {
        Vec::new()
    };

    let keys = match hypothesis.kind {
        HypothesisKind::Planar => Vec::new(),
        HypothesisKind::Object => occupancy_keys(&hypothesis.visible_points, params.occupancy_resolution),
    };

    let model = RecognitionModel {
        model_id: hypothesis.model_id.clone(),
        kind: hypothesis.kind,
        explained: explained.iter().map(|(i, _)| *i).collect(),
        explained_scores: explained.iter().map(|(_, s)| *s).collect(),
        clutter: clutter.iter().map(|(i, _)| *i).collect(),
        clutter_weights: clutter.iter().map(|(_, w)| *w).collect(),
        outlier_points,
        bad_information,
        outlier_weight: hypothesis.outlier_weight as f64,
        occupied_cells: Vec::new(),
        visible_points: hypothesis.visible_points.iter().filter(|p| p.is_finite()).count(),
    };
    (model, keys)
}

/// A normal is bad when it faces away from the camera at the origin by more
/// than the configured view angle.
fn has_bad_normal(p: &PointRecord, cos_view: f32) -> bool {
    let Some(n) = p.normal else {
        return false;
    };
    if !n.is_finite() {
        return false;
    }
    let to_camera = -p.position.coords;
    let len = to_camera.norm() * n.normal.norm();
    if len <= f32::EPSILON {
        return false;
    }
    n.normal.dot(&to_camera) / len < cos_view
}

/// Unexplained scene points within `radius` of an explained point. Same
/// smooth segment weighs 1.0, otherwise the weight decays linearly with
/// distance; the maximum over explained points is kept.
fn clutter_neighborhood(scene: &SceneModel, explained: &[(u32, f64)], radius: f32) -> Vec<(u32, f64)> {
    let mut weights: HashMap<u32, f64> = HashMap::new();
    let mut neighbors = Vec::new();
    for &(e, _) in explained {
        scene
            .index
            .radius_search(&scene.points[e as usize], radius, &mut neighbors);
        for nb in &neighbors {
            if explained.binary_search_by_key(&nb.index, |(i, _)| *i).is_ok() {
                continue;
            }
            let w = if scene.segmentation.same_segment(e as usize, nb.index as usize) {
                1.0
            } else {
                1.0 - (nb.distance / radius) as f64
            };
            if w <= 0.0 {
                continue;
            }
            let entry = weights.entry(nb.index).or_insert(w);
            if w > *entry {
                *entry = w;
            }
        }
    }
    let mut out: Vec<(u32, f64)> = weights.into_iter().collect();
    out.sort_unstable_by_key(|(i, _)| *i);
    out
}

fn occupancy_keys(points: &[PointRecord], cell: f32) -> Vec<[i32; 3]> {
    let mut keys: Vec<[i32; 3]> = points
        .iter()
        .filter(|p| p.is_finite())
        .map(|p| voxel_key(&p.position, cell))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}
