//! Scene preparation: sampling, normals, colors, smooth segments and the
//! static per-point records consumed by the cost model.
use crate::color::convert_all;
use crate::error::VerifyError;
use crate::normals::estimate_normals;
use crate::segmentation::{segment_smooth_regions, SmoothSegmentation};
use crate::spatial::{uniform_sample, SceneIndex};
use crate::types::{SceneCloud, SurfaceNormal};
use crate::verifier::GhvParams;
use log::debug;
use nalgebra::Point3;

/// Static information attached to every considered scene point.
#[derive(Clone, Debug)]
pub struct ScenePointRecord {
    pub segment: Option<u32>,
    pub curvature: f32,
    pub color: Option<[f32; 3]>,
    /// Penalty applied when two or more active hypotheses explain the point.
    pub duplicity_weight: f64,
}

/// Scene as seen by the verifier (after optional sampling).
pub struct SceneModel {
    pub points: Vec<Point3<f32>>,
    pub normals: Vec<SurfaceNormal>,
    pub records: Vec<ScenePointRecord>,
    pub segmentation: SmoothSegmentation,
    pub index: SceneIndex,
    /// Index of every kept point in the caller's cloud.
    pub source_indices: Vec<usize>,
}

impl SceneModel {
    /// Validate the cloud and build all per-point structures.
    pub fn prepare(scene: &SceneCloud, params: &GhvParams) -> Result<Self, VerifyError> {
        validate_scene(scene, params)?;

        let source_indices = if params.downsample_scene {
            uniform_sample(&scene.points, params.resolution)
        } else {
            (0..scene.points.len()).collect()
        };
        let points: Vec<Point3<f32>> = source_indices.iter().map(|&i| scene.points[i]).collect();
        let index = SceneIndex::build(&points);

        let normals = match &scene.normals {
            Some(normals) => source_indices.iter().map(|&i| normals[i]).collect(),
            None => {
                debug!(
                    "SceneModel::prepare estimating normals for {} points (radius={})",
                    points.len(),
                    params.normal_radius
                );
                estimate_normals(&points, &index, params.normal_radius)
            }
        };

        let colors = match (&scene.colors, params.ignore_color) {
            (Some(colors), false) => {
                let picked: Vec<_> = source_indices.iter().map(|&i| colors[i]).collect();
                Some(convert_all(params.color_space, &picked))
            }
            _ => None,
        };

        let segmentation = segment_smooth_regions(&points, &normals, &index, &params.smooth_seg);
        debug!(
            "SceneModel::prepare points={} segments={}",
            points.len(),
            segmentation.num_segments
        );

        let records = (0..points.len())
            .map(|i| {
                let curvature = if normals[i].is_finite() {
                    normals[i].curvature
                } else {
                    0.0
                };
                let segment = segmentation.labels[i];
                ScenePointRecord {
                    segment,
                    curvature,
                    color: colors.as_ref().map(|c| c[i]),
                    duplicity_weight: duplicity_weight(segment.is_some(), curvature, params),
                }
            })
            .collect();

        Ok(Self {
            points,
            normals,
            records,
            segmentation,
            index,
            source_indices,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        self.records.first().is_some_and(|r| r.color.is_some())
    }
}

/// Duplication inside a smooth segment is discounted, growing back to the
/// full weight with curvature; points outside segments pay the full weight.
pub fn duplicity_weight(in_segment: bool, curvature: f32, params: &GhvParams) -> f64 {
    let base = params.duplicity_weight;
    if !in_segment {
        return base;
    }
    let f = params.smooth_duplicity_factor.clamp(0.0, 1.0);
    let max_curv = params.duplicity_curvature_max.max(1e-6);
    let c = (curvature.max(0.0) / max_curv).min(1.0) as f64;
    base * (f + (1.0 - f) * c)
}

/// Length and normal preconditions of a caller's scene.
pub(crate) fn validate_scene(scene: &SceneCloud, params: &GhvParams) -> Result<(), VerifyError> {
    match &scene.normals {
        Some(normals) if normals.len() != scene.points.len() => {
            return Err(VerifyError::length_mismatch(
                "scene points",
                scene.points.len(),
                "scene normals",
                normals.len(),
            ));
        }
        None if params.requires_normals => return Err(VerifyError::MissingNormals),
        _ => {}
    }
    if let Some(colors) = &scene.colors {
        if colors.len() != scene.points.len() {
            return Err(VerifyError::length_mismatch(
                "scene points",
                scene.points.len(),
                "scene colors",
                colors.len(),
            ));
        }
    }
    Ok(())
}

/// Cheap identity of a scene and the parameters that shape its preparation.
pub(crate) fn scene_fingerprint(scene: &SceneCloud, params: &GhvParams) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut h = DefaultHasher::new();
    scene.points.len().hash(&mut h);
    for p in &scene.points {
        for v in p.iter() {
            v.to_bits().hash(&mut h);
        }
    }
    if let Some(colors) = &scene.colors {
        colors.hash(&mut h);
    }
    if let Some(normals) = &scene.normals {
        for n in normals {
            for v in n.normal.iter() {
                v.to_bits().hash(&mut h);
            }
            n.curvature.to_bits().hash(&mut h);
        }
    }
    params.downsample_scene.hash(&mut h);
    params.resolution.to_bits().hash(&mut h);
    params.normal_radius.to_bits().hash(&mut h);
    params.ignore_color.hash(&mut h);
    params.color_space.hash(&mut h);
    params.duplicity_weight.to_bits().hash(&mut h);
    params.smooth_duplicity_factor.to_bits().hash(&mut h);
    params.duplicity_curvature_max.to_bits().hash(&mut h);
    params.smooth_seg.eps_angle_threshold.to_bits().hash(&mut h);
    params.smooth_seg.curvature_threshold.to_bits().hash(&mut h);
    params.smooth_seg.cluster_tolerance.to_bits().hash(&mut h);
    params.smooth_seg.min_points.hash(&mut h);
    h.finish()
}
