//! Smooth segmentation of the scene by region growing on normals.
//!
//! Two neighbouring points (within `cluster_tolerance`) end up in the same
//! region when the angle between their normals is below
//! `eps_angle_threshold` and both curvatures are below
//! `curvature_threshold`. Regions smaller than `min_points` are dropped and
//! their points stay unlabeled. Computed once per verification call.
use crate::spatial::SceneIndex;
use crate::types::SurfaceNormal;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Region-growing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothSegParams {
    /// Maximum normal angle (radians) between merged neighbours.
    pub eps_angle_threshold: f32,
    /// Points with a larger curvature never grow a region.
    pub curvature_threshold: f32,
    /// Neighbourhood radius (metres).
    pub cluster_tolerance: f32,
    /// Minimum region size.
    pub min_points: usize,
}

impl Default for SmoothSegParams {
    fn default() -> Self {
        Self {
            eps_angle_threshold: 0.25,
            curvature_threshold: 0.04,
            cluster_tolerance: 0.01,
            min_points: 100,
        }
    }
}

/// Result of the smooth segmentation.
#[derive(Clone, Debug, Default)]
pub struct SmoothSegmentation {
    /// Region label per point; `None` for unlabeled points.
    pub labels: Vec<Option<u32>>,
    pub num_segments: usize,
}

impl SmoothSegmentation {
    pub fn same_segment(&self, a: usize, b: usize) -> bool {
        match (self.labels[a], self.labels[b]) {
            (Some(la), Some(lb)) => la == lb,
            _ => false,
        }
    }

    pub fn is_segmented(&self, p: usize) -> bool {
        self.labels[p].is_some()
    }
}

/// Region growing over the scene.
pub fn segment_smooth_regions(
    points: &[Point3<f32>],
    normals: &[SurfaceNormal],
    index: &SceneIndex,
    params: &SmoothSegParams,
) -> SmoothSegmentation {
    let n = points.len();
    let mut labels = vec![None; n];
    let mut processed = vec![false; n];
    let mut neighbors = Vec::new();
    let mut queue: Vec<usize> = Vec::new();
    let mut num_segments = 0u32;

    let smooth = |i: usize| normals[i].is_finite() && normals[i].curvature <= params.curvature_threshold;
    let cos_eps = params.eps_angle_threshold.cos();

    for seed in 0..n {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;
        queue.clear();
        queue.push(seed);

        let mut head = 0;
        while head < queue.len() {
            let current = queue[head];
            head += 1;
            if !smooth(current) {
                continue;
            }
            index.radius_search(&points[current], params.cluster_tolerance, &mut neighbors);
            for nb in &neighbors {
                let j = nb.index as usize;
                if processed[j] || !smooth(j) {
                    continue;
                }
                let dot = normals[current].normal.dot(&normals[j].normal);
                if dot >= cos_eps {
                    processed[j] = true;
                    queue.push(j);
                }
            }
        }

        if queue.len() >= params.min_points.max(1) {
            for &idx in &queue {
                labels[idx] = Some(num_segments);
            }
            num_segments += 1;
        }
    }

    SmoothSegmentation {
        labels,
        num_segments: num_segments as usize,
    }
}
