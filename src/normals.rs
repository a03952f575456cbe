//! PCA normal estimation for scenes delivered without normals.
//!
//! The normal is the eigenvector of the neighbourhood covariance with the
//! smallest eigenvalue, flipped toward the camera at the origin. Curvature is
//! the surface variation `λ0 / (λ0 + λ1 + λ2)`.
use crate::spatial::{Neighbor, SceneIndex};
use crate::types::SurfaceNormal;
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};

const MIN_NEIGHBORS: usize = 3;

/// Estimate one normal per point. Points with too few neighbours get a
/// non-finite normal so later stages skip them.
pub fn estimate_normals(
    points: &[Point3<f32>],
    index: &SceneIndex,
    radius: f32,
) -> Vec<SurfaceNormal> {
    let mut neighbors = Vec::new();
    points
        .iter()
        .map(|p| {
            if !p.iter().all(|v| v.is_finite()) {
                return invalid_normal();
            }
            index.radius_search(p, radius, &mut neighbors);
            normal_from_neighbors(p, points, &neighbors)
        })
        .collect()
}

fn invalid_normal() -> SurfaceNormal {
    SurfaceNormal::new(Vector3::repeat(f32::NAN), f32::NAN)
}

fn normal_from_neighbors(
    query: &Point3<f32>,
    points: &[Point3<f32>],
    neighbors: &[Neighbor],
) -> SurfaceNormal {
    if neighbors.len() < MIN_NEIGHBORS {
        return invalid_normal();
    }
    let n = neighbors.len() as f32;
    let centroid = neighbors
        .iter()
        .fold(Vector3::zeros(), |acc, nb| acc + points[nb.index as usize].coords)
        / n;
    let mut cov = Matrix3::zeros();
    for nb in neighbors {
        let d = points[nb.index as usize].coords - centroid;
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = SymmetricEigen::new(cov);
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .fold((0usize, f32::INFINITY), |best, (i, &v)| {
            if v < best.1 {
                (i, v)
            } else {
                best
            }
        });
    let sum = eig.eigenvalues.iter().map(|v| v.max(0.0)).sum::<f32>();
    let curvature = if sum > 0.0 {
        eig.eigenvalues[min_idx].max(0.0) / sum
    } else {
        0.0
    };
    let mut normal: Vector3<f32> = eig.eigenvectors.column(min_idx).into_owned();
    if normal.dot(&query.coords) > 0.0 {
        normal = -normal;
    }
    SurfaceNormal::new(normal.normalize(), curvature)
}
