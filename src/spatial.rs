//! Spatial search over scene points.
//!
//! [`SceneIndex`] wraps an R*-tree bulk-loaded with the finite scene points;
//! queries return indices into the original point slice. Voxel helpers are
//! used for uniform sampling and for the complete-model occupancy grid.
use nalgebra::Point3;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::collections::HashMap;

type IndexedPoint = GeomWithData<[f32; 3], u32>;

/// Radius / nearest-neighbour search structure over a point set.
pub struct SceneIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

/// Neighbour returned by a radius query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: u32,
    pub distance: f32,
}

impl SceneIndex {
    /// Build the index; non-finite points are skipped and never returned.
    pub fn build(points: &[Point3<f32>]) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.iter().all(|v| v.is_finite()))
            .map(|(i, p)| IndexedPoint::new([p.x, p.y, p.z], i as u32))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            len: points.len(),
        }
    }

    /// Number of points the index was built from (including skipped ones).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All points within `radius` of `query`, in unspecified order.
    pub fn radius_search(&self, query: &Point3<f32>, radius: f32, out: &mut Vec<Neighbor>) {
        out.clear();
        if radius <= 0.0 {
            return;
        }
        let q = [query.x, query.y, query.z];
        for entry in self.tree.locate_within_distance(q, radius * radius) {
            let p = entry.geom();
            let d2 = (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2);
            out.push(Neighbor {
                index: entry.data,
                distance: d2.sqrt(),
            });
        }
    }

    pub fn nearest(&self, query: &Point3<f32>) -> Option<Neighbor> {
        let q = [query.x, query.y, query.z];
        self.tree.nearest_neighbor(&q).map(|entry| {
            let p = entry.geom();
            let d2 = (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2);
            Neighbor {
                index: entry.data,
                distance: d2.sqrt(),
            }
        })
    }
}

/// Integer voxel coordinates of a point for a given cell size.
pub fn voxel_key(p: &Point3<f32>, cell: f32) -> [i32; 3] {
    [
        (p.x / cell).floor() as i32,
        (p.y / cell).floor() as i32,
        (p.z / cell).floor() as i32,
    ]
}

/// Uniform sampling: per occupied voxel keep the point closest to the voxel
/// centre. Returned indices are sorted.
pub fn uniform_sample(points: &[Point3<f32>], resolution: f32) -> Vec<usize> {
    if resolution <= 0.0 {
        return (0..points.len()).collect();
    }
    let mut best: HashMap<[i32; 3], (usize, f32)> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        if !p.iter().all(|v| v.is_finite()) {
            continue;
        }
        let key = voxel_key(p, resolution);
        let centre = Point3::new(
            (key[0] as f32 + 0.5) * resolution,
            (key[1] as f32 + 0.5) * resolution,
            (key[2] as f32 + 0.5) * resolution,
        );
        let d = (p - centre).norm_squared();
        best.entry(key)
            .and_modify(|entry| {
                if d < entry.1 {
                    *entry = (i, d);
                }
            })
            .or_insert((i, d));
    }
    let mut kept: Vec<usize> = best.into_values().map(|(i, _)| i).collect();
    kept.sort_unstable();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, step: f32) -> Vec<Point3<f32>> {
        (0..n).map(|i| Point3::new(i as f32 * step, 0.0, 0.0)).collect()
    }

    #[test]
    fn radius_search_returns_points_inside_ball() {
        let pts = line(10, 0.01);
        let index = SceneIndex::build(&pts);
        let mut out = Vec::new();
        index.radius_search(&Point3::new(0.05, 0.0, 0.0), 0.0151, &mut out);
        let mut ids: Vec<u32> = out.iter().map(|n| n.index).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![4, 5, 6]);
        assert!(out.iter().all(|n| n.distance <= 0.0151));
    }

    #[test]
    fn non_finite_points_are_never_returned() {
        let mut pts = line(3, 0.01);
        pts.push(Point3::new(f32::NAN, 0.0, 0.0));
        let index = SceneIndex::build(&pts);
        assert_eq!(index.len(), 4);
        let mut out = Vec::new();
        index.radius_search(&Point3::origin(), 1.0, &mut out);
        assert_eq!(out.len(), 3);
        let nn = index.nearest(&Point3::new(0.021, 0.0, 0.0)).unwrap();
        assert_eq!(nn.index, 2);
    }

    #[test]
    fn uniform_sampling_keeps_one_point_per_voxel() {
        let pts = line(100, 0.001);
        let kept = uniform_sample(&pts, 0.01);
        assert_eq!(kept.len(), 10);
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(uniform_sample(&pts, 0.0).len(), 100);
    }
}
