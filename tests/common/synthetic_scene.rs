use ghv::{Hypothesis, PointRecord, SceneCloud, SurfaceNormal};
use nalgebra::{Isometry3, Point3, Vector3};

/// Sampling step of the synthetic clouds (matches the default resolution).
pub const STEP: f32 = 0.005;
pub const BOX_SIDE: f32 = 0.1;

/// Front face (z = 0, facing -z) and left face (x = 0, facing -x) of a cube
/// in model coordinates. The shared edge is emitted once.
pub fn box_model() -> Vec<PointRecord> {
    let n = (BOX_SIDE / STEP).round() as usize + 1;
    let mut points = Vec::with_capacity(2 * n * n);
    for i in 0..n {
        for j in 0..n {
            let (a, b) = (i as f32 * STEP, j as f32 * STEP);
            points.push(
                PointRecord::new(Point3::new(a, b, 0.0))
                    .with_normal(SurfaceNormal::new(-Vector3::z(), 0.0)),
            );
            if i > 0 {
                points.push(
                    PointRecord::new(Point3::new(0.0, b, a))
                        .with_normal(SurfaceNormal::new(-Vector3::x(), 0.0)),
                );
            }
        }
    }
    points
}

/// Pose of the reference box: to the right of the optical axis so both
/// faces are well visible from the origin.
pub fn box_pose() -> Isometry3<f32> {
    Isometry3::translation(0.3, -0.05, 0.8)
}

/// Diagonal offset that leaves only a small corner overlap with the box.
pub fn misplaced_pose() -> Isometry3<f32> {
    Isometry3::translation(0.4, 0.05, 0.8)
}

/// Points already in the scene frame.
pub fn placed(model: &[PointRecord], pose: &Isometry3<f32>) -> Vec<PointRecord> {
    model.iter().map(|p| p.transformed(pose)).collect()
}

/// Vertical wall patch at depth `z` facing the camera.
pub fn wall(x0: f32, y0: f32, z: f32, nx: usize, ny: usize) -> Vec<PointRecord> {
    let mut points = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            points.push(
                PointRecord::new(Point3::new(x0 + i as f32 * STEP, y0 + j as f32 * STEP, z))
                    .with_normal(SurfaceNormal::new(-Vector3::z(), 0.0)),
            );
        }
    }
    points
}

/// Scene cloud with normals (and colors when every point has one).
pub fn scene_from(parts: &[&[PointRecord]]) -> SceneCloud {
    let records: Vec<PointRecord> = parts.iter().flat_map(|p| p.iter().copied()).collect();
    let mut scene = SceneCloud::new(records.iter().map(|p| p.position).collect());
    if records.iter().all(|p| p.normal.is_some()) {
        scene = scene.with_normals(records.iter().filter_map(|p| p.normal).collect());
    }
    if records.iter().all(|p| p.color.is_some()) {
        scene = scene.with_colors(records.iter().filter_map(|p| p.color).collect());
    }
    scene
}

pub fn colored(points: &[PointRecord], rgb: [u8; 3]) -> Vec<PointRecord> {
    points.iter().map(|p| p.with_color(rgb)).collect()
}

/// Box scene plus the correct hypothesis and a misplaced one.
pub fn box_scene_with_hypotheses() -> (SceneCloud, Vec<Hypothesis>) {
    let model = box_model();
    let scene = scene_from(&[&placed(&model, &box_pose())]);
    let hypotheses = vec![
        Hypothesis::from_model("box", box_pose(), &model),
        Hypothesis::from_model("box", misplaced_pose(), &model),
    ];
    (scene, hypotheses)
}
