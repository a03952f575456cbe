use ghv::config::load_params;
use ghv::{GhvParams, Hypothesis, HypothesisVerifier, PointRecord, SceneCloud, SurfaceNormal};
use nalgebra::{Isometry3, Point3, Vector3};
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let params = match env::args().nth(1) {
        Some(path) => load_params(Path::new(&path)).map_err(|e| e.to_string())?,
        None => GhvParams::default(),
    };

    // Demo scene: two visible faces of a 10 cm box 80 cm in front of the camera.
    let model = box_faces(0.1, 0.005);
    let placed = Isometry3::translation(0.3, -0.05, 0.8);
    let scene_points: Vec<PointRecord> = model.iter().map(|p| p.transformed(&placed)).collect();
    let scene = SceneCloud::new(scene_points.iter().map(|p| p.position).collect())
        .with_normals(scene_points.iter().filter_map(|p| p.normal).collect());

    let misplaced = Isometry3::translation(0.4, 0.05, 0.8);
    let hypotheses = vec![
        Hypothesis::from_model("box", placed, &model),
        Hypothesis::from_model("box", misplaced, &model),
        Hypothesis::from_model("box", placed, &model),
    ];

    let mut verifier = HypothesisVerifier::new(params).map_err(|e| e.to_string())?;
    let report = verifier
        .verify(&scene, &hypotheses)
        .map_err(|e| e.to_string())?;

    println!("{}", report.summary());
    for (i, accepted) in report.mask.iter().enumerate() {
        println!("  hypothesis {i}: {}", if *accepted { "accepted" } else { "rejected" });
    }
    for stage in &report.timings.stages {
        println!("  {:<10} {:>8.3} ms", stage.label, stage.elapsed_ms);
    }
    Ok(())
}

/// Front face (z = 0) and left face (x = 0) of a cube in model coordinates.
fn box_faces(side: f32, step: f32) -> Vec<PointRecord> {
    let n = (side / step).round() as usize + 1;
    let mut points = Vec::with_capacity(2 * n * n);
    for i in 0..n {
        for j in 0..n {
            let (a, b) = (i as f32 * step, j as f32 * step);
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
