mod common;

use common::synthetic_scene::{
    box_model, box_pose, box_scene_with_hypotheses, colored, misplaced_pose, placed, scene_from,
    wall,
};
use ghv::model::build_model;
use ghv::scene::SceneModel;
use ghv::{
    GhvParams, Hypothesis, HypothesisVerifier, OptimizerType, PointRecord, SceneCloud,
    SurfaceNormal, VerificationRequest,
};
use nalgebra::{Point3, Vector3};

const STRATEGIES: [OptimizerType; 4] = [
    OptimizerType::LocalSearch,
    OptimizerType::TabuSearch,
    OptimizerType::TabuSearchReplace,
    OptimizerType::SimulatedAnnealing,
];

#[test]
fn scenario_preconditions_hold() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    let params = GhvParams::default();
    let prepared = SceneModel::prepare(&scene, &params).unwrap();

    let (good, _) = build_model(&prepared, &hypotheses[0], 1.0, &params);
    assert!(good.explained.len() as f64 >= 0.95 * scene.len() as f64);
    assert!(good.outlier_points.is_empty());

    let (bad, _) = build_model(&prepared, &hypotheses[1], 1.0, &params);
    assert!((bad.explained.len() as f64) < 0.05 * scene.len() as f64);
    assert!(!bad.explained.is_empty(), "misplaced box should touch the corner");
    assert!(bad.bad_information > 0.9 * hypotheses[1].visible_points.len() as f64);
}

#[test]
fn every_strategy_accepts_the_true_box_and_rejects_the_misplaced_one() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (scene, hypotheses) = box_scene_with_hypotheses();

    for optimizer in STRATEGIES {
        let params = GhvParams {
            optimizer,
            record_cost_log: true,
            ..Default::default()
        };
        let max_iterations = params.max_iterations;
        let mut verifier = HypothesisVerifier::new(params).unwrap();
        let report = verifier.verify(&scene, &hypotheses).unwrap();

        assert_eq!(report.mask, vec![true, false], "strategy {optimizer:?}");
        assert!(report.final_cost < 0.0, "strategy {optimizer:?}");
        assert_eq!(report.components.len(), 1, "hypotheses share the box corner");
        let trace = &report.components[0];
        assert!(trace.iterations <= max_iterations, "strategy {optimizer:?}");
        assert!(trace.final_cost <= trace.initial_cost);
        assert!(report
            .cost_log
            .iter()
            .all(|e| e.component == 0 && e.toggled < hypotheses.len()));

        let outliers = report.outliers_of(0, false).unwrap();
        assert!(outliers.points.is_empty());
        assert!(report.outliers_of(1, false).is_none());
    }
}

#[test]
fn repeated_verification_is_idempotent() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    for optimizer in STRATEGIES {
        let params = GhvParams {
            optimizer,
            seed: 11,
            ..Default::default()
        };
        let mut verifier = HypothesisVerifier::new(params.clone()).unwrap();
        let first = verifier.verify(&scene, &hypotheses).unwrap();
        let second = verifier.verify(&scene, &hypotheses).unwrap();
        assert_eq!(first.mask, second.mask);
        assert_eq!(first.final_cost, second.final_cost);
        assert_eq!(verifier.workspace().cache_hits(), 1);

        let mut fresh = HypothesisVerifier::new(params).unwrap();
        let third = fresh.verify(&scene, &hypotheses).unwrap();
        assert_eq!(first.mask, third.mask);
    }
}

#[test]
fn initial_all_active_state_converges_to_the_same_mask() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    for optimizer in STRATEGIES {
        let params = GhvParams {
            optimizer,
            initial_status: true,
            ..Default::default()
        };
        let mut verifier = HypothesisVerifier::new(params).unwrap();
        let report = verifier.verify(&scene, &hypotheses).unwrap();
        assert_eq!(report.mask, vec![true, false], "strategy {optimizer:?}");
    }
}

#[test]
fn planes_are_verified_alongside_objects() {
    let model = box_model();
    let box_points = placed(&model, &box_pose());
    let back_wall = wall(0.2, -0.15, 1.0, 60, 60);
    let scene = scene_from(&[&box_points, &back_wall]);

    let hypotheses = vec![Hypothesis::from_model("box", box_pose(), &model)];
    let planes = vec![
        Hypothesis::planar("wall", back_wall.clone()),
        // a plane floating in front of everything
        Hypothesis::planar("ghost", wall(-0.4, -0.15, 0.5, 30, 30)),
    ];
    let mut verifier = HypothesisVerifier::new(GhvParams::default()).unwrap();
    let request = VerificationRequest::new(&scene, &hypotheses).with_planes(&planes);
    let report = verifier.verify_request(&request).unwrap();

    assert_eq!(report.mask, vec![true]);
    assert_eq!(report.plane_mask, vec![true, false]);
    assert_eq!(report.num_accepted(), 2);
    assert!(report.outliers_of(0, true).is_some());
    assert_eq!(report.components.len(), 3);
    assert_eq!(
        report.visible_points,
        model.len() + back_wall.len() + 30 * 30
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["planeMask"], serde_json::json!([true, false]));
    assert!(json["timings"]["stages"].as_array().unwrap().len() >= 4);
}

#[test]
fn scene_without_normals_gets_estimated_ones() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    let bare = SceneCloud::new(scene.points.clone());
    let mut verifier = HypothesisVerifier::new(GhvParams::default()).unwrap();
    let report = verifier.verify(&bare, &hypotheses).unwrap();
    assert_eq!(report.mask, vec![true, false]);

    let strict = GhvParams {
        requires_normals: true,
        ..Default::default()
    };
    let mut verifier = HypothesisVerifier::new(strict).unwrap();
    assert_eq!(
        verifier.verify(&bare, &hypotheses).unwrap_err(),
        ghv::VerifyError::MissingNormals
    );
}

#[test]
fn requiring_normals_applies_to_a_cached_scene() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    let bare = SceneCloud::new(scene.points.clone());
    let mut verifier = HypothesisVerifier::new(GhvParams::default()).unwrap();
    verifier.verify(&bare, &hypotheses).unwrap();

    verifier
        .set_params(GhvParams {
            requires_normals: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        verifier.verify(&bare, &hypotheses).unwrap_err(),
        ghv::VerifyError::MissingNormals
    );

    // the cached scene survives the rejected call
    verifier.set_params(GhvParams::default()).unwrap();
    let report = verifier.verify(&bare, &hypotheses).unwrap();
    assert_eq!(report.mask, vec![true, false]);
    assert_eq!(verifier.workspace().cache_hits(), 1);
}

#[test]
fn color_mismatch_prevents_explanation() {
    let model = box_model();
    let scene_points = colored(&placed(&model, &box_pose()), [200, 30, 30]);
    let scene = scene_from(&[&scene_points]);

    let red = Hypothesis::from_model("box", box_pose(), &colored(&model, [200, 30, 30]));
    let green = Hypothesis::from_model("box", box_pose(), &colored(&model, [30, 200, 30]));

    let mut verifier = HypothesisVerifier::new(GhvParams::default()).unwrap();
    let report = verifier.verify(&scene, &[red.clone(), green.clone()]).unwrap();
    assert_eq!(report.mask, vec![true, false]);

    let params = GhvParams {
        ignore_color: true,
        ..Default::default()
    };
    let mut verifier = HypothesisVerifier::new(params).unwrap();
    let report = verifier.verify(&scene, &[green]).unwrap();
    assert_eq!(report.mask, vec![true]);
}

#[test]
fn downsampled_scene_still_verifies() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    let params = GhvParams {
        downsample_scene: true,
        resolution: 0.01,
        ..Default::default()
    };
    let mut verifier = HypothesisVerifier::new(params).unwrap();
    let report = verifier.verify(&scene, &hypotheses).unwrap();
    assert!(report.scene_points < scene.len());
    assert_eq!(report.mask, vec![true, false]);
}

#[test]
fn tabu_search_with_a_single_stall_step_still_accepts_the_box() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    for optimizer in [OptimizerType::TabuSearch, OptimizerType::TabuSearchReplace] {
        let params = GhvParams {
            optimizer,
            tabu_stall_iterations: 1,
            ..Default::default()
        };
        let mut verifier = HypothesisVerifier::new(params).unwrap();
        let report = verifier.verify(&scene, &hypotheses).unwrap();
        assert_eq!(report.mask, vec![true, false], "strategy {optimizer:?}");
    }

    let disabled = GhvParams {
        optimizer: OptimizerType::TabuSearch,
        tabu_stall_iterations: 0,
        ..Default::default()
    };
    assert!(matches!(
        HypothesisVerifier::new(disabled),
        Err(ghv::VerifyError::InvalidParameter {
            name: "tabu_stall_iterations",
            ..
        })
    ));
}

#[test]
fn non_finite_points_and_normals_are_skipped() {
    let _ = env_logger::builder().is_test(true).try_init();
    let model = box_model();
    let box_points = placed(&model, &box_pose());
    let nan = Point3::new(f32::NAN, 0.0, 0.8);
    let broken_normal = SurfaceNormal::new(Vector3::repeat(f32::NAN), f32::NAN);

    let mut points: Vec<Point3<f32>> = box_points.iter().map(|p| p.position).collect();
    let mut normals: Vec<SurfaceNormal> = box_points.iter().filter_map(|p| p.normal).collect();
    normals[10] = broken_normal;
    normals[500] = broken_normal;
    for _ in 0..3 {
        points.push(nan);
        normals.push(broken_normal);
    }
    points.push(Point3::new(0.35, f32::INFINITY, 0.8));
    normals.push(broken_normal);
    let scene = SceneCloud::new(points).with_normals(normals);

    let with_garbage = |pose| {
        let mut h = Hypothesis::from_model("box", pose, &model);
        h.visible_points.insert(0, PointRecord::new(nan));
        h.visible_points
            .push(PointRecord::new(Point3::new(0.3, 0.0, f32::NEG_INFINITY)));
        h
    };
    let hypotheses = vec![with_garbage(box_pose()), with_garbage(misplaced_pose())];

    for optimizer in STRATEGIES {
        let params = GhvParams {
            optimizer,
            ..Default::default()
        };
        let mut verifier = HypothesisVerifier::new(params).unwrap();
        let report = verifier.verify(&scene, &hypotheses).unwrap();
        assert_eq!(report.mask, vec![true, false], "strategy {optimizer:?}");
        assert!(report.final_cost.is_finite());
        let outliers = report.outliers_of(0, false).unwrap();
        assert!(outliers.points.is_empty());
        assert!(report.components.iter().all(|c| c.final_cost.is_finite()));
    }
}

#[test]
fn empty_scene_rejects_everything_without_error() {
    let (_, hypotheses) = box_scene_with_hypotheses();
    let empty = SceneCloud::new(Vec::new());
    for initial_status in [false, true] {
        for optimizer in STRATEGIES {
            let params = GhvParams {
                optimizer,
                initial_status,
                ..Default::default()
            };
            let mut verifier = HypothesisVerifier::new(params).unwrap();
            let report = verifier.verify(&empty, &hypotheses).unwrap();
            assert_eq!(report.mask, vec![false, false], "strategy {optimizer:?}");
            assert_eq!(report.scene_points, 0);
            assert!(report.outliers.is_empty());
            assert!(report.components.iter().all(|c| c.scene_points == 0));
        }
    }
}

#[test]
fn cost_log_tracks_component_cost() {
    let (scene, hypotheses) = box_scene_with_hypotheses();
    let params = GhvParams {
        optimizer: OptimizerType::LocalSearch,
        record_cost_log: true,
        ..Default::default()
    };
    let mut verifier = HypothesisVerifier::new(params).unwrap();
    let report = verifier.verify(&scene, &hypotheses).unwrap();

    let last = report.cost_log.last().unwrap();
    assert_eq!(last.toggled, 0);
    let trace = &report.components[last.component];
    assert!((last.cost - trace.final_cost).abs() < 1e-9);
    assert!(report
        .cost_log
        .windows(2)
        .all(|w| w[1].cost < w[0].cost));
}
