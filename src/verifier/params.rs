//! Flattened verifier configuration.
//!
//! All knobs live in one value type so that a single JSON document (see
//! [`crate::config`]) can describe a verification run. Missing fields fall back
//! to [`GhvParams::default`]. Distances are in metres, angles in degrees unless
//! the name says otherwise.
//!
//! Tuning notes
//! - `inlier_threshold` should be about three times the scene resolution.
//! - `regularizer` and `clutter_regularizer` trade recall for precision; raise
//!   them when duplicated or floating hypotheses slip through.
//! - `max_iterations` bounds every search strategy and is the only latency knob.

use crate::color::{ColorSpace, ColorTolerance};
use crate::cost::ExplainedAggregation;
use crate::error::VerifyError;
use crate::optimizer::OptimizerType;
use crate::segmentation::SmoothSegParams;
use serde::{Deserialize, Serialize};

/// Parameters of the hypothesis verifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhvParams {
    // --- scene preparation ---
    /// Voxel size used when `downsample_scene` is set.
    pub resolution: f32,
    /// Uniformly sample the scene before verification.
    pub downsample_scene: bool,
    /// Fail when the scene comes without normals instead of estimating them.
    pub requires_normals: bool,
    /// Neighbourhood radius for PCA normal estimation.
    pub normal_radius: f32,
    /// Smooth region growing used by the duplicity and clutter terms.
    pub smooth_seg: SmoothSegParams,

    // --- explanation ---
    /// Maximum model-to-scene distance for a scene point to be explained.
    pub inlier_threshold: f32,
    /// Skip the color gate even when both clouds carry colors.
    pub ignore_color: bool,
    pub color_space: ColorSpace,
    /// Allowed luminance difference (normalized units).
    pub color_sigma_l: f32,
    /// Allowed chrominance difference (normalized units).
    pub color_sigma_ab: f32,
    /// Share of the explained score driven by color similarity, in `[0, 1]`.
    pub best_color_weight: f32,
    /// Model normals turned away from the camera by more than this are noisy.
    pub max_view_angle_deg: f32,
    /// Multiplier for scores and outliers of points with a bad normal.
    pub bad_normal_weight: f32,
    /// Outliers on model points with a larger curvature are down-weighted.
    pub outlier_curvature_threshold: f32,
    pub curved_outlier_weight: f32,

    // --- cost ---
    pub regularizer: f64,
    pub clutter_regularizer: f64,
    pub radius_neighborhood_clutter: f32,
    pub detect_clutter: bool,
    pub duplicity_weight: f64,
    /// Curvature at which duplication inside a smooth segment costs the full weight.
    pub duplicity_curvature_max: f32,
    /// Fraction of the duplicity weight paid on flat points of a smooth segment.
    pub smooth_duplicity_factor: f64,
    /// Count a multiply explained point once instead of `count - 1` times.
    pub penalize_duplicates_once: bool,
    pub explained_aggregation: ExplainedAggregation,
    pub active_hypothesis_penalty: f64,
    /// Weight of the same-model occupancy conflict term.
    pub cm_duplicity_weight: f64,
    pub occupancy_resolution: f32,

    // --- optimization ---
    pub optimizer: OptimizerType,
    pub max_iterations: usize,
    pub use_replace_moves: bool,
    /// Activation every hypothesis starts from.
    pub initial_status: bool,
    pub tabu_tenure: usize,
    /// Tabu search stops after this many iterations without a new best.
    pub tabu_stall_iterations: usize,
    pub initial_temperature: f64,
    /// Geometric cooling factor in `(0, 1)`.
    pub cooling_rate: f64,
    /// Seed for simulated annealing; component `i` uses `seed + i`.
    pub seed: u64,
    /// Record every accepted move in the report.
    pub record_cost_log: bool,
}

impl Default for GhvParams {
    fn default() -> Self {
        Self {
            resolution: 0.005,
            downsample_scene: false,
            requires_normals: false,
            normal_radius: 0.02,
            smooth_seg: SmoothSegParams::default(),
            inlier_threshold: 0.015,
            ignore_color: false,
            color_space: ColorSpace::Lab,
            color_sigma_l: 0.6,
            color_sigma_ab: 0.6,
            best_color_weight: 0.8,
            max_view_angle_deg: 80.0,
            bad_normal_weight: 0.1,
            outlier_curvature_threshold: 0.04,
            curved_outlier_weight: 0.5,
            regularizer: 1.0,
            clutter_regularizer: 1.0,
            radius_neighborhood_clutter: 0.03,
            detect_clutter: true,
            duplicity_weight: 1.0,
            duplicity_curvature_max: 0.03,
            smooth_duplicity_factor: 0.5,
            penalize_duplicates_once: true,
            explained_aggregation: ExplainedAggregation::Best,
            active_hypothesis_penalty: 0.0,
            cm_duplicity_weight: 2.0,
            occupancy_resolution: 0.005,
            optimizer: OptimizerType::LocalSearch,
            max_iterations: 5000,
            use_replace_moves: true,
            initial_status: false,
            tabu_tenure: 5,
            tabu_stall_iterations: 200,
            initial_temperature: 1000.0,
            cooling_rate: 0.99,
            seed: 0,
            record_cost_log: false,
        }
    }
}

impl GhvParams {
    /// Reject values that would make the cost ill-defined.
    pub fn validate(&self) -> Result<(), VerifyError> {
        positive("inlier_threshold", self.inlier_threshold as f64)?;
        positive("occupancy_resolution", self.occupancy_resolution as f64)?;
        positive("normal_radius", self.normal_radius as f64)?;
        positive("color_sigma_l", self.color_sigma_l as f64)?;
        positive("color_sigma_ab", self.color_sigma_ab as f64)?;
        if self.downsample_scene {
            positive("resolution", self.resolution as f64)?;
        }
        non_negative("radius_neighborhood_clutter", self.radius_neighborhood_clutter as f64)?;
        non_negative("regularizer", self.regularizer)?;
        non_negative("clutter_regularizer", self.clutter_regularizer)?;
        non_negative("duplicity_weight", self.duplicity_weight)?;
        non_negative("cm_duplicity_weight", self.cm_duplicity_weight)?;
        non_negative("bad_normal_weight", self.bad_normal_weight as f64)?;
        non_negative("curved_outlier_weight", self.curved_outlier_weight as f64)?;
        if !self.active_hypothesis_penalty.is_finite() {
            return Err(VerifyError::invalid(
                "active_hypothesis_penalty",
                "must be finite",
            ));
        }
        unit_interval("best_color_weight", self.best_color_weight as f64)?;
        unit_interval("smooth_duplicity_factor", self.smooth_duplicity_factor)?;
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(VerifyError::invalid(
                "cooling_rate",
                format!("expected a value in (0, 1), got {}", self.cooling_rate),
            ));
        }
        positive("initial_temperature", self.initial_temperature)?;
        at_least_one("max_iterations", self.max_iterations)?;
        at_least_one("tabu_stall_iterations", self.tabu_stall_iterations)?;
        Ok(())
    }

    pub fn color_tolerance(&self) -> ColorTolerance {
        ColorTolerance {
            sigma_l: self.color_sigma_l,
            sigma_ab: self.color_sigma_ab,
        }
    }
}

fn positive(name: &'static str, v: f64) -> Result<(), VerifyError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(VerifyError::invalid(name, format!("must be positive, got {v}")))
    }
}

fn non_negative(name: &'static str, v: f64) -> Result<(), VerifyError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(VerifyError::invalid(
            name,
            format!("must be non-negative, got {v}"),
        ))
    }
}

/// Iteration limits of zero would return the initial state untouched.
fn at_least_one(name: &'static str, v: usize) -> Result<(), VerifyError> {
    if v >= 1 {
        Ok(())
    } else {
        Err(VerifyError::invalid(name, "must be at least 1"))
    }
}

fn unit_interval(name: &'static str, v: f64) -> Result<(), VerifyError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(VerifyError::invalid(
            name,
            format!("expected a value in [0, 1], got {v}"),
        ))
    }
}
