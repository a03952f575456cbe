#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;
pub mod verifier;

// Stage modules – public for tools and tests, considered unstable internals.
pub mod color;
pub mod conflict;
pub mod cost;
pub mod model;
pub mod normals;
pub mod optimizer;
pub mod scene;
pub mod segmentation;
pub mod spatial;

// --- High-level re-exports -------------------------------------------------

// Main entry points: verifier + parameters + inputs.
pub use crate::verifier::{GhvParams, HypothesisVerifier, VerificationRequest, VerifierWorkspace};
pub use crate::types::{Hypothesis, HypothesisKind, PointRecord, SceneCloud, SurfaceNormal};

// Results and errors.
pub use crate::diagnostics::{ComponentTrace, CostLogEntry, VerificationReport};
pub use crate::error::{ConfigError, VerifyError};

// Knobs that appear in parameter files.
pub use crate::color::ColorSpace;
pub use crate::cost::ExplainedAggregation;
pub use crate::optimizer::OptimizerType;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use ghv::prelude::*;
/// use nalgebra::{Isometry3, Point3};
///
/// # fn main() -> Result<(), VerifyError> {
/// let points: Vec<Point3<f32>> = (0..100)
///     .map(|i| Point3::new((i % 10) as f32 * 0.005, (i / 10) as f32 * 0.005, 0.8))
///     .collect();
/// let scene = SceneCloud::new(points.clone());
/// let hypothesis = Hypothesis::new(
///     "patch",
///     Isometry3::identity(),
///     points.into_iter().map(PointRecord::new).collect(),
/// );
///
/// let mut verifier = HypothesisVerifier::new(GhvParams::default())?;
/// let report = verifier.verify(&scene, &[hypothesis])?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        GhvParams, Hypothesis, HypothesisVerifier, OptimizerType, PointRecord, SceneCloud,
        SurfaceNormal, VerificationReport, VerifyError,
    };
}
