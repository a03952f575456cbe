//! Global hypothesis verification.
//!
//! Overview
//! - Prepares the scene once (optional sampling, normals, color conversion,
//!   smooth segmentation) and caches it in a [`VerifierWorkspace`].
//! - Builds one recognition model per hypothesis: explained scene points
//!   with scores, clutter neighbourhood, outliers and occupancy cells.
//! - Splits the hypotheses into independent conflict components.
//! - Optimizes every component with the configured search strategy and
//!   merges the per-component best states into one mask.
//!
//! Modules
//! - [`params`] – the flattened [`GhvParams`].
//! - `pipeline` – [`HypothesisVerifier`] and [`VerificationRequest`].
//! - `workspace` – prepared-scene cache reused across calls.

pub mod params;
mod pipeline;
mod workspace;

pub use params::GhvParams;
pub use pipeline::{HypothesisVerifier, VerificationRequest};
pub use workspace::VerifierWorkspace;
