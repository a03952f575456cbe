//! Reusable verifier state across calls.
//!
//! Preparing the scene (sampling, normals, color conversion, smooth
//! segmentation, R*-tree) dominates the cost of small verification calls.
//! The workspace keeps the last prepared scene and reuses it when the next
//! call passes the same cloud with the same scene-related parameters.
use crate::error::VerifyError;
use crate::scene::{scene_fingerprint, validate_scene, SceneModel};
use crate::types::SceneCloud;
use crate::verifier::GhvParams;
use log::debug;

struct CachedScene {
    fingerprint: u64,
    scene: SceneModel,
}

/// Workspace caching the prepared scene of the previous call.
#[derive(Default)]
pub struct VerifierWorkspace {
    cached: Option<CachedScene>,
    hits: usize,
    misses: usize,
}

impl VerifierWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached scene.
    pub fn reset(&mut self) {
        self.cached = None;
    }

    /// Prepared scene for `cloud`, computed on demand.
    ///
    /// Preconditions are checked on every call, cached or not. A failed
    /// preparation leaves the previous cache entry in place.
    pub fn scene(&mut self, cloud: &SceneCloud, params: &GhvParams) -> Result<&SceneModel, VerifyError> {
        validate_scene(cloud, params)?;
        let fingerprint = scene_fingerprint(cloud, params);
        let cached = match self.cached.take() {
            Some(cached) if cached.fingerprint == fingerprint => {
                self.hits += 1;
                debug!("VerifierWorkspace reusing prepared scene ({} points)", cached.scene.len());
                cached
            }
            previous => match SceneModel::prepare(cloud, params) {
                Ok(scene) => {
                    self.misses += 1;
                    CachedScene { fingerprint, scene }
                }
                Err(err) => {
                    self.cached = previous;
                    return Err(err);
                }
            },
        };
        Ok(&self.cached.insert(cached).scene)
    }

    pub fn cache_hits(&self) -> usize {
        self.hits
    }

    pub fn cache_misses(&self) -> usize {
        self.misses
    }
}
