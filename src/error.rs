use std::path::PathBuf;
use thiserror::Error;

/// Precondition violations reported by the verifier.
///
/// Degenerate input (no hypotheses, empty scene) is not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    #[error("scene normals are required but were not provided")]
    MissingNormals,
    #[error("mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    LengthMismatch {
        left_name: &'static str,
        left_len: usize,
        right_name: &'static str,
        right_len: usize,
    },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl VerifyError {
    pub(crate) fn length_mismatch(
        left_name: &'static str,
        left_len: usize,
        right_name: &'static str,
        right_len: usize,
    ) -> Self {
        Self::LengthMismatch {
            left_name,
            left_len,
            right_name,
            right_len,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading a parameter file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Invalid(#[from] VerifyError),
}
