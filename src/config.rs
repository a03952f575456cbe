//! JSON configuration loading.
//!
//! A parameter file is a JSON object with any subset of the [`GhvParams`]
//! fields; missing fields keep their defaults.
use crate::error::ConfigError;
use crate::verifier::GhvParams;
use std::fs;
use std::path::Path;

/// Load and validate parameters from a JSON file.
pub fn load_params(path: &Path) -> Result<GhvParams, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let params: GhvParams = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    params.validate()?;
    Ok(params)
}

/// Parse parameters from a JSON string without validation.
pub fn params_from_str(json: &str) -> Result<GhvParams, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::ExplainedAggregation;
    use crate::error::VerifyError;
    use crate::optimizer::OptimizerType;

    #[test]
    fn partial_json_keeps_defaults() {
        let params = params_from_str(
            r#"{
                "optimizer": "tabu_search_replace",
                "explained_aggregation": "capped_sum",
                "smooth_seg": { "min_points": 20 },
                "max_iterations": 100
            }"#,
        )
        .unwrap();
        assert_eq!(params.optimizer, OptimizerType::TabuSearchReplace);
        assert_eq!(params.explained_aggregation, ExplainedAggregation::CappedSum);
        assert_eq!(params.smooth_seg.min_points, 20);
        assert_eq!(params.smooth_seg.cluster_tolerance, 0.01);
        assert_eq!(params.max_iterations, 100);
        assert_eq!(params.inlier_threshold, GhvParams::default().inlier_threshold);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_params(Path::new("/nonexistent/ghv.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/ghv.json"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let path = std::env::temp_dir().join(format!("ghv-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "cooling_rate": 2.0 }"#).unwrap();
        let err = load_params(&path).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(matches!(err, ConfigError::Invalid(VerifyError::InvalidParameter { name: "cooling_rate", .. })));
    }
}
