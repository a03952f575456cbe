use serde::{Deserialize, Serialize};
use std::time::Instant;

fn ms_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Wall time of one verifier stage (`scene`, `models`, `conflicts`, `optimize`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

/// Stage timings of one verification call, in execution order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming {
            label: label.into(),
            elapsed_ms,
        });
    }

    /// Record the time elapsed since `start` under `label`.
    pub fn push_since(&mut self, label: impl Into<String>, start: Instant) {
        self.push(label, ms_since(start));
    }

    /// Close the breakdown with the total time since `start`.
    pub fn finish(&mut self, start: Instant) {
        self.total_ms = ms_since(start);
    }

    pub fn stage_ms(&self, label: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.elapsed_ms)
    }

    /// Time not attributed to any stage (merging, bookkeeping).
    pub fn unattributed_ms(&self) -> f64 {
        let staged: f64 = self.stages.iter().map(|s| s.elapsed_ms).sum();
        (self.total_ms - staged).max(0.0)
    }
}
