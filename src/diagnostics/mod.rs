//! Diagnostics returned by the verifier.
//!
//! [`VerificationReport`] is the main entry point: the accept/reject masks,
//! outlier clouds of accepted hypotheses, one [`ComponentTrace`] per conflict
//! component, the optional cost log and a [`TimingBreakdown`].

pub mod cost_log;
pub mod report;
pub mod timing;

pub use cost_log::{CostLog, CostLogEntry};
pub use report::{ComponentTrace, HypothesisOutliers, VerificationReport};
pub use timing::{StageTiming, TimingBreakdown};
