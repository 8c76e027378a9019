//! Run reports returned by the pipeline drivers.
//!
//! `RunReport` is the entry point: it carries the grid region, hole
//! statistics, solver convergence data and a per-stage `TimingBreakdown`.
//! Binaries serialise it to JSON on request.

pub mod report;
pub mod timing;

pub use report::{PipelineKind, RunReport, SolveStats};
pub use timing::{StageTiming, TimingBreakdown};
