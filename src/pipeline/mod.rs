//! Analysis Pipeline
//!
//! The resumable core of an analysis run:
//!
//! - [`controller`]: plans page ranges, resumes or resets, writes the final summary
//! - [`processor`]: the per-page loop with interval summaries and checkpoints
//! - [`state`]: the [`RunState`] value threaded through both
//! - [`progress`]: non-blocking progress and log reporting
//! - [`cancel`]: the cooperative stop flag

pub mod cancel;
pub mod controller;
pub mod processor;
pub mod progress;
pub mod state;

pub use cancel::CancelToken;
pub use controller::{plan_ranges, RunController, RunOutcome};
pub use processor::{is_interval_boundary, Pipeline, RangeOutcome, RangeProcessor, RangeStatus};
pub use progress::{ProgressReceivers, Reporter, CHANNEL_CAPACITY};
pub use state::RunState;
