//! Engine-level error types.

use tasks::TaskError;
use thiserror::Error;

/// Errors produced by the workflow engine (execution + result retrieval).
///
/// Builder protocol violations have no variant here: an illegal directive
/// sequence is rejected at compile time by the builder's phase types.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Execution errors ------

    /// Reserved for runnable kinds added later. The current kinds are
    /// matched exhaustively by the runner, which never returns this today.
    #[error("workflow '{workflow}': runnable '{runnable_id}' has unsupported kind '{kind}'")]
    UnsupportedRunnableKind {
        workflow: String,
        runnable_id: String,
        kind: String,
    },

    /// A task's unit of work failed; the whole run is aborted.
    #[error("workflow '{workflow}': task '{runnable_id}' failed: {source}")]
    TaskFailure {
        workflow: String,
        runnable_id: String,
        source: TaskError,
    },

    /// The input handed to a workflow is neither an object nor null.
    #[error("workflow '{workflow}' expects a record as input, got {found}")]
    InputNotRecord {
        workflow: String,
        found: &'static str,
    },

    /// A repeating runnable hit the configured iteration cap.
    #[error("workflow '{workflow}': runnable '{runnable_id}' exceeded {limit} repeat iterations")]
    RepeatLimitExceeded {
        workflow: String,
        runnable_id: String,
        limit: u32,
    },

    /// A repeating workflow hit the configured pass cap.
    #[error("workflow '{workflow}' exceeded {limit} passes")]
    PassLimitExceeded { workflow: String, limit: u32 },

    // ------ Result retrieval errors ------

    /// `get_result` was called before any run completed.
    #[error("no run has completed yet")]
    NoRunYet,

    /// `get_result` was called with an id other than the latest run's.
    #[error("run id '{requested}' is stale; the latest run is '{latest}'")]
    StaleRunId { requested: String, latest: String },
}
