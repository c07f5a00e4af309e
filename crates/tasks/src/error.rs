//! Task-level error type.

use thiserror::Error;

/// Errors returned by a task's `execute` method.
///
/// There is no retry policy: whichever variant is returned, the engine
/// aborts the enclosing run immediately.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task rejected its input or could not finish its work.
    #[error("task failed: {0}")]
    Failed(String),

    /// Any other error bubbled up from inside the task body.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskError {
    /// Shorthand for [`TaskError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_message_is_displayed() {
        let err = TaskError::failed("bad input");
        assert_eq!(err.to_string(), "task failed: bad input");
    }

    #[test]
    fn anyhow_errors_are_transparent() {
        let err: TaskError = anyhow::anyhow!("socket closed").into();
        assert!(matches!(err, TaskError::Other(_)));
        assert_eq!(err.to_string(), "socket closed");
    }
}
