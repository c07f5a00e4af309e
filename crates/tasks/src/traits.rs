//! The `ExecutableTask` trait — the contract every unit of work must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::TaskError;

/// The core unit-of-work trait.
///
/// A task only ever sees the `input` it is handed: the accumulated result
/// set of the run, or whatever the runnable's input function derived from
/// it. Its output is written back under the runnable's id.
#[async_trait]
pub trait ExecutableTask: Send + Sync {
    /// Execute the task against `input` and return its output.
    async fn execute(&self, input: Value) -> Result<Value, TaskError>;
}

#[async_trait]
impl<T> ExecutableTask for std::sync::Arc<T>
where
    T: ExecutableTask + ?Sized,
{
    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        (**self).execute(input).await
    }
}
