//! `FnTask` — adapts a plain async function or closure into an [`ExecutableTask`].

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ExecutableTask, TaskError};

/// A task backed by a function `Fn(Value) -> impl Future<Output = Result<Value, TaskError>>`.
pub struct FnTask<F> {
    f: F,
}

/// Wrap `f` so it can be handed to a workflow builder.
///
/// ```
/// use serde_json::{json, Value};
/// use tasks::{task_fn, ExecutableTask, TaskError};
///
/// async fn greet(input: Value) -> Result<Value, TaskError> {
///     Ok(json!(format!("hello {}", input["name"].as_str().unwrap_or("?"))))
/// }
///
/// let task = task_fn(greet);
/// # let _ = &task as &dyn ExecutableTask;
/// ```
pub fn task_fn<F, Fut>(f: F) -> FnTask<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    FnTask { f }
}

#[async_trait]
impl<F, Fut> ExecutableTask for FnTask<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        (self.f)(input).await
    }
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn double(input: Value) -> Result<Value, TaskError> {
        let n = input
            .as_i64()
            .ok_or_else(|| TaskError::failed("expected an integer"))?;
        Ok(json!(n * 2))
    }

    #[tokio::test]
    async fn async_fn_is_adapted() {
        let task = task_fn(double);
        assert_eq!(task.execute(json!(21)).await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn errors_from_the_function_are_returned() {
        let task = task_fn(double);
        let err = task.execute(json!("nope")).await.unwrap_err();
        assert!(matches!(err, TaskError::Failed(msg) if msg == "expected an integer"));
    }

    #[tokio::test]
    async fn closures_capture_their_environment() {
        let suffix = String::from("!");
        let task = task_fn(move |input: Value| {
            let suffix = suffix.clone();
            async move {
                let text = input.as_str().unwrap_or_default().to_owned();
                Ok::<_, TaskError>(json!(text + &suffix))
            }
        });
        assert_eq!(task.execute(json!("hey")).await.unwrap(), json!("hey!"));
    }
}
