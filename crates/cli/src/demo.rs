//! The built-in demonstration workflow.

use engine::{Workflow, WorkflowBuilder};
use serde_json::{json, Value};
use tasks::{task_fn, TaskError};

/// Default input for the demo run.
pub const DEMO_INPUT: &str = r#"{"init":"hello world"}"#;

async fn copy_init(input: Value) -> Result<Value, TaskError> {
    input
        .get("init")
        .cloned()
        .ok_or_else(|| TaskError::failed("input has no 'init' field"))
}

async fn truncate(input: Value) -> Result<Value, TaskError> {
    let text = input
        .get("Task1")
        .and_then(Value::as_str)
        .ok_or_else(|| TaskError::failed("'Task1' is not a string"))?;
    Ok(json!(text.chars().take(10).collect::<String>()))
}

/// `Task1` copies `init`; `Task2` keeps the first ten characters of `Task1`.
pub fn demo_workflow() -> Workflow {
    WorkflowBuilder::new("demo")
        .run("Task1", task_fn(copy_init))
        .run("Task2", task_fn(truncate))
        .build()
}
