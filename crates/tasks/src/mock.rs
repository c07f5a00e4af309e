//! `MockTask` — a test double for `ExecutableTask`.
//!
//! Useful in unit and integration tests where the real unit of work is
//! either unavailable or irrelevant. Clones share the same call log, so a
//! test can keep one handle while the workflow owns another.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::{ExecutableTask, TaskError};

/// Behaviour injected into `MockTask` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Return a specific JSON value on every call.
    ReturnValue(Value),
    /// Return the values in order, one per call; the last value repeats
    /// once the list is exhausted.
    Sequence(Vec<Value>),
    /// Return the input unchanged.
    Echo,
    /// Fail with [`TaskError::Failed`].
    Fail(String),
}

/// A mock task that records every input it receives and returns a
/// programmer-specified result.
#[derive(Debug, Clone)]
pub struct MockTask {
    /// Label used in test assertions.
    pub name: String,
    /// What the task will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All inputs seen by this task (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockTask {
    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that returns `values` one call at a time.
    pub fn sequence(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Sequence(values))
    }

    /// Create a mock that hands its input straight back.
    pub fn echoing(name: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Echo)
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::Fail(msg.into()))
    }

    /// Number of times this task has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Snapshot of every input received so far.
    pub fn inputs(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutableTask for MockTask {
    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input.clone());
            calls.len() - 1
        };

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(v.clone()),
            MockBehaviour::Sequence(values) => Ok(values
                .get(call_index)
                .or_else(|| values.last())
                .cloned()
                .unwrap_or(Value::Null)),
            MockBehaviour::Echo => Ok(input),
            MockBehaviour::Fail(msg) => Err(TaskError::Failed(msg.clone())),
        }
    }
}
