//! Workflow execution engine.
//!
//! `InMemoryWorkflowRunner` executes a [`Workflow`] against an initial input:
//! 1. Seeds the accumulated result set with the initial input's fields.
//! 2. Runs every runnable in order, skipping those whose gating condition is
//!    false and re-executing those whose repeat condition holds.
//! 3. Stores each output under the runnable's id; a nested workflow runs on
//!    a fresh runner and its whole result set is stored.
//! 4. Re-runs the sequence from the initial input while the workflow's
//!    repeat condition holds for the pass just completed.
//! 5. Retains the final result set under a new run id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::models::{ResultSet, Runnable, RunnableKind, Workflow};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the runner. Both caps default to unbounded.
///
/// Caps only bound repeats: the first execution of a runnable and the first
/// pass of a workflow always happen, so `Some(0)` behaves like `Some(1)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum executions of a single runnable within one pass.
    pub max_repeat_iterations: Option<u32>,
    /// Maximum passes over a workflow's sequence.
    pub max_workflow_passes: Option<u32>,
}

// ---------------------------------------------------------------------------
// Retained result
// ---------------------------------------------------------------------------

/// The single run result a runner keeps.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: String,
    pub result: ResultSet,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Runner contract
// ---------------------------------------------------------------------------

/// Executes workflows and hands back their accumulated results.
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    /// Run `workflow` to completion and return the id of the retained result.
    ///
    /// # Errors
    /// Any task failure or configured limit aborts the run; nothing is
    /// retained in that case.
    async fn run(&self, workflow: &Workflow, initial_input: Value) -> Result<String, EngineError>;

    /// Fetch the result of the latest run.
    ///
    /// # Errors
    /// - [`EngineError::NoRunYet`] if no run has completed.
    /// - [`EngineError::StaleRunId`] if `run_id` is not the latest run's id.
    fn get_result(&self, run_id: &str) -> Result<ResultSet, EngineError>;
}

// ---------------------------------------------------------------------------
// InMemoryWorkflowRunner
// ---------------------------------------------------------------------------

/// Runs workflows in-process, one runnable at a time.
///
/// Only the latest completed run is retained. Concurrent runs on one
/// instance are allowed, but whichever finishes last owns the slot; use one
/// runner per run when every result must stay retrievable.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowRunner {
    config: RunnerConfig,
    next_run: AtomicU64,
    latest: Mutex<Option<RunRecord>>,
}

impl InMemoryWorkflowRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// The retained run, if any.
    pub fn latest_run(&self) -> Option<RunRecord> {
        self.lock_latest().clone()
    }

    fn lock_latest(&self) -> MutexGuard<'_, Option<RunRecord>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Outer loop: one or more full passes over the sequence.
    async fn execute(
        &self,
        workflow: &Workflow,
        initial_input: Value,
    ) -> Result<ResultSet, EngineError> {
        let initial = seed_result_set(workflow, initial_input)?;
        let mut pass = 0u32;

        loop {
            pass += 1;
            let mut results = initial.clone();
            for runnable in workflow.runnables() {
                self.execute_runnable(workflow, runnable, &mut results).await?;
            }

            match workflow.repeat_condition() {
                Some(repeat) if repeat(&results) => {
                    // The first pass always runs; the cap only bounds repeats.
                    if let Some(limit) = self.config.max_workflow_passes.map(|n| n.max(1)) {
                        if pass >= limit {
                            return Err(EngineError::PassLimitExceeded {
                                workflow: workflow.name().to_owned(),
                                limit,
                            });
                        }
                    }
                    debug!(workflow = %workflow.name(), pass, "repeating workflow from its initial input");
                }
                _ => return Ok(results),
            }
        }
    }

    /// Gate, derive the input, then execute once plus any repeats.
    async fn execute_runnable(
        &self,
        workflow: &Workflow,
        runnable: &Runnable,
        results: &mut ResultSet,
    ) -> Result<(), EngineError> {
        if let Some(condition) = &runnable.condition {
            if !condition(results) {
                debug!(runnable = %runnable.id, "runnable skipped by condition");
                return Ok(());
            }
        }

        let mut input = match &runnable.input {
            Some(derive) => derive(results),
            None => Value::Object(results.clone()),
        };
        let mut iteration = 0u32;

        loop {
            iteration += 1;
            debug!(
                runnable = %runnable.id,
                kind = runnable.kind.label(),
                iteration,
                "executing runnable"
            );

            let output = match &runnable.kind {
                RunnableKind::Task(task) => {
                    task.execute(input.clone())
                        .await
                        .map_err(|source| EngineError::TaskFailure {
                            workflow: workflow.name().to_owned(),
                            runnable_id: runnable.id.clone(),
                            source,
                        })?
                }
                RunnableKind::Workflow(nested) => self.run_nested(nested, input.clone()).await?,
            };
            results.insert(runnable.id.clone(), output);

            let Some(repeat) = &runnable.repeat_condition else {
                return Ok(());
            };
            if !repeat(results) {
                return Ok(());
            }
            if let Some(limit) = self.config.max_repeat_iterations.map(|n| n.max(1)) {
                if iteration >= limit {
                    return Err(EngineError::RepeatLimitExceeded {
                        workflow: workflow.name().to_owned(),
                        runnable_id: runnable.id.clone(),
                        limit,
                    });
                }
            }
            if let Some(derive) = &runnable.repeat_input {
                input = derive(results);
            }
        }
    }

    /// Run `nested` on an independent runner and return its whole result set.
    async fn run_nested(&self, nested: &Workflow, input: Value) -> Result<Value, EngineError> {
        let child = InMemoryWorkflowRunner::with_config(self.config.clone());
        let run_id = child.run(nested, input).await?;
        let result = child.get_result(&run_id)?;
        Ok(Value::Object(result))
    }
}

#[async_trait]
impl WorkflowRunner for InMemoryWorkflowRunner {
    #[instrument(skip(self, workflow, initial_input), fields(workflow = %workflow.name()))]
    async fn run(&self, workflow: &Workflow, initial_input: Value) -> Result<String, EngineError> {
        let result = self.execute(workflow, initial_input).await?;

        let id = self.next_run.fetch_add(1, Ordering::SeqCst).to_string();
        info!(run_id = %id, entries = result.len(), "workflow run completed");

        *self.lock_latest() = Some(RunRecord {
            id: id.clone(),
            result,
            completed_at: Utc::now(),
        });
        Ok(id)
    }

    fn get_result(&self, run_id: &str) -> Result<ResultSet, EngineError> {
        let latest = self.lock_latest();
        let record = latest.as_ref().ok_or(EngineError::NoRunYet)?;
        if record.id != run_id {
            return Err(EngineError::StaleRunId {
                requested: run_id.to_owned(),
                latest: record.id.clone(),
            });
        }
        Ok(record.result.clone())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The initial input is merged into the accumulator, not nested under a key.
fn seed_result_set(workflow: &Workflow, input: Value) -> Result<ResultSet, EngineError> {
    match input {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(ResultSet::new()),
        other => Err(EngineError::InputNotRecord {
            workflow: workflow.name().to_owned(),
            found: value_kind(&other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
