//! Core definition model for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory. A [`Workflow`] is only ever produced by the builder and is
//! read-only afterwards; clones share the same runnable list.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tasks::ExecutableTask;

// ---------------------------------------------------------------------------
// Result set and function shapes
// ---------------------------------------------------------------------------

/// The keyed record accumulated during one run: the initial input's fields
/// plus one entry per executed runnable id.
pub type ResultSet = Map<String, Value>;

/// Predicate over the accumulated result set (gating and repeat conditions).
pub type ConditionFn = Arc<dyn Fn(&ResultSet) -> bool + Send + Sync>;

/// Derives a runnable's input from the accumulated result set.
pub type InputFn = Arc<dyn Fn(&ResultSet) -> Value + Send + Sync>;

// ---------------------------------------------------------------------------
// Runnable
// ---------------------------------------------------------------------------

/// What a runnable executes.
#[derive(Clone)]
pub enum RunnableKind {
    /// A unit of work; its output is stored under the runnable's id.
    Task(Arc<dyn ExecutableTask>),
    /// A nested workflow; its whole final result set is stored under the
    /// runnable's id.
    Workflow(Arc<Workflow>),
}

impl RunnableKind {
    /// Short label used in logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Workflow(_) => "workflow",
        }
    }
}

impl fmt::Debug for RunnableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(_) => f.write_str("Task"),
            Self::Workflow(workflow) => f.debug_tuple("Workflow").field(&workflow.name).finish(),
        }
    }
}

/// A single step in a workflow's ordered sequence.
#[derive(Clone)]
pub struct Runnable {
    /// Key of the result entry this runnable writes.
    pub id: String,
    pub kind: RunnableKind,
    /// When present and false, the runnable is skipped for this pass.
    pub condition: Option<ConditionFn>,
    /// Derives the input; absent means the whole result set is passed.
    pub input: Option<InputFn>,
    /// Checked after each execution; while true the runnable runs again.
    pub repeat_condition: Option<ConditionFn>,
    /// Re-derives the input for repeated executions only.
    pub repeat_input: Option<InputFn>,
}

impl fmt::Debug for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runnable")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("has_condition", &self.condition.is_some())
            .field("has_input", &self.input.is_some())
            .field("has_repeat_condition", &self.repeat_condition.is_some())
            .field("has_repeat_input", &self.repeat_input.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Result shape
// ---------------------------------------------------------------------------

/// One key a workflow's result set will (or may) contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultKey {
    pub id: String,
    /// True when every runnable writing this key is gated by a condition.
    pub optional: bool,
    /// Shape of the nested workflow's result when the key holds one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<ResultShape>,
}

/// The keys runnables contribute to a workflow's result set, in the order
/// they are first declared. Initial-input fields are not part of the shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultShape {
    keys: Vec<ResultKey>,
}

impl ResultShape {
    pub fn keys(&self) -> &[ResultKey] {
        &self.keys
    }

    pub fn get(&self, id: &str) -> Option<&ResultKey> {
        self.keys.iter().find(|key| key.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// True when a completed run always carries `id`.
    pub fn is_guaranteed(&self, id: &str) -> bool {
        self.get(id).is_some_and(|key| !key.optional)
    }

    /// Add `key`, merging with an existing entry of the same id.
    ///
    /// Returns `true` when the id was already present. A merged key stays
    /// guaranteed if either writer is unconditional.
    pub(crate) fn insert(&mut self, key: ResultKey) -> bool {
        match self.keys.iter_mut().find(|existing| existing.id == key.id) {
            Some(existing) => {
                existing.optional = existing.optional && key.optional;
                existing.nested = key.nested;
                true
            }
            None => {
                self.keys.push(key);
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Name and optional version a workflow is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowParams {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl WorkflowParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A complete, immutable workflow definition.
#[derive(Clone)]
pub struct Workflow {
    name: String,
    version: Option<String>,
    runnables: Arc<[Runnable]>,
    repeat_condition: Option<ConditionFn>,
    shape: ResultShape,
}

impl Workflow {
    pub(crate) fn new(
        params: WorkflowParams,
        runnables: Vec<Runnable>,
        repeat_condition: Option<ConditionFn>,
        shape: ResultShape,
    ) -> Self {
        Self {
            name: params.name,
            version: params.version,
            runnables: runnables.into(),
            repeat_condition,
            shape,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Runnables in execution order.
    pub fn runnables(&self) -> &[Runnable] {
        &self.runnables
    }

    /// Evaluated after each full pass; while true the sequence re-runs from
    /// the initial input.
    pub fn repeat_condition(&self) -> Option<&ConditionFn> {
        self.repeat_condition.as_ref()
    }

    pub fn shape(&self) -> &ResultShape {
        &self.shape
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("runnables", &self.runnables)
            .field("has_repeat_condition", &self.repeat_condition.is_some())
            .finish()
    }
}
