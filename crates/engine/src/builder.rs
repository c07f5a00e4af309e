//! Staged workflow construction.
//!
//! The builder is a type-state protocol. Each phase is its own type and only
//! exposes the directives legal in that phase, so an illegal call sequence
//! does not compile:
//!
//! | after                     | type                                      |
//! |---------------------------|-------------------------------------------|
//! | `new` / `create`          | [`WorkflowBuilder`]                       |
//! | `next_when`, `next_input` | [`WorkflowBuilderWithRunOnly`]            |
//! | `run`, `run_workflow`     | [`WorkflowBuilderWithPreviousRunnable`]   |
//! | `repeat_all`              | [`WorkflowBuilderBuildOnly`]              |
//!
//! Every directive consumes the builder and returns the next phase. Builders
//! are `Clone`, so a partially built sequence can be branched; branches and
//! previously built workflows never observe each other's changes.
//!
//! ```
//! use engine::builder::WorkflowBuilder;
//! use serde_json::json;
//! use tasks::mock::MockTask;
//!
//! let workflow = WorkflowBuilder::new("pipeline")
//!     .run("fetch", MockTask::returning("fetch", json!([1, 2, 3])))
//!     .next_when(|results| results.contains_key("fetch"))
//!     .next_input(|results| results["fetch"].clone())
//!     .run("count", MockTask::returning("count", json!(3)))
//!     .build();
//!
//! assert_eq!(workflow.runnables().len(), 2);
//! assert!(workflow.shape().is_guaranteed("fetch"));
//! assert!(!workflow.shape().is_guaranteed("count"));
//! ```
//!
//! A repeat can only be attached right after the runnable it applies to:
//!
//! ```compile_fail
//! use engine::builder::WorkflowBuilder;
//!
//! let _ = WorkflowBuilder::new("empty").repeat_previous_while(|_| true);
//! ```
//!
//! ```compile_fail
//! use engine::builder::WorkflowBuilder;
//! use serde_json::json;
//! use tasks::mock::MockTask;
//!
//! let _ = WorkflowBuilder::new("w")
//!     .run("a", MockTask::returning("a", json!(1)))
//!     .next_when(|_| true)
//!     .repeat_previous_while(|_| true);
//! ```
//!
//! A staged condition must be consumed by a runnable before building:
//!
//! ```compile_fail
//! use engine::builder::WorkflowBuilder;
//!
//! let _ = WorkflowBuilder::new("w").next_when(|_| true).build();
//! ```
//!
//! Once something is staged, only an input function may still be added;
//! a runnable cannot be gated twice:
//!
//! ```compile_fail
//! use engine::builder::WorkflowBuilder;
//! use serde_json::json;
//! use tasks::mock::MockTask;
//!
//! let _ = WorkflowBuilder::new("w")
//!     .next_when(|_| true)
//!     .next_when(|_| false)
//!     .run("a", MockTask::returning("a", json!(1)));
//! ```
//!
//! ```compile_fail
//! use engine::builder::WorkflowBuilder;
//! use serde_json::json;
//! use tasks::mock::MockTask;
//!
//! let _ = WorkflowBuilder::new("w")
//!     .next_input(|_| json!({}))
//!     .next_when(|_| false)
//!     .run("a", MockTask::returning("a", json!(1)));
//! ```
//!
//! The legal order stages the condition first:
//!
//! ```
//! use engine::builder::WorkflowBuilder;
//! use serde_json::json;
//! use tasks::mock::MockTask;
//!
//! let workflow = WorkflowBuilder::new("w")
//!     .next_when(|_| false)
//!     .next_input(|_| json!({}))
//!     .run("a", MockTask::returning("a", json!(1)))
//!     .build();
//! assert!(workflow.runnables()[0].condition.is_some());
//! ```
//!
//! Nothing may be appended after `repeat_all`:
//!
//! ```compile_fail
//! use engine::builder::WorkflowBuilder;
//! use serde_json::json;
//! use tasks::mock::MockTask;
//!
//! let _ = WorkflowBuilder::new("w")
//!     .repeat_all(|_| false)
//!     .run("a", MockTask::returning("a", json!(1)));
//! ```

use std::sync::Arc;

use serde_json::Value;
use tasks::ExecutableTask;
use tracing::warn;

use crate::models::{
    ConditionFn, InputFn, ResultKey, ResultSet, ResultShape, Runnable, RunnableKind, Workflow,
    WorkflowParams,
};

// ---------------------------------------------------------------------------
// Shared state carried through every phase
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct BuilderData {
    params: WorkflowParams,
    runnables: Vec<Runnable>,
    shape: ResultShape,
    repeat_all: Option<ConditionFn>,
    next_condition: Option<ConditionFn>,
    next_input: Option<InputFn>,
}

impl BuilderData {
    fn new(params: WorkflowParams) -> Self {
        Self {
            params,
            runnables: Vec::new(),
            shape: ResultShape::default(),
            repeat_all: None,
            next_condition: None,
            next_input: None,
        }
    }

    /// Append a runnable, consuming whatever condition and input function
    /// are staged.
    fn push(mut self, id: String, kind: RunnableKind) -> Self {
        let condition = self.next_condition.take();
        let input = self.next_input.take();

        let nested = match &kind {
            RunnableKind::Workflow(workflow) => Some(workflow.shape().clone()),
            RunnableKind::Task(_) => None,
        };
        let duplicate = self.shape.insert(ResultKey {
            id: id.clone(),
            optional: condition.is_some(),
            nested,
        });
        if duplicate {
            warn!(
                workflow = %self.params.name,
                runnable = %id,
                "runnable id declared more than once; the later result overwrites the earlier one"
            );
        }

        self.runnables.push(Runnable {
            id,
            kind,
            condition,
            input,
            repeat_condition: None,
            repeat_input: None,
        });
        self
    }

    fn build(self) -> Workflow {
        Workflow::new(self.params, self.runnables, self.repeat_all, self.shape)
    }
}

fn condition_fn<C>(condition: C) -> ConditionFn
where
    C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
{
    Arc::new(condition)
}

fn input_fn<I>(input: I) -> InputFn
where
    I: Fn(&ResultSet) -> Value + Send + Sync + 'static,
{
    Arc::new(input)
}

// ---------------------------------------------------------------------------
// Start phase
// ---------------------------------------------------------------------------

/// A fresh builder, or one whose last directive was a completed runnable
/// (with or without a repeat attached).
#[derive(Clone)]
pub struct WorkflowBuilder {
    data: BuilderData,
}

impl WorkflowBuilder {
    /// Start a workflow with the given name and no version.
    pub fn new(name: impl Into<String>) -> Self {
        Self::create(WorkflowParams::new(name))
    }

    pub fn create(params: WorkflowParams) -> Self {
        Self {
            data: BuilderData::new(params),
        }
    }

    /// Gate the next runnable on `condition`, evaluated against the
    /// accumulated result set when that runnable is reached.
    pub fn next_when<C>(self, condition: C) -> WorkflowBuilderWithRunOnly
    where
        C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
    {
        let mut data = self.data;
        data.next_condition = Some(condition_fn(condition));
        WorkflowBuilderWithRunOnly::from_data(data)
    }

    /// Derive the next runnable's input from the accumulated result set
    /// instead of passing the whole set.
    pub fn next_input<I>(self, input: I) -> WorkflowBuilderWithRunOnly
    where
        I: Fn(&ResultSet) -> Value + Send + Sync + 'static,
    {
        WorkflowBuilderWithRunOnly::from_data(self.data).next_input(input)
    }

    /// Append a task runnable whose output is stored under `id`.
    pub fn run<T>(self, id: impl Into<String>, task: T) -> WorkflowBuilderWithPreviousRunnable
    where
        T: ExecutableTask + 'static,
    {
        let data = self
            .data
            .push(id.into(), RunnableKind::Task(Arc::new(task)));
        WorkflowBuilderWithPreviousRunnable { data }
    }

    /// Append a nested workflow whose final result set is stored under `id`.
    pub fn run_workflow(
        self,
        id: impl Into<String>,
        workflow: Workflow,
    ) -> WorkflowBuilderWithPreviousRunnable {
        let data = self
            .data
            .push(id.into(), RunnableKind::Workflow(Arc::new(workflow)));
        WorkflowBuilderWithPreviousRunnable { data }
    }

    /// Re-run the whole sequence from the initial input while `condition`
    /// holds for the result set of the pass just completed.
    pub fn repeat_all<C>(mut self, condition: C) -> WorkflowBuilderBuildOnly
    where
        C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
    {
        self.data.repeat_all = Some(condition_fn(condition));
        WorkflowBuilderBuildOnly { data: self.data }
    }

    pub fn build(self) -> Workflow {
        self.data.build()
    }
}

// ---------------------------------------------------------------------------
// Pending condition / input phase
// ---------------------------------------------------------------------------

/// A condition or input function is staged; only a runnable or a
/// replacement input function may follow.
#[derive(Clone)]
pub struct WorkflowBuilderWithRunOnly {
    data: BuilderData,
}

impl WorkflowBuilderWithRunOnly {
    fn from_data(data: BuilderData) -> Self {
        Self { data }
    }

    /// Replace the staged input function; only the last one before the
    /// runnable takes effect.
    pub fn next_input<I>(mut self, input: I) -> Self
    where
        I: Fn(&ResultSet) -> Value + Send + Sync + 'static,
    {
        self.data.next_input = Some(input_fn(input));
        self
    }

    /// Append a task runnable. If a condition is staged, `id` is only
    /// optionally present in the result.
    pub fn run<T>(self, id: impl Into<String>, task: T) -> WorkflowBuilderWithPreviousRunnable
    where
        T: ExecutableTask + 'static,
    {
        WorkflowBuilder { data: self.data }.run(id, task)
    }

    pub fn run_workflow(
        self,
        id: impl Into<String>,
        workflow: Workflow,
    ) -> WorkflowBuilderWithPreviousRunnable {
        WorkflowBuilder { data: self.data }.run_workflow(id, workflow)
    }
}

// ---------------------------------------------------------------------------
// Previous-runnable phase
// ---------------------------------------------------------------------------

/// A runnable was just appended. Everything [`WorkflowBuilder`] allows is
/// available, plus attaching a repeat to that runnable.
#[derive(Clone)]
pub struct WorkflowBuilderWithPreviousRunnable {
    data: BuilderData,
}

impl WorkflowBuilderWithPreviousRunnable {
    /// Re-execute the runnable just added while `condition` holds after
    /// each execution. Repeats reuse the runnable's first input.
    pub fn repeat_previous_while<C>(self, condition: C) -> WorkflowBuilder
    where
        C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
    {
        self.attach_repeat(condition_fn(condition), None)
    }

    /// Like [`repeat_previous_while`](Self::repeat_previous_while), but each
    /// repeat derives a fresh input from the now-current result set.
    pub fn repeat_previous_while_with_input<C, I>(self, condition: C, input: I) -> WorkflowBuilder
    where
        C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
        I: Fn(&ResultSet) -> Value + Send + Sync + 'static,
    {
        self.attach_repeat(condition_fn(condition), Some(input_fn(input)))
    }

    fn attach_repeat(
        mut self,
        condition: ConditionFn,
        repeat_input: Option<InputFn>,
    ) -> WorkflowBuilder {
        if let Some(previous) = self.data.runnables.pop() {
            self.data.runnables.push(Runnable {
                repeat_condition: Some(condition),
                repeat_input,
                ..previous
            });
        }
        WorkflowBuilder { data: self.data }
    }

    pub fn next_when<C>(self, condition: C) -> WorkflowBuilderWithRunOnly
    where
        C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
    {
        self.into_builder().next_when(condition)
    }

    pub fn next_input<I>(self, input: I) -> WorkflowBuilderWithRunOnly
    where
        I: Fn(&ResultSet) -> Value + Send + Sync + 'static,
    {
        self.into_builder().next_input(input)
    }

    pub fn run<T>(self, id: impl Into<String>, task: T) -> WorkflowBuilderWithPreviousRunnable
    where
        T: ExecutableTask + 'static,
    {
        self.into_builder().run(id, task)
    }

    pub fn run_workflow(
        self,
        id: impl Into<String>,
        workflow: Workflow,
    ) -> WorkflowBuilderWithPreviousRunnable {
        self.into_builder().run_workflow(id, workflow)
    }

    pub fn repeat_all<C>(self, condition: C) -> WorkflowBuilderBuildOnly
    where
        C: Fn(&ResultSet) -> bool + Send + Sync + 'static,
    {
        self.into_builder().repeat_all(condition)
    }

    pub fn build(self) -> Workflow {
        self.data.build()
    }

    /// Give up the option of attaching a repeat to the previous runnable.
    pub fn into_builder(self) -> WorkflowBuilder {
        WorkflowBuilder { data: self.data }
    }
}

// ---------------------------------------------------------------------------
// Build-only phase
// ---------------------------------------------------------------------------

/// `repeat_all` has been set; the sequence is closed.
#[derive(Clone)]
pub struct WorkflowBuilderBuildOnly {
    data: BuilderData,
}

impl WorkflowBuilderBuildOnly {
    pub fn build(self) -> Workflow {
        self.data.build()
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tasks::mock::MockTask;

    fn task(name: &str) -> MockTask {
        MockTask::returning(name, json!(name))
    }

    fn ids(workflow: &Workflow) -> Vec<&str> {
        workflow.runnables().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn empty_builder_produces_empty_workflow() {
        let workflow = WorkflowBuilder::create(WorkflowParams::new("empty").with_version("2"))
            .build();
        assert_eq!(workflow.name(), "empty");
        assert_eq!(workflow.version(), Some("2"));
        assert!(workflow.runnables().is_empty());
        assert!(workflow.repeat_condition().is_none());
        assert!(workflow.shape().keys().is_empty());
    }

    #[test]
    fn runnables_keep_declaration_order() {
        let workflow = WorkflowBuilder::new("ordered")
            .run("a", task("a"))
            .run("b", task("b"))
            .run_workflow("c", WorkflowBuilder::new("inner").build())
            .build();

        assert_eq!(ids(&workflow), vec!["a", "b", "c"]);
        assert_eq!(workflow.runnables()[1].kind.label(), "task");
        assert_eq!(workflow.runnables()[2].kind.label(), "workflow");
    }

    #[test]
    fn staged_condition_and_input_are_consumed_by_the_next_runnable_only() {
        let workflow = WorkflowBuilder::new("staged")
            .next_when(|_| true)
            .next_input(|_| json!(1))
            .run("gated", task("gated"))
            .run("plain", task("plain"))
            .build();

        let gated = &workflow.runnables()[0];
        let plain = &workflow.runnables()[1];
        assert!(gated.condition.is_some());
        assert!(gated.input.is_some());
        assert!(plain.condition.is_none());
        assert!(plain.input.is_none());
    }

    #[test]
    fn last_staged_input_wins() {
        let workflow = WorkflowBuilder::new("inputs")
            .next_input(|_| json!("first"))
            .next_input(|_| json!("second"))
            .run("a", task("a"))
            .build();

        let input = workflow.runnables()[0].input.as_ref().expect("input staged");
        assert_eq!(input(&Map::new()), json!("second"));
    }

    #[test]
    fn repeat_attaches_to_the_previous_runnable_only() {
        let workflow = WorkflowBuilder::new("repeat")
            .run("a", task("a"))
            .run("b", task("b"))
            .repeat_previous_while_with_input(|_| false, |_| json!(null))
            .run("c", task("c"))
            .build();

        let [a, b, c] = workflow.runnables() else {
            panic!("expected three runnables");
        };
        assert!(a.repeat_condition.is_none());
        assert!(b.repeat_condition.is_some());
        assert!(b.repeat_input.is_some());
        assert!(c.repeat_condition.is_none());
    }

    #[test]
    fn repeat_keeps_the_runnable_gating() {
        let workflow = WorkflowBuilder::new("gated-repeat")
            .next_when(|_| true)
            .run("a", task("a"))
            .repeat_previous_while(|_| false)
            .build();

        let a = &workflow.runnables()[0];
        assert!(a.condition.is_some());
        assert!(a.repeat_condition.is_some());
        assert!(a.repeat_input.is_none());
    }

    #[test]
    fn repeat_all_sets_workflow_condition() {
        let workflow = WorkflowBuilder::new("loop")
            .run("a", task("a"))
            .repeat_all(|_| false)
            .build();
        assert!(workflow.repeat_condition().is_some());
    }

    #[test]
    fn shape_tracks_guaranteed_and_optional_keys() {
        let inner = WorkflowBuilder::new("inner").run("x", task("x")).build();
        let workflow = WorkflowBuilder::new("shape")
            .run("always", task("always"))
            .next_input(|_| json!(null))
            .run("derived", task("derived"))
            .next_when(|_| false)
            .run_workflow("maybe", inner)
            .build();

        let shape = workflow.shape();
        assert!(shape.is_guaranteed("always"));
        assert!(shape.is_guaranteed("derived"));
        assert!(shape.contains("maybe"));
        assert!(!shape.is_guaranteed("maybe"));

        let nested = shape.get("maybe").and_then(|k| k.nested.as_ref()).expect("nested shape");
        assert!(nested.is_guaranteed("x"));
    }

    #[test]
    fn duplicate_ids_are_kept_as_separate_runnables() {
        let workflow = WorkflowBuilder::new("dup")
            .run("same", task("first"))
            .run("same", task("second"))
            .build();

        assert_eq!(ids(&workflow), vec!["same", "same"]);
        assert_eq!(workflow.shape().keys().len(), 1);
    }

    #[test]
    fn branching_a_builder_does_not_leak_between_branches() {
        let base = WorkflowBuilder::new("base").run("a", task("a")).into_builder();

        let left = base.clone().run("left", task("left")).build();
        let right = base.clone().run("right", task("right")).build();
        let untouched = base.build();

        assert_eq!(ids(&left), vec!["a", "left"]);
        assert_eq!(ids(&right), vec!["a", "right"]);
        assert_eq!(ids(&untouched), vec!["a"]);
    }

    #[test]
    fn built_workflow_is_unaffected_by_later_directives() {
        let builder = WorkflowBuilder::new("snapshot").run("a", task("a"));
        let first = builder.clone().build();
        let second = builder.repeat_previous_while(|_| true).run("b", task("b")).build();

        assert_eq!(ids(&first), vec!["a"]);
        assert!(first.runnables()[0].repeat_condition.is_none());
        assert_eq!(ids(&second), vec!["a", "b"]);
        assert!(second.runnables()[0].repeat_condition.is_some());
    }
}
