//! `engine` crate — workflow definition model, staged builder and runner.

pub mod builder;
pub mod error;
pub mod models;
pub mod runner;

pub use builder::{
    WorkflowBuilder, WorkflowBuilderBuildOnly, WorkflowBuilderWithPreviousRunnable,
    WorkflowBuilderWithRunOnly,
};
pub use error::EngineError;
pub use models::{
    ConditionFn, InputFn, ResultKey, ResultSet, ResultShape, Runnable, RunnableKind, Workflow,
    WorkflowParams,
};
pub use runner::{InMemoryWorkflowRunner, RunRecord, RunnerConfig, WorkflowRunner};
