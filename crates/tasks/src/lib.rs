//! `tasks` crate — the `ExecutableTask` trait, a closure adapter and a test double.
//!
//! Every unit of work a workflow runs must implement [`ExecutableTask`].
//! The engine crate dispatches task runnables through this trait object.

pub mod error;
pub mod func;
pub mod mock;
pub mod traits;

pub use error::TaskError;
pub use func::{task_fn, FnTask};
pub use traits::ExecutableTask;
