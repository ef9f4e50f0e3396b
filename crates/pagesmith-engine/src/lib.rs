//! Round execution engine
//!
//! [`RoundWorkflow`] drives a unit of work through its round's stages using
//! the host, generator, publisher and notifier it was built with.
//! [`TaskQueue`] runs workflows in the background with bounded concurrency.

mod error;
mod queue;
mod workflow;


pub use error::{HostStage, WorkflowError};
pub use queue::{QueueError, RoundRunner, TaskQueue, TaskSink};
pub use workflow::{RoundState, RoundSummary, RoundWorkflow};
