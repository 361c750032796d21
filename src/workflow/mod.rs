//! Workflow engine for shell and Claude agent steps.
//!
//! Workflows are YAML documents describing a named, ordered list of steps.
//! The [`WorkflowRunner`] executes them sequentially, streaming structured
//! [`LogEntry`] events to registered observers and stopping at the first
//! failed step.

mod event;
mod parser;
mod runner;
mod schema;
mod stream;

pub use event::{LogEntry, LogLevel, StepResult, WorkflowResult};
pub use parser::{discover_workflows, parse_workflow, parse_workflow_str, validate_workflow};
pub use runner::{AbortHandle, WorkflowRunner};
pub use schema::{AgentKind, SessionMode, StepAction, WorkflowDefinition, WorkflowStep};
pub use stream::{EventStreamParser, StreamEvent};

/// Workflow error types.
///
/// Step-level failures never surface here; they are recovered into
/// [`StepResult`] values. Only structural failures (unreadable file, invalid
/// YAML) are errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Failed to read workflow file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid workflow YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}
