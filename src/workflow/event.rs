//! Workflow log events and run results.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Kind of a workflow log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Orchestrator banners and notices
    Info,
    /// Step or spawn failures
    Error,
    /// Process standard output (or agent text blocks)
    Stdout,
    /// Process standard error
    Stderr,
    /// Agent tool invocation
    ToolUse,
    /// Agent tool output
    ToolResult,
}

/// One log event produced while a workflow runs.
///
/// Entries are emitted to observers as they occur and are not retained by
/// the runner; the caller owns aggregation and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Kind of event
    pub level: LogLevel,

    /// Event text; may be multi-line and may or may not be newline-terminated
    pub message: String,

    /// Name of the step that produced the entry; absent for workflow-level
    /// banners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,

    /// Milliseconds since epoch, assigned at emission time
    pub timestamp: i64,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>, step: Option<&str>) -> Self {
        Self {
            level,
            message: message.into(),
            step: step.map(str::to_string),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Result of executing a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name
    pub name: String,

    /// Whether the step succeeded (exit code 0)
    pub success: bool,

    /// Exit code; `None` means the process never produced one
    /// (spawn failure or unsupported step shape)
    pub exit_code: Option<i32>,
}

/// Result of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// True iff every attempted step succeeded and the run was not aborted
    pub success: bool,

    /// Results for attempted steps only; steps after a failure or abort
    /// never appear
    pub steps: Vec<StepResult>,
}

impl WorkflowResult {
    /// Get the number of successful steps.
    pub fn success_count(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }

    /// Get the first failed step, if any.
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }
}
