//! # Agentflow
//!
//! Local AI workflow engine - run shell commands and Claude agent steps from
//! YAML workflows.
//!
//! A workflow is a named, ordered list of steps. Each step either runs a
//! shell command or sends a prompt to the external `claude` CLI agent. Steps
//! run strictly in order, the first failure stops the run, and every byte a
//! step's process produces is forwarded to registered observers as a
//! structured log entry while the step is still running.
//!
//! ## Quick Start
//!
//! ```yaml
//! name: release
//! claude_session: shared
//! workflow:
//!   - name: test
//!     run: cargo test
//!   - name: changelog
//!     agent: claude
//!     prompt: Summarize the changes since the last tag into CHANGELOG.md
//! ```
//!
//! ```bash
//! agentflow run release.yaml
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod workflow;

// Re-export commonly used types
pub use workflow::{
    AbortHandle, AgentKind, LogEntry, LogLevel, SessionMode, StepAction, StepResult,
    WorkflowDefinition, WorkflowError, WorkflowResult, WorkflowRunner, WorkflowStep,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "agentflow";

/// Short alias
pub const APP_ALIAS: &str = "aflow";
