//! Workflow execution engine.
//!
//! Drives workflow steps in order, spawning shell commands and Claude agent
//! processes, forwarding their output to registered observers as structured
//! log entries, and threading agent session state across steps.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::event::{LogEntry, LogLevel, StepResult, WorkflowResult};
use super::schema::{SessionMode, StepAction, WorkflowDefinition, WorkflowStep};
use super::stream::{EventStreamParser, StreamEvent};
use super::WorkflowError;

/// Binary name of the external agent CLI, resolved via the spawn PATH.
const CLAUDE_BIN: &str = "claude";

/// Cooperative cancellation handle for a running workflow.
///
/// Aborting does not kill an in-flight process. The runner checks the flag
/// before starting each step, so the current step runs to completion and
/// only the remaining steps are skipped.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    aborted: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Request that the workflow stops at the next step boundary.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Check whether an abort has been requested.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

type LogObserver = Box<dyn Fn(&LogEntry) + Send + Sync>;
type DoneObserver = Box<dyn Fn(&WorkflowResult) + Send + Sync>;

/// Sequential workflow runner.
///
/// Steps execute strictly one at a time; the first failed step stops the
/// run. Log observers receive entries synchronously, in emission order, and
/// the done observers fire exactly once per [`run`](Self::run), after the
/// final summary log.
pub struct WorkflowRunner {
    /// Environment overlay applied on top of the inherited environment
    env: Vec<(String, String)>,

    /// Working directory for spawned processes
    working_dir: Option<PathBuf>,

    /// Cooperative abort flag, shared with handed-out `AbortHandle`s
    abort: AbortHandle,

    /// Session mode copied from the definition at the start of each run
    session_mode: SessionMode,

    /// Session id committed by the last successful agent step (shared mode)
    last_session_id: Option<String>,

    /// Log subscribers, invoked in registration order
    log_observers: Vec<LogObserver>,

    /// Completion subscribers
    done_observers: Vec<DoneObserver>,
}

impl std::fmt::Debug for WorkflowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRunner")
            .field("env", &self.env)
            .field("working_dir", &self.working_dir)
            .field("aborted", &self.abort.is_aborted())
            .field("session_mode", &self.session_mode)
            .finish()
    }
}

impl Default for WorkflowRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRunner {
    /// Create a new runner with inherited environment and working directory.
    pub fn new() -> Self {
        Self {
            env: Vec::new(),
            working_dir: None,
            abort: AbortHandle::default(),
            session_mode: SessionMode::default(),
            last_session_id: None,
            log_observers: Vec::new(),
            done_observers: Vec::new(),
        }
    }

    /// Add an environment variable for spawned processes.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Add multiple environment variables at once.
    #[must_use]
    pub fn with_envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    /// Set the working directory for spawned processes.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Register a log observer.
    pub fn on_log(&mut self, observer: impl Fn(&LogEntry) + Send + Sync + 'static) {
        self.log_observers.push(Box::new(observer));
    }

    /// Register a completion observer.
    pub fn on_done(&mut self, observer: impl Fn(&WorkflowResult) + Send + Sync + 'static) {
        self.done_observers.push(Box::new(observer));
    }

    /// Request a stop at the next step boundary.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Get a cancellation handle usable from another task or a signal
    /// handler.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Read a workflow definition from a YAML file and run it.
    ///
    /// Read and parse failures propagate as errors; step failures are
    /// reported through the returned [`WorkflowResult`] like any other run.
    pub async fn run_file(&mut self, path: impl AsRef<Path>) -> Result<WorkflowResult, WorkflowError> {
        let definition = super::parser::parse_workflow(path.as_ref())?;
        Ok(self.run(&definition).await)
    }

    /// Run a workflow definition to completion.
    ///
    /// Never fails for step-level reasons; the result's `success` flag is
    /// the single source of truth.
    pub async fn run(&mut self, definition: &WorkflowDefinition) -> WorkflowResult {
        self.session_mode = definition.session_mode;
        self.last_session_id = None;
        self.log(LogLevel::Info, format!("Starting workflow: {}", definition.name), None);

        let mut steps: Vec<StepResult> = Vec::new();
        for step in &definition.steps {
            if self.abort.is_aborted() {
                break;
            }
            let result = self.run_step(step).await;
            let failed = !result.success;
            steps.push(result);
            if failed {
                self.log(LogLevel::Error, format!("Step failed: {}", step.name), Some(&step.name));
                break;
            }
        }

        let success = steps.iter().all(|r| r.success) && !self.abort.is_aborted();
        let outcome = if success { "completed" } else { "failed" };
        self.log(LogLevel::Info, format!("Workflow {outcome}: {}", definition.name), None);

        let result = WorkflowResult { success, steps };
        for observer in &self.done_observers {
            observer(&result);
        }
        result
    }

    /// Dispatch one step by its parsed shape.
    ///
    /// An unrecognized shape, an empty prompt, or an empty command resolves
    /// immediately as a failure without spawning anything.
    async fn run_step(&mut self, step: &WorkflowStep) -> StepResult {
        tracing::debug!(step = %step.name, "Executing step");

        match &step.action {
            StepAction::Agent { prompt, skip_permission, .. } if !prompt.is_empty() => {
                self.run_agent_step(&step.name, prompt, *skip_permission).await
            }
            StepAction::Shell { command } if !command.is_empty() => {
                self.run_shell_step(&step.name, command).await
            }
            _ => StepResult { name: step.name.clone(), success: false, exit_code: None },
        }
    }

    /// Run a shell step, forwarding output chunks verbatim.
    ///
    /// Chunk boundaries may split or merge lines; entries mirror whatever
    /// the pipe delivered.
    async fn run_shell_step(&self, step_name: &str, command: &str) -> StepResult {
        self.log(LogLevel::Info, format!("Running: {command}"), Some(step_name));

        let (shell, shell_arg) = get_shell();
        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command);
        self.configure(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.log(LogLevel::Error, format!("Spawn error: {e}"), Some(step_name));
                return StepResult { name: step_name.to_string(), success: false, exit_code: None };
            }
        };

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut stdout_buf = vec![0u8; 8192];
        let mut stderr_buf = vec![0u8; 8192];

        loop {
            tokio::select! {
                chunk = next_chunk(&mut stdout, &mut stdout_buf), if stdout.is_some() => {
                    if let Some(text) = chunk {
                        self.log(LogLevel::Stdout, text, Some(step_name));
                    }
                }
                chunk = next_chunk(&mut stderr, &mut stderr_buf), if stderr.is_some() => {
                    if let Some(text) = chunk {
                        self.log(LogLevel::Stderr, text, Some(step_name));
                    }
                }
                else => break,
            }
        }

        match child.wait().await {
            Ok(status) => StepResult {
                name: step_name.to_string(),
                success: status.success(),
                exit_code: status.code(),
            },
            Err(e) => {
                self.log(LogLevel::Error, format!("Spawn error: {e}"), Some(step_name));
                StepResult { name: step_name.to_string(), success: false, exit_code: None }
            }
        }
    }

    /// Run a Claude agent step, decoding its stream-json output.
    async fn run_agent_step(
        &mut self,
        step_name: &str,
        prompt: &str,
        skip_permission: bool,
    ) -> StepResult {
        self.log(LogLevel::Info, format!("Running Claude agent: {step_name}"), Some(step_name));

        let mut cmd = Command::new(CLAUDE_BIN);
        if skip_permission {
            cmd.arg("--dangerously-skip-permissions");
        }
        if self.session_mode.is_shared() {
            if let Some(session_id) = self.last_session_id.clone() {
                cmd.arg("--resume").arg(&session_id);
                self.log(
                    LogLevel::Info,
                    format!("Resuming Claude session: {session_id}"),
                    Some(step_name),
                );
            }
        }
        cmd.args(["--output-format", "stream-json", "--verbose"]);
        cmd.arg("--print").arg(prompt);
        self.configure(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.log(LogLevel::Error, format!("Claude agent error: {e}"), Some(step_name));
                return StepResult { name: step_name.to_string(), success: false, exit_code: None };
            }
        };

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut stdout_buf = vec![0u8; 8192];
        let mut stderr_buf = vec![0u8; 8192];
        let mut parser = EventStreamParser::new();
        let mut step_session_id = self.last_session_id.clone();

        loop {
            tokio::select! {
                chunk = next_chunk(&mut stdout, &mut stdout_buf), if stdout.is_some() => {
                    if let Some(text) = chunk {
                        for event in parser.feed(&text) {
                            self.consume_stream_event(event, step_name, &mut step_session_id);
                        }
                    }
                }
                chunk = next_chunk(&mut stderr, &mut stderr_buf), if stderr.is_some() => {
                    if let Some(text) = chunk {
                        self.log(LogLevel::Stderr, text, Some(step_name));
                    }
                }
                else => break,
            }
        }

        // The stream may end without a trailing newline.
        if let Some(event) = parser.finish() {
            self.consume_stream_event(event, step_name, &mut step_session_id);
        }

        let result = match child.wait().await {
            Ok(status) => StepResult {
                name: step_name.to_string(),
                success: status.success(),
                exit_code: status.code(),
            },
            Err(e) => {
                self.log(LogLevel::Error, format!("Claude agent error: {e}"), Some(step_name));
                StepResult { name: step_name.to_string(), success: false, exit_code: None }
            }
        };

        // A failed step never updates shared session state.
        if self.session_mode.is_shared() && result.exit_code == Some(0) {
            if let Some(session_id) = step_session_id {
                self.last_session_id = Some(session_id);
            }
        }

        result
    }

    /// Handle one decoded stream item from the agent's stdout.
    fn consume_stream_event(
        &self,
        event: StreamEvent,
        step_name: &str,
        session_id: &mut Option<String>,
    ) {
        match event {
            StreamEvent::Raw(line) => self.log(LogLevel::Stdout, line, Some(step_name)),
            StreamEvent::Json(value) => {
                if let Some(id) = session_id_of(&value) {
                    *session_id = Some(id.to_string());
                }
                self.handle_agent_event(&value, step_name);
            }
        }
    }

    /// Map a parsed agent event to log entries.
    fn handle_agent_event(&self, event: &Value, step_name: &str) {
        match event.get("type").and_then(Value::as_str) {
            Some("assistant") => {
                let blocks = event
                    .pointer("/message/content")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for block in blocks {
                    match block.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            if let Some(text) = block.get("text").and_then(Value::as_str) {
                                if !text.is_empty() {
                                    self.log(LogLevel::Stdout, text, Some(step_name));
                                }
                            }
                        }
                        Some("tool_use") => {
                            let tool = block.get("name").and_then(Value::as_str).unwrap_or("");
                            let input = block
                                .get("input")
                                .map_or_else(|| "null".to_string(), Value::to_string);
                            self.log(LogLevel::ToolUse, format!("{tool}({input})"), Some(step_name));
                        }
                        _ => {}
                    }
                }
            }
            Some("tool") => {
                if let Some(output) = event.get("content").and_then(Value::as_str) {
                    if !output.is_empty() {
                        self.log(LogLevel::ToolResult, output, Some(step_name));
                    }
                }
            }
            Some("result") => {
                // Non-numeric cost values are treated as absent.
                if let Some(cost) = event.get("total_cost_usd").and_then(Value::as_f64) {
                    self.log(LogLevel::Info, format!("Cost: ${cost:.6}"), Some(step_name));
                }
            }
            _ => {}
        }
    }

    /// Apply stdio, environment overlay, and working directory to a command.
    fn configure(&self, cmd: &mut Command) {
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
    }

    /// Emit a log entry to every observer, in order.
    fn log(&self, level: LogLevel, message: impl Into<String>, step: Option<&str>) {
        let entry = LogEntry::new(level, message, step);
        for observer in &self.log_observers {
            observer(&entry);
        }
    }
}

/// Get the shell and argument for the current platform.
fn get_shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

/// Session continuity is discovered from any event carrying a non-empty
/// string `session_id`, regardless of event type.
fn session_id_of(event: &Value) -> Option<&str> {
    event.get("session_id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

/// Read the next chunk from an optional stream, clearing it on EOF or error.
async fn next_chunk<R>(stream: &mut Option<R>, buf: &mut [u8]) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let reader = stream.as_mut()?;
    match reader.read(buf).await {
        Ok(0) | Err(_) => {
            *stream = None;
            None
        }
        Ok(n) => Some(String::from_utf8_lossy(&buf[..n]).to_string()),
    }
}
