//! Workflow schema definitions.
//!
//! Defines the YAML structure for workflow files.

use serde::{Deserialize, Serialize};

/// A workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Name of the workflow, used in log banners
    pub name: String,

    /// Whether consecutive agent steps share one conversation
    #[serde(default, rename = "claude_session")]
    pub session_mode: SessionMode,

    /// Steps to execute, in order
    #[serde(rename = "workflow")]
    pub steps: Vec<WorkflowStep>,
}

/// Agent session continuity across the steps of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Every agent step starts a fresh conversation
    #[default]
    Isolated,

    /// Consecutive agent steps resume the same conversation
    Shared,
}

/// A step in the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Name of the step
    pub name: String,

    /// What the step does, decided by shape at parse time
    #[serde(flatten)]
    pub action: StepAction,
}

/// The two supported step shapes, plus a fallback for anything else.
///
/// Variant order mirrors dispatch precedence: a step carrying both an
/// `agent` marker and a `run` command executes as an agent step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepAction {
    /// A prompt dispatched to an external agent CLI
    Agent {
        /// Which agent backend handles the prompt
        agent: AgentKind,

        /// Natural-language instruction passed to the agent
        prompt: String,

        /// Bypass the agent's own interactive confirmation prompts
        #[serde(default)]
        skip_permission: bool,
    },

    /// A shell command line
    Shell {
        /// Command executed via `sh -c`
        #[serde(rename = "run")]
        command: String,
    },

    /// Unknown step shape; always fails at execution time
    Unrecognized {},
}

/// Supported agent backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
}

impl WorkflowDefinition {
    /// Create a definition with the default (isolated) session mode.
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self { name: name.into(), session_mode: SessionMode::default(), steps }
    }

    /// Set the session mode.
    #[must_use]
    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    /// Get the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl SessionMode {
    /// Get the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "isolated",
            Self::Shared => "shared",
        }
    }

    /// Check whether agent steps share one conversation.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared)
    }
}

impl WorkflowStep {
    /// Create a shell step.
    pub fn shell(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self { name: name.into(), action: StepAction::Shell { command: command.into() } }
    }

    /// Create a Claude agent step.
    pub fn agent(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Agent {
                agent: AgentKind::Claude,
                prompt: prompt.into(),
                skip_permission: false,
            },
        }
    }

    /// Set whether the agent's interactive confirmation is bypassed.
    /// No effect on shell steps.
    #[must_use]
    pub fn with_skip_permission(mut self, skip: bool) -> Self {
        if let StepAction::Agent { skip_permission, .. } = &mut self.action {
            *skip_permission = skip;
        }
        self
    }

    /// Check if this is an agent step.
    pub fn is_agent(&self) -> bool {
        matches!(self.action, StepAction::Agent { .. })
    }

    /// Check if this is a shell step.
    pub fn is_shell(&self) -> bool {
        matches!(self.action, StepAction::Shell { .. })
    }
}

impl AgentKind {
    /// Get the agent's binary/marker name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workflow_yaml() {
        let yaml = r#"
name: deploy
claude_session: shared

workflow:
  - name: build
    run: cargo build --release

  - name: summarize
    agent: claude
    prompt: "Summarize the build output"
    skip_permission: true
"#;

        let definition: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(definition.name, "deploy");
        assert_eq!(definition.session_mode, SessionMode::Shared);
        assert_eq!(definition.step_count(), 2);

        assert!(definition.steps[0].is_shell());
        match &definition.steps[0].action {
            StepAction::Shell { command } => assert_eq!(command, "cargo build --release"),
            other => panic!("expected shell step, got {other:?}"),
        }

        assert!(definition.steps[1].is_agent());
        match &definition.steps[1].action {
            StepAction::Agent { agent, prompt, skip_permission } => {
                assert_eq!(*agent, AgentKind::Claude);
                assert_eq!(prompt, "Summarize the build output");
                assert!(*skip_permission);
            }
            other => panic!("expected agent step, got {other:?}"),
        }
    }

    #[test]
    fn test_session_mode_defaults_to_isolated() {
        let yaml = r#"
name: plain
workflow:
  - name: one
    run: echo hi
"#;

        let definition: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.session_mode, SessionMode::Isolated);
        assert!(!definition.session_mode.is_shared());
    }

    #[test]
    fn test_skip_permission_defaults_to_false() {
        let yaml = r#"
name: agent-step
agent: claude
prompt: hello
"#;

        let step: WorkflowStep = serde_yaml::from_str(yaml).unwrap();
        match step.action {
            StepAction::Agent { skip_permission, .. } => assert!(!skip_permission),
            other => panic!("expected agent step, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_step_shape_parses_as_unrecognized() {
        let yaml = r#"
name: mystery
uses: some-plugin
"#;

        let step: WorkflowStep = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(step.action, StepAction::Unrecognized {}));
    }

    #[test]
    fn test_agent_step_without_prompt_is_unrecognized() {
        let yaml = r#"
name: half-agent
agent: claude
"#;

        let step: WorkflowStep = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(step.action, StepAction::Unrecognized {}));
    }

    #[test]
    fn test_unknown_agent_marker_is_unrecognized() {
        let yaml = r#"
name: other-agent
agent: gpt
prompt: hello
"#;

        let step: WorkflowStep = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(step.action, StepAction::Unrecognized {}));
    }

    #[test]
    fn test_step_constructors() {
        let shell = WorkflowStep::shell("build", "cargo build");
        assert!(shell.is_shell());
        assert_eq!(shell.name, "build");

        let agent = WorkflowStep::agent("review", "Review the diff").with_skip_permission(true);
        assert!(agent.is_agent());
        match agent.action {
            StepAction::Agent { skip_permission, .. } => assert!(skip_permission),
            other => panic!("expected agent step, got {other:?}"),
        }

        // with_skip_permission leaves shell steps untouched
        let still_shell = WorkflowStep::shell("x", "true").with_skip_permission(true);
        assert!(still_shell.is_shell());
    }

    #[test]
    fn test_definition_builder() {
        let definition = WorkflowDefinition::new(
            "pipeline",
            vec![WorkflowStep::shell("one", "true"), WorkflowStep::agent("two", "hi")],
        )
        .with_session_mode(SessionMode::Shared);

        assert_eq!(definition.step_count(), 2);
        assert!(definition.session_mode.is_shared());
        assert_eq!(definition.session_mode.as_str(), "shared");
    }
}
