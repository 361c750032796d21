//! Workflow file parsing and discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::schema::{StepAction, WorkflowDefinition};
use super::WorkflowError;

/// Parse a workflow definition from a file.
pub fn parse_workflow(path: &Path) -> Result<WorkflowDefinition, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    parse_workflow_str(&content)
}

/// Parse a workflow definition from a string.
pub fn parse_workflow_str(content: &str) -> Result<WorkflowDefinition, WorkflowError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Report definition issues that would fail at run time.
///
/// Advisory only: the runner never pre-validates, so a flagged definition
/// still runs and fails at the offending step.
pub fn validate_workflow(definition: &WorkflowDefinition) -> Vec<String> {
    let mut issues = Vec::new();

    if definition.name.is_empty() {
        issues.push("Workflow has no name".to_string());
    }
    if definition.steps.is_empty() {
        issues.push("Workflow has no steps".to_string());
    }

    for (i, step) in definition.steps.iter().enumerate() {
        let label = if step.name.is_empty() {
            format!("Step {}", i + 1)
        } else {
            format!("Step '{}'", step.name)
        };

        if step.name.is_empty() {
            issues.push(format!("{label} has no name"));
        }

        match &step.action {
            StepAction::Shell { command } if command.is_empty() => {
                issues.push(format!("{label} has an empty command"));
            }
            StepAction::Agent { prompt, .. } if prompt.is_empty() => {
                issues.push(format!("{label} has an empty prompt"));
            }
            StepAction::Unrecognized {} => {
                issues.push(format!(
                    "{label} is neither a shell step (run) nor an agent step (agent + prompt)"
                ));
            }
            _ => {}
        }
    }

    issues
}

/// Discover workflow files under a directory.
///
/// Scans recursively for `.yaml`/`.yml` files that parse as workflow
/// definitions. Files that do not parse are skipped.
pub fn discover_workflows(dir: &Path) -> Vec<(PathBuf, WorkflowDefinition)> {
    let mut workflows = Vec::new();

    for entry in WalkDir::new(dir).follow_links(false).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if !path.extension().map_or(false, |e| e == "yaml" || e == "yml") {
            continue;
        }
        match parse_workflow(path) {
            Ok(definition) => workflows.push((path.to_path_buf(), definition)),
            Err(e) => {
                tracing::debug!(path = ?path, error = %e, "Skipping file that is not a workflow");
            }
        }
    }

    workflows.sort_by(|a, b| a.0.cmp(&b.0));
    workflows
}
