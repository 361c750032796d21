//! Agentflow - local AI workflow engine.
//!
//! Runs YAML workflows of shell commands and Claude agent steps, streaming
//! structured logs to the terminal as they happen.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use agentflow::workflow::{
    discover_workflows, parse_workflow, validate_workflow, LogEntry, LogLevel, WorkflowRunner,
};

/// Local AI workflow engine
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow YAML file
    Run {
        /// Path to the workflow file
        file: String,

        /// Working directory for spawned processes
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Environment overrides (KEY=VALUE)
        #[arg(short, long)]
        env: Vec<String>,
    },

    /// Parse a workflow file and report definition issues
    Check {
        /// Path to the workflow file
        file: String,
    },

    /// List workflow files in a directory
    List {
        /// Directory to search
        #[arg(default_value = ".")]
        dir: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };
    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    match cli.command {
        Commands::Run { file, cwd, env } => {
            let code = cmd_run(&file, cwd, &env)?;
            std::process::exit(code);
        }
        Commands::Check { file } => {
            let code = cmd_check(&file)?;
            std::process::exit(code);
        }
        Commands::List { dir } => {
            cmd_list(&dir);
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

/// Run a workflow file, streaming its log entries to the terminal.
fn cmd_run(file: &str, cwd: Option<PathBuf>, env: &[String]) -> Result<i32> {
    let path = shellexpand::tilde(file).to_string();

    let mut runner = WorkflowRunner::new();
    if let Some(dir) = cwd {
        runner = runner.with_working_dir(dir);
    }
    for pair in env {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid --env value '{pair}', expected KEY=VALUE"))?;
        runner = runner.with_env(key, value);
    }
    runner.on_log(print_log_entry);

    // Ctrl+C requests a cooperative stop: the current step finishes, the
    // remaining steps are skipped.
    let abort = runner.abort_handle();
    ctrlc::set_handler(move || abort.abort())?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(runner.run_file(&path))?;

    Ok(i32::from(!result.success))
}

/// Render a log entry with per-level colors, step name as prefix.
fn print_log_entry(entry: &LogEntry) {
    let prefix = entry.step.as_ref().map_or_else(String::new, |step| format!("[{step}] "));
    let mut line = format!("{prefix}{}", entry.message);
    if !line.ends_with('\n') {
        line.push('\n');
    }

    match entry.level {
        LogLevel::Error | LogLevel::Stderr => {
            let _ = write!(io::stderr(), "\x1b[31m{line}\x1b[0m");
        }
        LogLevel::ToolUse => {
            let _ = write!(io::stdout(), "\x1b[33m⚙ {line}\x1b[0m");
        }
        LogLevel::ToolResult => {
            let _ = write!(io::stdout(), "\x1b[36m{line}\x1b[0m");
        }
        LogLevel::Info | LogLevel::Stdout => {
            let _ = write!(io::stdout(), "{line}");
        }
    }
}

/// Parse a workflow file and report issues the runner would fail on.
fn cmd_check(file: &str) -> Result<i32> {
    let path = shellexpand::tilde(file).to_string();
    let definition = parse_workflow(Path::new(&path))?;

    let issues = validate_workflow(&definition);
    if issues.is_empty() {
        println!("{}: OK ({} steps)", definition.name, definition.step_count());
        return Ok(0);
    }

    for issue in &issues {
        eprintln!("{issue}");
    }
    Ok(1)
}

/// List workflow definitions found under a directory.
fn cmd_list(dir: &str) {
    let path = shellexpand::tilde(dir).to_string();
    let workflows = discover_workflows(Path::new(&path));

    if workflows.is_empty() {
        println!("No workflows found in {path}");
        return;
    }

    for (file, definition) in workflows {
        println!(
            "{} ({} steps, {} session) - {}",
            definition.name,
            definition.step_count(),
            definition.session_mode.as_str(),
            file.display()
        );
    }
}

/// Generate shell completions to stdout.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
