//! `conductor run`: execute a workflow and report its outcome.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use console::style;
use serde_json::Value;

use conductor_types::JsonMap;
use conductor_types::event::WorkflowEvent;
use conductor_types::outcome::Outcome;

use crate::state::AppState;

/// Exit code for an outcome: 0 completed, 1 error, 2 review failed.
pub fn exit_code(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::Completed { .. } => 0,
        Outcome::Error { .. } => 1,
        Outcome::ReviewFailed { .. } => 2,
    }
}

/// Parse the initial context from `--context` or `--context-file`.
pub async fn read_context(inline: Option<&str>, file: Option<&Path>) -> Result<JsonMap> {
    let raw = match (inline, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading context file {}", path.display()))?,
        (None, None) => return Ok(JsonMap::new()),
    };

    match serde_json::from_str::<Value>(&raw).context("parsing context JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("context must be a JSON object, got {}", type_name(&other)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub async fn handle_run(
    state: &AppState,
    workflow: &str,
    context: JsonMap,
    json: bool,
    quiet: bool,
) -> Result<ExitCode> {
    let progress = (!json && !quiet).then(|| {
        let mut run = state.engine.event_bus().subscribe_next_run();
        tokio::spawn(async move {
            while let Some(event) = run.recv().await {
                print_event(&event);
            }
        })
    });

    let result = state.engine.execute(workflow, context).await;

    if let Some(progress) = progress {
        if result.is_ok() {
            let _ = progress.await;
        } else {
            progress.abort();
        }
    }

    let outcome = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if !quiet {
        print_outcome(workflow, &outcome)?;
    }

    Ok(ExitCode::from(exit_code(&outcome)))
}

fn print_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::RunStarted { workflow_name, total_steps, .. } => {
            println!();
            println!(
                "  {} Running '{}' ({total_steps} steps)",
                style("▶").bold(),
                style(workflow_name).cyan()
            );
        }
        WorkflowEvent::StepStarted { index, step_type, agent, .. } => {
            println!(
                "  {} {} {}",
                style(format!("[{}]", index + 1)).dim(),
                step_type,
                style(format!("({agent})")).dim()
            );
        }
        WorkflowEvent::StepCompleted { duration_ms, .. } => {
            println!("      {} {duration_ms}ms", style("✓").green());
        }
        WorkflowEvent::ReviewCompleted { approved, .. } => {
            if *approved {
                println!("      {} review approved", style("✓").green());
            } else {
                println!("      {} review rejected", style("✗").red());
            }
        }
        WorkflowEvent::StepHalted { cause, .. } => {
            println!("      {} halted: {cause}", style("✗").red());
        }
        WorkflowEvent::ReviewStarted { .. } | WorkflowEvent::RunFinished { .. } => {}
    }
}

fn print_outcome(workflow: &str, outcome: &Outcome) -> Result<()> {
    println!();
    match outcome {
        Outcome::Completed { results } => {
            println!(
                "  {} Workflow '{}' completed ({} steps)",
                style("*").green().bold(),
                style(workflow).cyan(),
                results.len()
            );
        }
        Outcome::ReviewFailed { step, feedback, cause, partial_results } => {
            println!(
                "  {} Workflow '{}' failed review at step '{}' ({cause})",
                style("!").yellow().bold(),
                style(workflow).cyan(),
                style(step).bold()
            );
            for item in feedback {
                let text = match item {
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string(other)?,
                };
                println!("    - {text}");
            }
            println!("  Steps completed: {}", partial_results.len());
        }
        Outcome::Error { step, details, cause, partial_results } => {
            println!(
                "  {} Workflow '{}' errored at step '{}' ({cause})",
                style("x").red().bold(),
                style(workflow).cyan(),
                style(step).bold()
            );
            println!("  Error: {}", style(details).red());
            println!("  Steps completed: {}", partial_results.len());
        }
    }
    println!();
    Ok(())
}
