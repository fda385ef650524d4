//! `conductor list`, `show`, and `validate`.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use conductor_core::workflow::definition::serialize_workflow_yaml;
use conductor_infra::config::workflows_dir;
use conductor_types::workflow::StepDefinition;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub fn handle_list(state: &AppState, json: bool) -> Result<()> {
    let catalog = state.engine.catalog();

    if json {
        let out: Vec<_> = catalog
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "description": d.description,
                    "steps": d.steps.len(),
                    "requires_review": d.requires_review(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if catalog.is_empty() {
        println!();
        println!("  No workflows found.");
        println!(
            "  Add YAML files under: {}",
            style(workflows_dir(&state.home, &state.config).display()).dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Steps"),
            Cell::new("Review"),
            Cell::new("Description"),
        ]);

    for d in catalog.iter() {
        table.add_row(vec![
            Cell::new(&d.name),
            Cell::new(d.steps.len()),
            Cell::new(if d.requires_review() { "yes" } else { "-" }),
            Cell::new(d.description.as_deref().unwrap_or("")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

pub fn handle_show(state: &AppState, name: &str, json: bool, yaml: bool) -> Result<()> {
    let Some(def) = state.engine.catalog().get(name) else {
        bail!("unknown workflow: '{name}'");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(def)?);
        return Ok(());
    }
    if yaml {
        print!("{}", serialize_workflow_yaml(def)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Workflow:").bold(), style(&def.name).cyan());
    if let Some(description) = &def.description {
        println!("  {}", style(description).dim());
    }
    println!();

    let default_agent = &state.engine.config().default_agent;
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#"),
            Cell::new("Type").fg(Color::Cyan),
            Cell::new("Agent"),
            Cell::new("Outputs"),
            Cell::new("Review"),
        ]);

    for (i, step) in def.steps.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&step.step_type),
            Cell::new(step.agent_or(default_agent)),
            Cell::new(step.outputs.join(", ")),
            review_cell(state, step),
        ]);
    }

    println!("{table}");
    println!();
    Ok(())
}

fn review_cell(state: &AppState, step: &StepDefinition) -> Cell {
    if !step.require_review {
        return Cell::new("-");
    }
    let review_type = step
        .review_type
        .as_deref()
        .unwrap_or(&state.engine.config().default_review_type);
    Cell::new(review_type).fg(Color::Yellow)
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

pub fn handle_validate(state: &AppState, json: bool) -> Result<()> {
    let errors = state.engine.validate_catalog();
    let workflows = state.engine.catalog().len();

    if json {
        let out = serde_json::json!({
            "home": state.home.display().to_string(),
            "workflows": workflows,
            "capabilities": state.engine.registry().names(),
            "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} {} workflows, capabilities: {}",
            style("Checked").bold(),
            workflows,
            state.engine.registry().names().join(", ")
        );
        for error in &errors {
            println!("  {} {error}", style("✗").red());
        }
        if errors.is_empty() {
            println!("  {} all workflows are runnable", style("✓").green());
        }
        println!();
    }

    if !errors.is_empty() {
        bail!("{} workflow(s) reference unknown capabilities", errors.len());
    }
    Ok(())
}
