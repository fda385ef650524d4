//! CLI command definitions for the `conductor` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod run;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run multi-step workflows over named capabilities.
#[derive(Parser)]
#[command(name = "conductor", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Conductor home directory holding conductor.toml and workflows/.
    #[arg(long, global = true, env = "CONDUCTOR_HOME")]
    pub home: Option<PathBuf>,

    /// Project directory that relative file paths resolve against.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Write logs to stderr as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true, hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow.
    Run {
        /// Workflow name.
        workflow: String,

        /// Initial context as a JSON object.
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,

        /// Read the initial context from a JSON file.
        #[arg(long)]
        context_file: Option<PathBuf>,
    },

    /// List available workflows.
    #[command(alias = "ls")]
    List,

    /// Show the steps of a workflow.
    Show {
        /// Workflow name.
        workflow: String,

        /// Print the definition as YAML.
        #[arg(long)]
        yaml: bool,
    },

    /// Load config and workflows, and check every referenced capability.
    Validate,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_context_and_globals() {
        let cli = Cli::try_parse_from([
            "conductor",
            "--json",
            "-vv",
            "run",
            "create_feature",
            "--context",
            r#"{"feature":{}}"#,
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run { workflow, context, context_file } => {
                assert_eq!(workflow, "create_feature");
                assert_eq!(context.as_deref(), Some(r#"{"feature":{}}"#));
                assert!(context_file.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn context_sources_conflict() {
        let result = Cli::try_parse_from([
            "conductor",
            "run",
            "x",
            "--context",
            "{}",
            "--context-file",
            "ctx.json",
        ]);
        assert!(result.is_err());
    }
}
