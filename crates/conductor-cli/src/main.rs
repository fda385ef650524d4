//! Conductor CLI entry point.
//!
//! Binary name: `conductor`
//!
//! Parses CLI arguments, initializes tracing, loads config and workflows,
//! then dispatches to the command handler.

mod cli;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use conductor_observe::tracing_setup::{
    TracingOptions, filter_for_verbosity, init_tracing, shutdown_tracing,
};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let options = TracingOptions {
        default_filter: filter_for_verbosity(cli.verbose, cli.quiet).to_string(),
        json: cli.log_json,
        otel: cli.otel,
    };
    if let Err(e) = init_tracing(&options) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "conductor", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let state = AppState::init(cli.home.as_deref(), cli.root.as_deref()).await?;

    match cli.command {
        Commands::Run {
            workflow,
            context,
            context_file,
        } => {
            let context =
                cli::run::read_context(context.as_deref(), context_file.as_deref()).await?;
            cli::run::handle_run(&state, &workflow, context, cli.json, cli.quiet).await
        }
        Commands::List => {
            cli::workflow::handle_list(&state, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Show { workflow, yaml } => {
            cli::workflow::handle_show(&state, &workflow, cli.json, yaml)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            cli::workflow::handle_validate(&state, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    }
}
