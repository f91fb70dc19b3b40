mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use devswitch::config::WorkspaceConfigProvider;
use devswitch::Error as SwitchError;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(switch_error) = e.downcast_ref::<SwitchError>() {
            eprintln!("Error: {}", switch_error);
            if let Some(suggestion) = switch_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let provider = WorkspaceConfigProvider::new(&cli.projects_dir);
    let out = output::CliOutput;

    match cli.command {
        Commands::Plan { project } => commands::run_plan(&provider, &project, &out),
        Commands::Start {
            project,
            force,
            timeout,
        } => commands::run_start(&provider, &project, force, timeout.as_deref(), &out).await,
        Commands::Stop {
            project,
            force,
            service,
            timeout,
        } => {
            commands::run_stop(
                &provider,
                &project,
                service.as_deref(),
                force,
                timeout.as_deref(),
                &out,
            )
            .await
        }
        Commands::Switch { from, to, force } => {
            commands::run_switch(&provider, &from, &to, force, &out).await
        }
        Commands::Status { project } => commands::run_status(&provider, &project, &out).await,
        Commands::List => commands::run_list(&provider, &out),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
