use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dsw")]
#[command(about = "devswitch - Switch your workstation between projects")]
pub struct Cli {
    /// Directory holding one subdirectory per project
    #[arg(short, long, env = "DEVSWITCH_PROJECTS_DIR", default_value = ".")]
    pub projects_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the startup phases of a project
    Plan {
        project: String,
    },
    /// Start a project's services
    Start {
        project: String,

        /// Start even if declared ports are already taken
        #[arg(long)]
        force: bool,

        /// Readiness timeout per service (e.g. 30s, 500ms)
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
    },
    /// Stop a project's running services
    Stop {
        project: String,

        /// Report success even if some services could not be stopped
        #[arg(long)]
        force: bool,

        /// Stop only this service
        #[arg(long, value_name = "NAME")]
        service: Option<String>,

        /// Overall stop budget (caps the grace window)
        #[arg(long, value_name = "DURATION")]
        timeout: Option<String>,
    },
    /// Stop one project and start another
    Switch {
        from: String,
        to: String,

        /// Continue even if services of FROM keep running, and ignore port conflicts
        #[arg(long)]
        force: bool,
    },
    /// Show which of a project's services are running
    Status {
        project: String,
    },
    /// List projects under the projects directory
    List,
}
