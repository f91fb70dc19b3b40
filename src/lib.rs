#![allow(unused_assignments)]

//! # devswitch
//!
//! Switch a developer workstation between projects by bringing each
//! project's local services up and down in dependency order.
//!
//! ## Features
//!
//! - **Dependency Resolution**: Unknown references and cycles are reported before anything is spawned
//! - **Phased Startup**: Services with no mutual dependencies start concurrently
//! - **Readiness Gating**: Liveness probe after spawn, then port polling
//! - **Port Conflict Detection**: Occupied ports are reported with their owning PID
//! - **Escalating Termination**: SIGTERM, a grace window, then SIGKILL
//!
//! ## Quick Start
//!
//! ```no_run
//! use devswitch::config::{ConfigProvider, WorkspaceConfigProvider};
//! use devswitch::orchestrator::{Orchestrator, StartOptions};
//!
//! # async fn example() -> Result<(), devswitch::Error> {
//! let provider = WorkspaceConfigProvider::new("/home/me/projects");
//! let project = provider.resolve("shop")?;
//!
//! let orchestrator = Orchestrator::system(project.settings);
//! let plan = orchestrator.create_startup_plan(&project)?;
//! let report = orchestrator
//!     .execute_start(&plan, &project, &StartOptions::default())
//!     .await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! Phases run one after another; services inside a phase are launched (or
//! terminated) concurrently and all awaited before the next phase. All OS
//! access goes through [`process::ProcessOps`], injected at construction.

pub mod config;
pub mod dependency;
pub mod error;
pub mod orchestrator;
pub mod port;
pub mod process;
pub mod service;

// Re-export commonly used types
pub use config::{ConfigProvider, EngineSettings, ResolvedProject, ServiceDescriptor};
pub use dependency::{create_startup_plan, StartupPlan};
pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
