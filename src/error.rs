// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// A dependency reference that points at a service not present in the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDependency {
    pub service: String,
    pub dependency: String,
}

impl std::fmt::Display for UnknownDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "service '{}' depends on unknown service '{}'",
            self.service, self.dependency
        )
    }
}

/// A declared port that is already bound by some other process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConflict {
    pub service: String,
    pub port: u16,
    /// Owning process, when it could be resolved.
    pub pid: Option<u32>,
}

impl std::fmt::Display for PortConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pid {
            Some(pid) => write!(
                f,
                "service '{}': port {} is in use by PID {}",
                self.service, self.port, pid
            ),
            None => write!(f, "service '{}': port {} is in use", self.service, self.port),
        }
    }
}

fn bullet_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration:\n{}", bullet_list(.0))]
    #[diagnostic(
        code(devswitch::config::validation),
        help("Fix the listed fields in the project's devswitch.yaml")
    )]
    Validation(Vec<String>),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Duplicate service name '{0}'")]
    #[diagnostic(code(devswitch::dependency::duplicate))]
    DuplicateService(String),

    #[error("Unknown dependencies:\n{}", bullet_list(.0))]
    #[diagnostic(
        code(devswitch::dependency::unknown),
        help("Every name in depends_on must be another service of the same project")
    )]
    UnknownDependencies(Vec<UnknownDependency>),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    #[diagnostic(
        code(devswitch::dependency::circular),
        help("Services cannot depend on each other in a cycle. Review the depends_on fields")
    )]
    CircularDependency(Vec<String>),

    #[error("Unable to place services into startup phases: {}", .0.join(", "))]
    #[diagnostic(code(devswitch::dependency::unplaceable))]
    UnplaceableServices(Vec<String>),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Port conflicts detected:\n{}", bullet_list(.0))]
    #[diagnostic(
        code(devswitch::port::conflict),
        help("Stop the processes holding these ports, change the ports, or retry with --force")
    )]
    PortConflicts(Vec<PortConflict>),

    #[error("Cannot stop '{service}': running dependents {}", .dependents.join(", "))]
    #[diagnostic(
        code(devswitch::service::dependents_running),
        help("Stop the dependents first, or retry with --force")
    )]
    DependentsRunning {
        service: String,
        dependents: Vec<String>,
    },

    #[error("Stop aborted: {} service(s) could not be stopped: {}", .0.len(), .0.join(", "))]
    #[diagnostic(
        code(devswitch::stop::aborted),
        help("Retry with --force to continue even if some services could not be stopped")
    )]
    StopAborted(Vec<String>),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Invalid PID {pid}: {reason}")]
    InvalidPid { pid: u32, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors raised while resolving the dependency graph.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::DuplicateService(_)
                | Error::UnknownDependencies(_)
                | Error::CircularDependency(_)
                | Error::UnplaceableServices(_)
        )
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::CircularDependency(path) => Some(format!(
                "Services cannot depend on each other in a cycle. Review the depends_on fields for: {}",
                path.join(", ")
            )),
            Error::UnknownDependencies(missing) => Some(format!(
                "Declare the missing service(s) or remove them from depends_on: {}",
                missing
                    .iter()
                    .map(|m| m.dependency.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Error::PortConflicts(conflicts) => {
                let hints: Vec<String> = conflicts
                    .iter()
                    .map(|c| match c.pid {
                        Some(pid) => format!("kill PID {} (port {})", pid, c.port),
                        None => format!("lsof -i :{} to find the owner", c.port),
                    })
                    .collect();
                Some(format!(
                    "{}. Or pass --force to start anyway.",
                    hints.join("; ")
                ))
            }
            Error::DependentsRunning { dependents, .. } => Some(format!(
                "Stop {} first, or pass --force.",
                dependents.join(", ")
            )),
            Error::StopAborted(_) => {
                Some("Pass --force to switch even if some services keep running.".to_string())
            }
            Error::Config(_) | Error::Validation(_) | Error::Yaml(_) => {
                Some("Check the project's devswitch.yaml".to_string())
            }
            _ => None,
        }
    }
}

/// Failure to bring a single service up. Recorded against that service only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("failed to start: {0}")]
    FailedToStart(String),

    #[error("started as PID {pid} but crashed immediately")]
    CrashedImmediately { pid: u32 },

    #[error("PID {pid} exited before port {port} became ready")]
    ExitedBeforeReady { pid: u32, port: u16 },

    #[error("did not become ready: port {port} not bound within {timeout:?}")]
    ReadinessTimeout { port: u16, timeout: Duration },
}

/// Failure to bring a single service down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminationError {
    #[error("PID {pid} still alive after forceful kill")]
    StillAlive { pid: u32 },

    #[error("could not signal PID {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error("refusing to signal PID {pid}: {reason}")]
    InvalidPid { pid: u32, reason: String },
}

/// Validates and converts a u32 PID to nix::unistd::Pid safely.
/// Returns Err for PID 0 (process group), PID 1 (init), or values > i32::MAX.
pub fn validate_pid(pid: u32, service_name: &str) -> Result<nix::unistd::Pid> {
    if pid == 0 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!(
                "PID 0 is invalid for service '{}' (refers to process group, not a process)",
                service_name
            ),
        });
    }
    if pid == 1 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!(
                "refusing to operate on PID 1 (init) for service '{}'",
                service_name
            ),
        });
    }
    if pid > i32::MAX as u32 {
        return Err(Error::InvalidPid {
            pid,
            reason: format!(
                "PID {} exceeds i32::MAX for service '{}', cannot convert safely",
                pid, service_name
            ),
        });
    }
    Ok(nix::unistd::Pid::from_raw(pid as i32))
}

/// Same as validate_pid but allows PID 1, for read-only existence checks.
pub fn validate_pid_for_check(pid: u32) -> Option<nix::unistd::Pid> {
    if pid == 0 || pid > i32::MAX as u32 {
        return None;
    }
    Some(nix::unistd::Pid::from_raw(pid as i32))
}
