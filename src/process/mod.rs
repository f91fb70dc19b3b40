//! OS process boundary.
//!
//! Everything that touches real processes, signals or sockets goes through
//! [`ProcessOps`], so the supervisor and orchestrator can run against a fake.

mod scan;
mod system;

pub use scan::{find_pids_by_command, matches_command};
pub use system::{SystemProcessHandle, SystemProcessOps};

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// A fully resolved launch: no shell, no further lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// The child's entire environment.
    pub environment: HashMap<String, String>,
}

/// Handle on a freshly spawned child. Owned by exactly one launch.
pub trait ProcessHandle: Send {
    fn pid(&self) -> Option<u32>;

    /// Non-blocking exit check. Reaps the child if it has exited.
    fn has_exited(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGTERM
    Graceful,
    /// SIGKILL
    Forceful,
}

/// Result of delivering a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDelivery {
    Delivered,
    NoSuchProcess,
}

#[async_trait]
pub trait ProcessOps: Send + Sync {
    /// Spawn detached: own process group, null stdio, survives handle drop.
    fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>>;

    /// Zero-signal probe. Zombies count as dead.
    fn is_alive(&self, pid: u32) -> bool;

    fn terminate(&self, pid: u32, signal: TerminationSignal) -> Result<SignalDelivery>;

    fn is_port_free(&self, port: u16) -> bool;

    /// Best-effort lookup of the process listening on `port`.
    async fn owner_of_port(&self, port: u16) -> Option<u32>;

    /// Process group id of `pid`, if it can be read.
    fn process_group_of(&self, pid: u32) -> Option<u32>;

    /// Live processes whose argument vector is exactly `program` plus `args`.
    async fn find_by_command(&self, program: &str, args: &[String]) -> Vec<u32>;
}

/// Split a command on whitespace into program and arguments.
///
/// Quoting is not interpreted. Returns `None` for a blank command.
pub fn tokenize_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = command.split_whitespace().map(str::to_string);
    let program = tokens.next()?;
    Some((program, tokens.collect()))
}

/// Merge environment layers; each later layer overrides the one before.
pub fn compose_environment<I>(
    system: I,
    project: &HashMap<String, String>,
    service: &HashMap<String, String>,
) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut merged: HashMap<String, String> = system.into_iter().collect();
    for (key, value) in project.iter().chain(service.iter()) {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
