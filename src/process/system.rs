use super::scan;
use super::{LaunchSpec, ProcessHandle, ProcessOps, SignalDelivery, TerminationSignal};
use crate::error::{validate_pid_for_check, Error, Result};
use crate::port;
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, killpg, Signal};
use nix::unistd::getpgid;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Real processes via `tokio::process` and `nix` signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessOps;

impl SystemProcessOps {
    pub fn new() -> Self {
        Self
    }
}

pub struct SystemProcessHandle {
    child: Child,
}

impl ProcessHandle for SystemProcessHandle {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_status)) => true,
            Ok(None) => false,
            Err(_) => true,
        }
    }
}

#[async_trait]
impl ProcessOps for SystemProcessOps {
    fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>> {
        tracing::debug!(
            "Spawning {:?} with args {:?} in {}",
            spec.program,
            spec.args,
            spec.working_dir.display()
        );

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .env_clear()
            .envs(&spec.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| Error::Process(format!("failed to spawn '{}': {}", spec.program, e)))?;

        Ok(Box::new(SystemProcessHandle { child }))
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Some(nix_pid) = validate_pid_for_check(pid) else {
            return false;
        };

        match signal::kill(nix_pid, None) {
            // EPERM: exists but owned by someone else
            Ok(()) | Err(Errno::EPERM) => {}
            Err(_) => return false,
        }

        #[cfg(target_os = "linux")]
        if let Some(state) = proc_state(pid) {
            return !matches!(state, 'Z' | 'T' | 'X' | 'x');
        }

        true
    }

    fn terminate(&self, pid: u32, signal: TerminationSignal) -> Result<SignalDelivery> {
        let nix_pid = validate_pid_for_check(pid).ok_or_else(|| Error::InvalidPid {
            pid,
            reason: "not a signalable process id".to_string(),
        })?;
        let sig = match signal {
            TerminationSignal::Graceful => Signal::SIGTERM,
            TerminationSignal::Forceful => Signal::SIGKILL,
        };

        // Services are spawned as group leaders, so pgid == pid.
        if killpg(nix_pid, sig).is_ok() {
            return Ok(SignalDelivery::Delivered);
        }
        tracing::debug!("killpg({}) failed, signalling the pid alone", pid);

        match signal::kill(nix_pid, sig) {
            Ok(()) => Ok(SignalDelivery::Delivered),
            Err(Errno::ESRCH) => Ok(SignalDelivery::NoSuchProcess),
            Err(e) => Err(Error::Process(format!(
                "failed to send {:?} to PID {}: {}",
                sig, pid, e
            ))),
        }
    }

    fn is_port_free(&self, port: u16) -> bool {
        port::is_port_available(port)
    }

    async fn owner_of_port(&self, port: u16) -> Option<u32> {
        port::find_pids_on_port(port).await.into_iter().next()
    }

    fn process_group_of(&self, pid: u32) -> Option<u32> {
        let nix_pid = validate_pid_for_check(pid)?;
        getpgid(Some(nix_pid))
            .ok()
            .and_then(|pgid| u32::try_from(pgid.as_raw()).ok())
    }

    async fn find_by_command(&self, program: &str, args: &[String]) -> Vec<u32> {
        scan::find_pids_by_command(program, args)
            .await
            .into_iter()
            .filter(|pid| self.is_alive(*pid))
            .collect()
    }
}

/// Single-letter state from `/proc/<pid>/status`, e.g. `Z` for zombie.
#[cfg(target_os = "linux")]
fn proc_state(pid: u32) -> Option<char> {
    let content = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    parse_state_line(&content)
}

#[cfg(target_os = "linux")]
fn parse_state_line(status: &str) -> Option<char> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("State:"))
        .and_then(|rest| rest.chars().find(|c| c.is_alphabetic()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_parse_state_line() {
        let status = "Name:\tsleep\nUmask:\t0022\nState:\tZ (zombie)\nTgid:\t42\n";
        assert_eq!(parse_state_line(status), Some('Z'));
        assert_eq!(parse_state_line("State:\tS (sleeping)"), Some('S'));
        assert_eq!(parse_state_line("Name:\tx"), None);
    }

    #[test]
    fn test_current_process_is_alive() {
        let ops = SystemProcessOps::new();
        assert!(ops.is_alive(std::process::id()));
        assert!(!ops.is_alive(0));
        assert!(!ops.is_alive(u32::MAX));
    }

    #[test]
    fn test_process_group_of_current_process() {
        let ops = SystemProcessOps::new();
        let own = nix::unistd::getpgrp().as_raw() as u32;
        assert_eq!(ops.process_group_of(std::process::id()), Some(own));
        assert_eq!(ops.process_group_of(u32::MAX), None);
    }

    #[test]
    fn test_terminate_rejects_out_of_range_pid() {
        let ops = SystemProcessOps::new();
        assert!(matches!(
            ops.terminate(u32::MAX, TerminationSignal::Graceful),
            Err(Error::InvalidPid { .. })
        ));
    }
}
