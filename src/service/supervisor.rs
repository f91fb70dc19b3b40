use super::{RunningService, Termination};
use crate::config::{EngineSettings, ResolvedProject, ServiceDescriptor};
use crate::error::{validate_pid, Error, LaunchError, TerminationError};
use crate::process::{
    compose_environment, tokenize_command, LaunchSpec, ProcessHandle, ProcessOps, SignalDelivery,
    TerminationSignal,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Launches and terminates single services.
///
/// The supervisor holds no per-service state: the spawn handle lives only for
/// the duration of [`launch`](Self::launch), after which the process is left
/// running detached.
#[derive(Clone)]
pub struct ProcessSupervisor {
    ops: Arc<dyn ProcessOps>,
    settings: EngineSettings,
}

impl ProcessSupervisor {
    pub fn new(ops: Arc<dyn ProcessOps>, settings: EngineSettings) -> Self {
        Self { ops, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Resolve program, arguments, working directory and environment.
    pub fn prepare(
        &self,
        descriptor: &ServiceDescriptor,
        project: &ResolvedProject,
    ) -> Result<LaunchSpec, LaunchError> {
        let (program, args) = tokenize_command(&descriptor.command)
            .ok_or_else(|| LaunchError::FailedToStart("empty command".to_string()))?;

        let working_dir = match &descriptor.working_directory {
            Some(dir) if Path::new(dir).is_absolute() => Path::new(dir).to_path_buf(),
            Some(dir) => project.root.join(dir),
            None => project.root.clone(),
        };

        let environment = compose_environment(
            std::env::vars(),
            &project.environment,
            &descriptor.environment,
        );

        Ok(LaunchSpec {
            program,
            args,
            working_dir,
            environment,
        })
    }

    /// Spawn a service and wait until it is alive and ready.
    #[tracing::instrument(skip_all, fields(service = %descriptor.name))]
    pub async fn launch(
        &self,
        descriptor: &ServiceDescriptor,
        project: &ResolvedProject,
        readiness_timeout: Duration,
    ) -> Result<RunningService, LaunchError> {
        let spec = self.prepare(descriptor, project)?;

        let preoccupied = match descriptor.port {
            Some(port) if !self.ops.is_port_free(port) => {
                tracing::warn!(
                    "Port {} for '{}' is already bound before launch",
                    port,
                    descriptor.name
                );
                true
            }
            _ => false,
        };

        let mut handle = self.ops.spawn(&spec).map_err(|e| {
            tracing::error!("Failed to spawn '{}': {}", descriptor.name, e);
            LaunchError::FailedToStart(e.to_string())
        })?;
        let pid = handle
            .pid()
            .ok_or_else(|| LaunchError::FailedToStart("no process id assigned".to_string()))?;
        tracing::debug!("Spawned '{}' as PID {}", descriptor.name, pid);

        sleep(self.settings.settle_delay).await;
        if handle.has_exited() || !self.ops.is_alive(pid) {
            tracing::warn!("'{}' (PID {}) exited during startup", descriptor.name, pid);
            return Err(LaunchError::CrashedImmediately { pid });
        }

        match descriptor.port {
            Some(port) => {
                self.await_port(handle.as_mut(), pid, port, preoccupied, readiness_timeout)
                    .await?
            }
            None => sleep(self.settings.portless_ready_delay).await,
        }

        tracing::info!("Service '{}' is ready (PID {})", descriptor.name, pid);
        Ok(RunningService::new(descriptor.name.clone(), pid, descriptor.port))
    }

    /// Poll until `port` is bound by `pid` or its process group.
    ///
    /// A listener whose owner cannot be resolved counts only when the port
    /// was free before launch.
    async fn await_port(
        &self,
        handle: &mut dyn ProcessHandle,
        pid: u32,
        port: u16,
        preoccupied: bool,
        timeout: Duration,
    ) -> Result<(), LaunchError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.ops.is_port_free(port) && self.owns_port(pid, port, preoccupied).await {
                return Ok(());
            }
            if handle.has_exited() || !self.ops.is_alive(pid) {
                return Err(LaunchError::ExitedBeforeReady { pid, port });
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(LaunchError::ReadinessTimeout { port, timeout });
            }
            sleep(self.settings.readiness_poll_interval.min(deadline - now)).await;
        }
    }

    async fn owns_port(&self, pid: u32, port: u16, preoccupied: bool) -> bool {
        match self.ops.owner_of_port(port).await {
            Some(owner) if owner == pid => true,
            Some(owner) => {
                let ours = self.ops.process_group_of(owner) == Some(pid);
                if !ours {
                    tracing::debug!("Port {} is held by PID {}, not by PID {}", port, owner, pid);
                }
                ours
            }
            None => !preoccupied,
        }
    }

    /// SIGTERM, wait up to `grace`, then exactly one SIGKILL and one re-check.
    #[tracing::instrument(skip_all, fields(service = %running.name, pid = running.pid))]
    pub async fn terminate(
        &self,
        running: &RunningService,
        grace: Duration,
    ) -> Result<Termination, TerminationError> {
        let pid = running.pid;
        if let Err(e) = validate_pid(pid, &running.name) {
            let reason = match e {
                Error::InvalidPid { reason, .. } => reason,
                other => other.to_string(),
            };
            return Err(TerminationError::InvalidPid { pid, reason });
        }

        if !self.ops.is_alive(pid) {
            return Ok(Termination::AlreadyExited);
        }

        match self.ops.terminate(pid, TerminationSignal::Graceful) {
            Ok(SignalDelivery::Delivered) => {}
            Ok(SignalDelivery::NoSuchProcess) => return Ok(Termination::AlreadyExited),
            Err(e) => {
                return Err(TerminationError::SignalFailed {
                    pid,
                    reason: e.to_string(),
                })
            }
        }

        let deadline = Instant::now() + grace;
        loop {
            if !self.ops.is_alive(pid) {
                tracing::debug!("'{}' exited after SIGTERM", running.name);
                return Ok(Termination::Graceful);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(self.settings.termination_poll_interval.min(deadline - now)).await;
        }

        tracing::warn!(
            "'{}' (PID {}) did not exit within {:?}, sending SIGKILL",
            running.name,
            pid,
            grace
        );
        match self.ops.terminate(pid, TerminationSignal::Forceful) {
            Ok(SignalDelivery::Delivered) => {}
            Ok(SignalDelivery::NoSuchProcess) => return Ok(Termination::Graceful),
            Err(e) => {
                return Err(TerminationError::SignalFailed {
                    pid,
                    reason: e.to_string(),
                })
            }
        }

        sleep(self.settings.kill_recheck_delay).await;
        if self.ops.is_alive(pid) {
            tracing::error!("'{}' (PID {}) survived SIGKILL", running.name, pid);
            return Err(TerminationError::StillAlive { pid });
        }
        Ok(Termination::Forced)
    }
}
