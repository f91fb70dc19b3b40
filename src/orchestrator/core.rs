use super::report::{
    ServiceStartResult, ServiceStopResult, StartOptions, StartReport, StopOptions, StopReport,
};
use crate::config::{EngineSettings, ResolvedProject, ServiceDescriptor};
use crate::dependency::{self, DependencyGraph, NodeStatus, StartupPlan};
use crate::error::{Error, Result};
use crate::port::ConflictDetector;
use crate::process::{tokenize_command, ProcessOps, SystemProcessOps};
use crate::service::{ProcessSupervisor, RunningService};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Result of switching from one project to another.
#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub stop: StopReport,
    pub start: StartReport,
}

/// Drives startup and shutdown plans.
///
/// Phases run strictly in order; services inside a phase run concurrently and
/// are all awaited before the next phase begins. A single service failing is
/// recorded and never aborts later phases.
pub struct Orchestrator {
    ops: Arc<dyn ProcessOps>,
    supervisor: ProcessSupervisor,
    detector: ConflictDetector,
    settings: EngineSettings,
}

impl Orchestrator {
    pub fn new(ops: Arc<dyn ProcessOps>, settings: EngineSettings) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(ops.clone(), settings),
            detector: ConflictDetector::new(ops.clone()),
            ops,
            settings,
        }
    }

    /// Orchestrator backed by real OS processes.
    pub fn system(settings: EngineSettings) -> Self {
        Self::new(Arc::new(SystemProcessOps::new()), settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn create_startup_plan(&self, project: &ResolvedProject) -> Result<StartupPlan> {
        dependency::create_startup_plan(&project.services)
    }

    /// Resolve and start a project in one call.
    pub async fn start(&self, project: &ResolvedProject, options: &StartOptions) -> Result<StartReport> {
        let plan = self.create_startup_plan(project)?;
        self.execute_start(&plan, project, options).await
    }

    /// Execute a startup plan.
    ///
    /// Fails before spawning anything on unforced port conflicts. Per-service
    /// launch failures end up in the report instead.
    pub async fn execute_start(
        &self,
        plan: &StartupPlan,
        project: &ResolvedProject,
        options: &StartOptions,
    ) -> Result<StartReport> {
        let conflicts = self.detector.find_conflicts(plan.services()).await;
        if !conflicts.is_empty() {
            if !options.force {
                return Err(Error::PortConflicts(conflicts));
            }
            for conflict in &conflicts {
                tracing::warn!("Starting despite conflict: {}", conflict);
            }
        }

        let descriptors: Vec<ServiceDescriptor> = plan.services().cloned().collect();
        let mut graph = DependencyGraph::build(&descriptors)?;
        let readiness_timeout = options
            .readiness_timeout
            .unwrap_or(self.settings.readiness_timeout);

        tracing::info!(
            "Starting project '{}': {} service(s) in {} phase(s)",
            project.name,
            plan.total_services(),
            plan.phase_count()
        );

        let mut results = Vec::with_capacity(plan.total_services());
        for (index, phase) in plan.phases().iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.inter_phase_delay).await;
            }

            tracing::info!(
                "Phase {}/{}: {}",
                index + 1,
                plan.phase_count(),
                phase
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for service in phase {
                graph.set_status(&service.name, NodeStatus::Starting);
            }

            let launches = phase
                .iter()
                .map(|service| self.supervisor.launch(service, project, readiness_timeout));
            let outcomes = join_all(launches).await;

            for (service, result) in phase.iter().zip(outcomes) {
                let status = match &result {
                    Ok(_) => NodeStatus::Ready,
                    Err(e) => {
                        tracing::warn!("Service '{}' failed: {}", service.name, e);
                        NodeStatus::Failed
                    }
                };
                graph.set_status(&service.name, status);
                results.push(ServiceStartResult {
                    name: service.name.clone(),
                    phase: index,
                    status,
                    result,
                });
            }
        }

        let report = StartReport::new(project.name.clone(), plan.phase_count(), results);
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Find the live process of every service.
    ///
    /// Services with a port are looked up by the listener on it. Portless
    /// services are matched by their exact command line.
    pub async fn discover_running(&self, descriptors: &[ServiceDescriptor]) -> Vec<RunningService> {
        let mut running = Vec::new();
        for service in descriptors {
            let found = match service.port {
                Some(port) => self.discover_by_port(service, port).await,
                None => self.discover_by_command(service).await,
            };
            running.extend(found);
        }
        running
    }

    async fn discover_by_port(&self, service: &ServiceDescriptor, port: u16) -> Option<RunningService> {
        if self.ops.is_port_free(port) {
            return None;
        }
        match self.ops.owner_of_port(port).await {
            Some(pid) => Some(RunningService::new(service.name.clone(), pid, Some(port))),
            None => {
                tracing::debug!(
                    "Port {} for '{}' is bound but its owner is unknown",
                    port,
                    service.name
                );
                None
            }
        }
    }

    async fn discover_by_command(&self, service: &ServiceDescriptor) -> Option<RunningService> {
        let (program, args) = tokenize_command(&service.command)?;
        let pids = self.ops.find_by_command(&program, &args).await;
        if pids.len() > 1 {
            tracing::warn!(
                "'{}' matches {} processes, taking a group leader",
                service.name,
                pids.len()
            );
        }
        let pid = pids
            .iter()
            .copied()
            .find(|pid| self.ops.process_group_of(*pid) == Some(*pid))
            .or_else(|| pids.first().copied())?;
        Some(RunningService::new(service.name.clone(), pid, None))
    }

    /// Terminate running services.
    ///
    /// With a plan, services go down in reversed phase order, each phase
    /// concurrently, and anything running outside the plan goes last. Without
    /// one, everything is terminated independently.
    pub async fn execute_stop(
        &self,
        running: &[RunningService],
        plan: Option<&StartupPlan>,
        options: &StopOptions,
    ) -> StopReport {
        let grace = self.grace_window(options.timeout);

        let batches: Vec<Vec<&RunningService>> = match plan {
            Some(plan) => {
                let shutdown = plan.shutdown_plan();
                let mut batches: Vec<Vec<&RunningService>> = shutdown
                    .phases()
                    .iter()
                    .map(|phase| {
                        running
                            .iter()
                            .filter(|r| phase.contains(&r.name))
                            .collect::<Vec<_>>()
                    })
                    .filter(|batch| !batch.is_empty())
                    .collect();
                let unplanned: Vec<&RunningService> = running
                    .iter()
                    .filter(|r| !shutdown.contains(&r.name))
                    .collect();
                if !unplanned.is_empty() {
                    batches.push(unplanned);
                }
                batches
            }
            None => vec![running.iter().collect()],
        };

        let mut results = Vec::with_capacity(running.len());
        for batch in batches {
            let terminations = batch
                .iter()
                .map(|service| self.supervisor.terminate(service, grace));
            let outcomes = join_all(terminations).await;

            for (service, result) in batch.into_iter().zip(outcomes) {
                match &result {
                    Ok(how) => tracing::info!("Service '{}' {}", service.name, how),
                    Err(e) => tracing::warn!("Failed to stop '{}': {}", service.name, e),
                }
                results.push(ServiceStopResult {
                    name: service.name.clone(),
                    pid: service.pid,
                    result,
                });
            }
        }

        let report = StopReport::new(results, options.force);
        tracing::info!("{}", report.summary());
        report
    }

    /// Stop one service, refusing while any of its direct dependents still run.
    pub async fn stop_service(
        &self,
        name: &str,
        descriptors: &[ServiceDescriptor],
        running: &[RunningService],
        options: &StopOptions,
    ) -> Result<StopReport> {
        let graph = DependencyGraph::build(descriptors)?;
        if graph.node(name).is_none() {
            return Err(Error::ServiceNotFound(name.to_string()));
        }

        let running_names: Vec<&str> = running.iter().map(|r| r.name.as_str()).collect();
        if !graph.can_stop_safely(name, &running_names) {
            let dependents = graph.running_dependents(name, &running_names);
            if !options.force {
                return Err(Error::DependentsRunning {
                    service: name.to_string(),
                    dependents,
                });
            }
            tracing::warn!(
                "Stopping '{}' while dependents are running: {}",
                name,
                dependents.join(", ")
            );
        }

        let target: Vec<RunningService> = running.iter().filter(|r| r.name == name).cloned().collect();
        if target.is_empty() {
            tracing::info!("Service '{}' is not running", name);
        }
        Ok(self.execute_stop(&target, None, options).await)
    }

    /// Stop everything `current` has running, then start `next`.
    ///
    /// Each side runs with its own project's engine settings. An aborted
    /// stop fails the switch before `next` is touched.
    pub async fn switch_projects(
        &self,
        current: &ResolvedProject,
        next: &ResolvedProject,
        stop_options: &StopOptions,
        start_options: &StartOptions,
    ) -> Result<SwitchReport> {
        let stopper = self.for_project(current);
        let current_plan = match stopper.create_startup_plan(current) {
            Ok(plan) => Some(plan),
            Err(e) => {
                tracing::warn!(
                    "Cannot plan shutdown of '{}' ({}), stopping services independently",
                    current.name,
                    e
                );
                None
            }
        };

        let running = stopper.discover_running(&current.services).await;
        let stop = stopper
            .execute_stop(&running, current_plan.as_ref(), stop_options)
            .await;
        if stop.is_aborted() {
            return Err(Error::StopAborted(stop.failed_names()));
        }

        let start = self.for_project(next).start(next, start_options).await?;
        Ok(SwitchReport { stop, start })
    }

    /// Same process layer, with `project`'s engine settings.
    pub fn for_project(&self, project: &ResolvedProject) -> Self {
        Self::new(self.ops.clone(), project.settings)
    }

    fn grace_window(&self, timeout: Option<Duration>) -> Duration {
        match timeout {
            Some(total) => self
                .settings
                .grace_period
                .min(total.saturating_sub(self.settings.kill_recheck_delay)),
            None => self.settings.grace_period,
        }
    }
}
