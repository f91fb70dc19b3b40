use crate::dependency::NodeStatus;
use crate::error::{LaunchError, TerminationError};
use crate::service::{RunningService, Termination};
use std::fmt;
use std::time::Duration;

/// Terminal state of a start or stop operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Completed,
    CompletedWithFailures,
    Aborted,
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutcome::Completed => write!(f, "completed"),
            OperationOutcome::CompletedWithFailures => write!(f, "completed with failures"),
            OperationOutcome::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Start despite port conflicts.
    pub force: bool,
    /// Per-service readiness timeout. Falls back to the engine setting.
    pub readiness_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct StopOptions {
    /// Report success even if some services could not be stopped.
    pub force: bool,
    /// Overall budget. The grace window is capped below it.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ServiceStartResult {
    pub name: String,
    /// Zero-based startup phase.
    pub phase: usize,
    /// `Ready` or `Failed` once the phase has run.
    pub status: NodeStatus,
    pub result: Result<RunningService, LaunchError>,
}

impl ServiceStartResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct StartReport {
    pub project: String,
    pub phase_count: usize,
    pub services: Vec<ServiceStartResult>,
    pub outcome: OperationOutcome,
}

impl StartReport {
    pub(crate) fn new(project: String, phase_count: usize, services: Vec<ServiceStartResult>) -> Self {
        let outcome = if services.iter().all(ServiceStartResult::is_success) {
            OperationOutcome::Completed
        } else {
            OperationOutcome::CompletedWithFailures
        };
        Self {
            project,
            phase_count,
            services,
            outcome,
        }
    }

    pub fn successful(&self) -> usize {
        self.services.iter().filter(|s| s.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.services.len()
    }

    pub fn running(&self) -> Vec<&RunningService> {
        self.services
            .iter()
            .filter_map(|s| s.result.as_ref().ok())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &LaunchError)> {
        self.services
            .iter()
            .filter_map(|s| s.result.as_ref().err().map(|e| (s.name.as_str(), e)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceStartResult> {
        self.services.iter().find(|s| s.name == name)
    }

    /// `"2/3 services started across 2 phases"`
    pub fn summary(&self) -> String {
        format!(
            "{}/{} services started across {} phase{}",
            self.successful(),
            self.total(),
            self.phase_count,
            if self.phase_count == 1 { "" } else { "s" }
        )
    }
}

#[derive(Debug, Clone)]
pub struct ServiceStopResult {
    pub name: String,
    pub pid: u32,
    pub result: Result<Termination, TerminationError>,
}

#[derive(Debug, Clone)]
pub struct StopReport {
    pub services: Vec<ServiceStopResult>,
    pub outcome: OperationOutcome,
}

impl StopReport {
    pub(crate) fn new(services: Vec<ServiceStopResult>, force: bool) -> Self {
        let failed = services.iter().any(|s| s.result.is_err());
        let outcome = match (failed, force) {
            (false, _) => OperationOutcome::Completed,
            (true, true) => OperationOutcome::CompletedWithFailures,
            (true, false) => OperationOutcome::Aborted,
        };
        Self { services, outcome }
    }

    pub fn is_aborted(&self) -> bool {
        self.outcome == OperationOutcome::Aborted
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.services
            .iter()
            .filter(|s| s.result.is_err())
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceStopResult> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn summary(&self) -> String {
        let stopped = self.services.iter().filter(|s| s.result.is_ok()).count();
        format!("{}/{} services stopped ({})", stopped, self.services.len(), self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(name: &str, phase: usize) -> ServiceStartResult {
        ServiceStartResult {
            name: name.to_string(),
            phase,
            status: NodeStatus::Ready,
            result: Ok(RunningService::new(name, 100, None)),
        }
    }

    #[test]
    fn test_start_summary() {
        let mut failed = started("api", 1);
        failed.status = NodeStatus::Failed;
        failed.result = Err(LaunchError::CrashedImmediately { pid: 7 });
        let report = StartReport::new("shop".into(), 2, vec![started("db", 0), failed]);

        assert_eq!(report.summary(), "1/2 services started across 2 phases");
        assert_eq!(report.outcome, OperationOutcome::CompletedWithFailures);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.running()[0].name, "db");
    }

    #[test]
    fn test_stop_outcome_depends_on_force() {
        let results = vec![ServiceStopResult {
            name: "db".into(),
            pid: 10,
            result: Err(TerminationError::StillAlive { pid: 10 }),
        }];
        assert!(StopReport::new(results.clone(), false).is_aborted());
        assert_eq!(
            StopReport::new(results, true).outcome,
            OperationOutcome::CompletedWithFailures
        );
        assert_eq!(StopReport::new(vec![], false).outcome, OperationOutcome::Completed);
    }
}
