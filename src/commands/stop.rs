use super::parse_timeout;
use crate::output::UserOutput;
use devswitch::config::ConfigProvider;
use devswitch::orchestrator::{Orchestrator, StopOptions, StopReport};
use devswitch::Error;

pub async fn run_stop(
    provider: &dyn ConfigProvider,
    project: &str,
    service: Option<&str>,
    force: bool,
    timeout: Option<&str>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let options = StopOptions {
        force,
        timeout: parse_timeout(timeout)?,
    };
    let project = provider.resolve(project)?;
    if let Some(name) = service {
        if project.service(name).is_none() {
            return Err(Error::ServiceNotFound(name.to_string()).into());
        }
    }
    let orchestrator = Orchestrator::system(project.settings);

    let running = orchestrator.discover_running(&project.services).await;
    if running.is_empty() {
        out.status(&format!("No services of '{}' are running", project.name));
        return Ok(());
    }

    let report = match service {
        Some(name) => {
            orchestrator
                .stop_service(name, &project.services, &running, &options)
                .await?
        }
        None => {
            // A project that no longer resolves is still stoppable, just without ordering
            let plan = orchestrator.create_startup_plan(&project).ok();
            orchestrator
                .execute_stop(&running, plan.as_ref(), &options)
                .await
        }
    };

    print_stop_report(&report, out);
    if report.is_aborted() {
        return Err(Error::StopAborted(report.failed_names()).into());
    }
    Ok(())
}

pub(super) fn print_stop_report(report: &StopReport, out: &dyn UserOutput) {
    for service in &report.services {
        match &service.result {
            Ok(how) => out.service_line(&service.name, &how.to_string()),
            Err(e) => out.service_line(&service.name, &format!("failed: {}", e)),
        }
    }
    if report.failed_names().is_empty() {
        out.success(&report.summary());
    } else {
        out.warning(&report.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devswitch::config::{ResolvedProject, ServiceDescriptor};
    use parking_lot::Mutex;

    struct OneProject;

    impl ConfigProvider for OneProject {
        fn resolve(&self, _project: &str) -> devswitch::Result<ResolvedProject> {
            Ok(ResolvedProject::new("shop", "/tmp/shop")
                .with_service(ServiceDescriptor::new("db", "postgres")))
        }
    }

    #[derive(Default)]
    struct Recorded(Mutex<Vec<String>>);

    impl UserOutput for Recorded {
        fn status(&self, message: &str) {
            self.0.lock().push(message.to_string());
        }
        fn success(&self, message: &str) {
            self.status(message);
        }
        fn warning(&self, message: &str) {
            self.status(message);
        }
        fn error(&self, message: &str) {
            self.status(message);
        }
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected_before_discovery() {
        let out = Recorded::default();

        let err = run_stop(&OneProject, "shop", Some("ghost"), false, None, &out)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ServiceNotFound(name)) if name == "ghost"
        ));
        assert!(out.0.lock().is_empty());
    }
}
