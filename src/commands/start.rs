use super::parse_timeout;
use crate::output::UserOutput;
use devswitch::config::ConfigProvider;
use devswitch::orchestrator::{OperationOutcome, Orchestrator, StartOptions};

pub async fn run_start(
    provider: &dyn ConfigProvider,
    project: &str,
    force: bool,
    timeout: Option<&str>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let options = StartOptions {
        force,
        readiness_timeout: parse_timeout(timeout)?,
    };
    let project = provider.resolve(project)?;
    let orchestrator = Orchestrator::system(project.settings);

    let plan = orchestrator.create_startup_plan(&project)?;
    out.status(&format!("Starting '{}'...", project.name));
    let report = orchestrator.execute_start(&plan, &project, &options).await?;

    for service in &report.services {
        match &service.result {
            Ok(running) => out.service_line(
                &service.name,
                &format!("{} (PID {})", service.status, running.pid),
            ),
            Err(e) => out.service_line(&service.name, &format!("{}: {}", service.status, e)),
        }
    }

    if report.outcome == OperationOutcome::Completed {
        out.success(&report.summary());
        Ok(())
    } else {
        out.error(&report.summary());
        anyhow::bail!("{} service(s) failed to start", report.failures().len())
    }
}
