use super::stop::print_stop_report;
use crate::output::UserOutput;
use devswitch::config::ConfigProvider;
use devswitch::orchestrator::{Orchestrator, StartOptions, StopOptions};

pub async fn run_switch(
    provider: &dyn ConfigProvider,
    from: &str,
    to: &str,
    force: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let current = provider.resolve(from)?;
    let next = provider.resolve(to)?;
    let orchestrator = Orchestrator::system(current.settings);

    out.status(&format!("Switching from '{}' to '{}'...", current.name, next.name));
    let report = orchestrator
        .switch_projects(
            &current,
            &next,
            &StopOptions {
                force,
                timeout: None,
            },
            &StartOptions {
                force,
                readiness_timeout: None,
            },
        )
        .await?;

    print_stop_report(&report.stop, out);
    for service in &report.start.services {
        match &service.result {
            Ok(running) => out.service_line(
                &service.name,
                &format!("{} (PID {})", service.status, running.pid),
            ),
            Err(e) => out.service_line(&service.name, &format!("{}: {}", service.status, e)),
        }
    }
    out.success(&report.start.summary());
    Ok(())
}
