use crate::output::UserOutput;
use devswitch::config::ConfigProvider;
use devswitch::orchestrator::Orchestrator;

pub async fn run_status(
    provider: &dyn ConfigProvider,
    project: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let project = provider.resolve(project)?;
    let orchestrator = Orchestrator::system(project.settings);
    let running = orchestrator.discover_running(&project.services).await;

    out.status(&format!("Project '{}':", project.name));
    for service in &project.services {
        let detail = match (running.iter().find(|r| r.name == service.name), service.port) {
            (Some(r), _) => format!("running (PID {})", r.pid),
            (None, Some(port)) => format!("stopped (port {})", port),
            (None, None) => "unknown (no port to probe)".to_string(),
        };
        out.service_line(&service.name, &detail);
    }
    Ok(())
}
