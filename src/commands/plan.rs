use crate::output::UserOutput;
use devswitch::config::{format_duration, ConfigProvider, WorkspaceConfigProvider};
use devswitch::create_startup_plan;

pub fn run_plan(
    provider: &dyn ConfigProvider,
    project: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let project = provider.resolve(project)?;
    let plan = create_startup_plan(&project.services)?;

    out.status(&format!(
        "Project '{}': {} service(s) in {} phase(s)",
        project.name,
        plan.total_services(),
        plan.phase_count()
    ));
    for (index, phase) in plan.phase_names().iter().enumerate() {
        out.status(&format!("  Phase {}: {}", index + 1, phase.join(", ")));
    }
    let settings = &project.settings;
    out.status(&format!(
        "Readiness timeout {}, grace period {}, {} between phases",
        format_duration(settings.readiness_timeout),
        format_duration(settings.grace_period),
        format_duration(settings.inter_phase_delay)
    ));
    Ok(())
}

pub fn run_list(provider: &WorkspaceConfigProvider, out: &dyn UserOutput) -> anyhow::Result<()> {
    let projects = provider.list_projects()?;
    if projects.is_empty() {
        out.warning(&format!(
            "No projects found under {}",
            provider.projects_dir().display()
        ));
    }
    for name in projects {
        out.status(&name);
    }
    Ok(())
}
