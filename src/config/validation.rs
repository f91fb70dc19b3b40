use super::{
    parse_duration_string, EngineSettings, ProjectConfig, ResolvedProject, ServiceDescriptor,
    SettingsConfig,
};
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

impl ProjectConfig {
    /// Validate the configuration and turn it into engine input.
    ///
    /// Every problem is collected before returning so the operator can fix
    /// the file in one pass. Dependency references are left to the resolver.
    pub fn resolve(&self, fallback_name: &str, root: PathBuf) -> Result<ResolvedProject> {
        let mut problems = Vec::new();

        let settings = self.settings.to_engine_settings(&mut problems);

        let mut environment = HashMap::new();
        for (key, value) in &self.environment {
            match value.as_env_string() {
                Some(v) => {
                    environment.insert(key.clone(), v);
                }
                None => problems.push(format!(
                    "environment.{}: value must be a string, number or boolean",
                    key
                )),
            }
        }

        let mut services = Vec::with_capacity(self.services.len());
        for (name, service) in &self.services {
            if name.trim().is_empty() {
                problems.push("services: service names cannot be empty".to_string());
                continue;
            }

            let command = match service.command.as_deref().map(str::trim) {
                Some(cmd) if !cmd.is_empty() => cmd.to_string(),
                _ => {
                    problems.push(format!("services.{}.command: a command is required", name));
                    continue;
                }
            };

            let port = match service.port.as_ref().map(|p| p.to_port()).transpose() {
                Ok(port) => port,
                Err(reason) => {
                    problems.push(format!("services.{}.port: {}", name, reason));
                    None
                }
            };

            let mut service_env = HashMap::new();
            for (key, value) in &service.environment {
                match value.as_env_string() {
                    Some(v) => {
                        service_env.insert(key.clone(), v);
                    }
                    None => problems.push(format!(
                        "services.{}.environment.{}: value must be a string, number or boolean",
                        name, key
                    )),
                }
            }

            let dependencies: BTreeSet<String> = service
                .depends_on
                .iter()
                .map(|d| d.service_name().to_string())
                .collect();
            if dependencies.contains(name) {
                problems.push(format!("services.{}.depends_on: a service cannot depend on itself", name));
            }

            services.push(ServiceDescriptor {
                name: name.clone(),
                command,
                port,
                dependencies,
                environment: service_env,
                working_directory: service.cwd.clone(),
                auto_restart: service.auto_restart,
            });
        }

        let mut port_owners: HashMap<u16, &str> = HashMap::new();
        for service in &services {
            if let Some(port) = service.port {
                if let Some(other) = port_owners.insert(port, &service.name) {
                    problems.push(format!(
                        "services.{}.port: port {} is also declared by '{}'",
                        service.name, port, other
                    ));
                }
            }
        }

        if !problems.is_empty() {
            return Err(Error::Validation(problems));
        }

        Ok(ResolvedProject {
            name: self.name.clone().unwrap_or_else(|| fallback_name.to_string()),
            root,
            environment,
            services,
            settings,
        })
    }
}

impl SettingsConfig {
    fn to_engine_settings(&self, problems: &mut Vec<String>) -> EngineSettings {
        let defaults = EngineSettings::default();
        let mut parse = |field: &str, value: &Option<String>, default: Duration| -> Duration {
            match value {
                None => default,
                Some(raw) => parse_duration_string(raw).unwrap_or_else(|| {
                    problems.push(format!(
                        "settings.{}: invalid duration '{}'. Use formats like '5s', '1500ms', '1m'",
                        field, raw
                    ));
                    default
                }),
            }
        };

        EngineSettings {
            settle_delay: parse("settle_delay", &self.settle_delay, defaults.settle_delay),
            readiness_poll_interval: parse(
                "readiness_poll_interval",
                &self.readiness_poll_interval,
                defaults.readiness_poll_interval,
            ),
            readiness_timeout: parse(
                "readiness_timeout",
                &self.readiness_timeout,
                defaults.readiness_timeout,
            ),
            portless_ready_delay: parse(
                "portless_ready_delay",
                &self.portless_ready_delay,
                defaults.portless_ready_delay,
            ),
            inter_phase_delay: parse(
                "inter_phase_delay",
                &self.inter_phase_delay,
                defaults.inter_phase_delay,
            ),
            grace_period: parse("grace_period", &self.grace_period, defaults.grace_period),
            termination_poll_interval: parse(
                "termination_poll_interval",
                &self.termination_poll_interval,
                defaults.termination_poll_interval,
            ),
            kill_recheck_delay: parse(
                "kill_recheck_delay",
                &self.kill_recheck_delay,
                defaults.kill_recheck_delay,
            ),
        }
    }
}
