//! Core configuration types.
//!
//! [`ProjectConfig`] is the root of a `devswitch.yaml` file. After validation it
//! becomes a [`ResolvedProject`], which is everything the engine needs.

use super::{ServiceConfig, ServiceDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for devswitch.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project-wide environment, overridable per service.
    #[serde(default)]
    pub environment: HashMap<String, super::EnvValue>,

    #[serde(default)]
    pub settings: SettingsConfig,

    /// Ordered by name so descriptor order is stable across loads.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Engine timing knobs as written in YAML (duration strings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portless_ready_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_phase_delay: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_poll_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_recheck_delay: Option<String>,
}

/// Fixed timing constants used by the supervisor and orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Wait after spawn before the liveness probe.
    pub settle_delay: Duration,
    pub readiness_poll_interval: Duration,
    /// Default readiness timeout when the caller supplies none.
    pub readiness_timeout: Duration,
    /// Services without a port are considered ready after this delay.
    pub portless_ready_delay: Duration,
    /// Pause between startup phases.
    pub inter_phase_delay: Duration,
    /// Time allowed between SIGTERM and SIGKILL.
    pub grace_period: Duration,
    pub termination_poll_interval: Duration,
    /// Wait after SIGKILL before the final liveness check.
    pub kill_recheck_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            readiness_poll_interval: Duration::from_millis(250),
            readiness_timeout: Duration::from_secs(30),
            portless_ready_delay: Duration::from_secs(1),
            inter_phase_delay: Duration::from_millis(1500),
            grace_period: Duration::from_secs(5),
            termination_poll_interval: Duration::from_millis(100),
            kill_recheck_delay: Duration::from_millis(500),
        }
    }
}

/// A project as handed to the engine by a config provider.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    pub name: String,
    /// Default working directory for every service.
    pub root: PathBuf,
    pub environment: HashMap<String, String>,
    pub services: Vec<ServiceDescriptor>,
    pub settings: EngineSettings,
}

impl ResolvedProject {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            environment: HashMap::new(),
            services: Vec::new(),
            settings: EngineSettings::default(),
        }
    }

    pub fn with_service(mut self, service: ServiceDescriptor) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }
}
