//! Service configuration types.
//!
//! [`ServiceConfig`] is the raw, loosely typed shape read from YAML. It is
//! validated into a [`ServiceDescriptor`], the only form the engine accepts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A port as written in YAML: `5432` or `"5432"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Convert to a TCP port, rejecting 0 and values above 65535.
    pub fn to_port(&self) -> std::result::Result<u16, String> {
        let raw = match self {
            PortValue::Number(n) => *n,
            PortValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not a number", s))?,
        };
        match u16::try_from(raw) {
            Ok(0) | Err(_) => Err(format!("{} is outside 1-65535", raw)),
            Ok(port) => Ok(port),
        }
    }
}

/// An environment value as written in YAML. Scalars are stringified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Anything else (lists, maps, null); rejected by validation.
    Other(serde_yaml::Value),
}

impl EnvValue {
    pub fn as_env_string(&self) -> Option<String> {
        match self {
            EnvValue::Text(s) => Some(s.clone()),
            EnvValue::Integer(i) => Some(i.to_string()),
            EnvValue::Float(f) => Some(f.to_string()),
            EnvValue::Bool(b) => Some(b.to_string()),
            EnvValue::Other(_) => None,
        }
    }
}

/// Dependency reference - supports both simple strings and structured refs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    Simple(String),
    Structured { service: String },
}

impl DependsOn {
    pub fn service_name(&self) -> &str {
        match self {
            DependsOn::Simple(name) => name,
            DependsOn::Structured { service } => service,
        }
    }
}

/// Raw service configuration for a single service in a project file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<PortValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<DependsOn>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, EnvValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_restart: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

/// Declarative record of one service's launch requirements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub command: String,
    pub port: Option<u16>,
    pub dependencies: BTreeSet<String>,
    pub environment: HashMap<String, String>,
    pub working_directory: Option<String>,
    /// Advisory only; the engine never restarts services.
    pub auto_restart: bool,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            port: None,
            dependencies: BTreeSet::new(),
            environment: HashMap::new(),
            working_directory: None,
            auto_restart: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_value_accepts_numbers_and_numeric_strings() {
        assert_eq!(PortValue::Number(5432).to_port(), Ok(5432));
        assert_eq!(PortValue::Text(" 8080 ".into()).to_port(), Ok(8080));
        assert!(PortValue::Number(0).to_port().is_err());
        assert!(PortValue::Number(70000).to_port().is_err());
        assert!(PortValue::Text("http".into()).to_port().is_err());
    }

    #[test]
    fn env_values_are_stringified() {
        let env: HashMap<String, EnvValue> =
            serde_yaml::from_str("A: text\nB: 42\nC: true\nD: 1.5\nE: [1, 2]").unwrap();
        assert_eq!(env["A"].as_env_string().as_deref(), Some("text"));
        assert_eq!(env["B"].as_env_string().as_deref(), Some("42"));
        assert_eq!(env["C"].as_env_string().as_deref(), Some("true"));
        assert_eq!(env["D"].as_env_string().as_deref(), Some("1.5"));
        assert_eq!(env["E"].as_env_string(), None);
    }

    #[test]
    fn depends_on_accepts_both_forms() {
        let deps: Vec<DependsOn> = serde_yaml::from_str("- db\n- service: cache").unwrap();
        let names: Vec<&str> = deps.iter().map(|d| d.service_name()).collect();
        assert_eq!(names, vec!["db", "cache"]);
    }
}
