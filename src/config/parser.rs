use super::{ProjectConfig, ResolvedProject};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up inside each project directory.
pub const PROJECT_FILE: &str = "devswitch.yaml";
const PROJECT_FILE_ALT: &str = "devswitch.yml";

/// Supplies resolved service descriptors for a project name.
///
/// The engine never reads configuration files itself; callers hand it
/// whatever a provider returns.
pub trait ConfigProvider: Send + Sync {
    fn resolve(&self, project: &str) -> Result<ResolvedProject>;
}

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Find the project file inside a project directory.
    pub fn find_project_file(dir: &Path) -> Result<PathBuf> {
        let config_path = dir.join(PROJECT_FILE);
        if config_path.exists() {
            return Ok(config_path);
        }

        let alt_path = dir.join(PROJECT_FILE_ALT);
        if alt_path.exists() {
            return Ok(alt_path);
        }

        Err(Error::Config(format!(
            "Could not find {} in '{}'",
            PROJECT_FILE,
            dir.display()
        )))
    }

    /// Load config from file path
    pub fn load_config<P: AsRef<Path>>(&self, path: P) -> Result<ProjectConfig> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        self.parse_config(&content)
    }

    pub fn parse_config(&self, content: &str) -> Result<ProjectConfig> {
        let config: ProjectConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load and validate the project living in `dir`.
    pub fn load_project(&self, dir: &Path) -> Result<ResolvedProject> {
        let path = Self::find_project_file(dir)?;
        let config = self.load_config(&path)?;
        let fallback_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        config.resolve(&fallback_name, dir.to_path_buf())
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Projects laid out as `<projects_dir>/<project>/devswitch.yaml`.
#[derive(Debug, Clone)]
pub struct WorkspaceConfigProvider {
    projects_dir: PathBuf,
}

impl WorkspaceConfigProvider {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
        }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Names of every directory under the projects dir holding a project file.
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.projects_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() && Parser::find_project_file(&path).is_ok() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl ConfigProvider for WorkspaceConfigProvider {
    fn resolve(&self, project: &str) -> Result<ResolvedProject> {
        if project.is_empty() || project.contains(['/', '\\']) || project == ".." {
            return Err(Error::Config(format!("Invalid project name '{}'", project)));
        }
        let dir = self.projects_dir.join(project);
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Project '{}' not found under '{}'",
                project,
                self.projects_dir.display()
            )));
        }
        let resolved = Parser::new().load_project(&dir)?;
        tracing::debug!(
            "Loaded project '{}' with {} service(s) from {}",
            resolved.name,
            resolved.services.len(),
            dir.display()
        );
        Ok(resolved)
    }
}
