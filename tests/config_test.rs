use devswitch::config::{ConfigProvider, WorkspaceConfigProvider, PROJECT_FILE};
use devswitch::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write_project(root: &Path, name: &str, yaml: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("create project dir");
    fs::write(dir.join(PROJECT_FILE), yaml).expect("write project file");
}

fn workspace() -> TempDir {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    write_project(
        tmp.path(),
        "shop",
        r#"
environment:
  LOG_LEVEL: info
settings:
  readiness_timeout: 45s
  grace_period: 2s
services:
  db:
    command: postgres -D ./data
    port: 5432
  api:
    command: ./target/debug/api
    port: "8080"
    depends_on:
      - db
      - service: cache
    environment:
      DATABASE_PORT: 5432
    cwd: backend
  cache:
    command: redis-server
    port: 6379
"#,
    );
    write_project(
        tmp.path(),
        "blog",
        r#"
name: my-blog
services:
  site:
    command: hugo server
"#,
    );
    fs::create_dir_all(tmp.path().join("not-a-project")).unwrap();
    tmp
}

#[test]
fn test_list_projects_only_includes_dirs_with_project_file() {
    let tmp = workspace();
    let provider = WorkspaceConfigProvider::new(tmp.path());

    assert_eq!(provider.list_projects().unwrap(), vec!["blog", "shop"]);
}

#[test]
fn test_resolve_project_from_workspace() {
    let tmp = workspace();
    let provider = WorkspaceConfigProvider::new(tmp.path());

    let shop = provider.resolve("shop").unwrap();
    assert_eq!(shop.name, "shop");
    assert_eq!(shop.root, tmp.path().join("shop"));
    assert_eq!(shop.environment["LOG_LEVEL"], "info");
    assert_eq!(shop.settings.readiness_timeout, Duration::from_secs(45));
    assert_eq!(shop.settings.grace_period, Duration::from_secs(2));
    assert_eq!(shop.settings.inter_phase_delay, Duration::from_millis(1500));

    let api = shop.service("api").unwrap();
    assert_eq!(api.port, Some(8080));
    assert_eq!(api.environment["DATABASE_PORT"], "5432");
    assert_eq!(api.working_directory.as_deref(), Some("backend"));
    assert!(api.dependencies.contains("db"));
    assert!(api.dependencies.contains("cache"));

    let plan = devswitch::create_startup_plan(&shop.services).unwrap();
    assert_eq!(plan.phase_names(), vec![vec!["cache", "db"], vec!["api"]]);
}

#[test]
fn test_project_name_from_file_wins_over_directory() {
    let tmp = workspace();
    let provider = WorkspaceConfigProvider::new(tmp.path());

    let blog = provider.resolve("blog").unwrap();
    assert_eq!(blog.name, "my-blog");
    assert_eq!(blog.service("site").unwrap().port, None);
}

#[test]
fn test_missing_and_invalid_project_names() {
    let tmp = workspace();
    let provider = WorkspaceConfigProvider::new(tmp.path());

    assert!(matches!(provider.resolve("nope"), Err(Error::Config(_))));
    assert!(matches!(provider.resolve("not-a-project"), Err(Error::Config(_))));
    assert!(matches!(provider.resolve("../shop"), Err(Error::Config(_))));
    assert!(matches!(provider.resolve(""), Err(Error::Config(_))));
}

#[test]
fn test_validation_collects_every_problem() {
    let tmp = tempfile::tempdir().unwrap();
    write_project(
        tmp.path(),
        "broken",
        r#"
settings:
  grace_period: soon
services:
  db:
    command: "  "
    port: 5432
  api:
    command: api
    port: 70000
    environment:
      LIST: [1, 2]
  web:
    command: web
    port: 5432
"#,
    );
    let provider = WorkspaceConfigProvider::new(tmp.path());

    let err = provider.resolve("broken").unwrap_err();
    let Error::Validation(problems) = &err else {
        panic!("expected validation error, got {err}");
    };
    assert_eq!(problems.len(), 4, "{problems:#?}");
    assert!(problems.iter().any(|p| p.contains("settings.grace_period")));
    assert!(problems.iter().any(|p| p.contains("services.db.command")));
    assert!(problems.iter().any(|p| p.contains("services.api.port")));
    assert!(problems.iter().any(|p| p.contains("services.api.environment.LIST")));
    assert!(err.suggestion().is_some());
}

#[test]
fn test_yaml_syntax_error_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    write_project(tmp.path(), "bad", "services: [unclosed");
    let provider = WorkspaceConfigProvider::new(tmp.path());

    assert!(matches!(provider.resolve("bad"), Err(Error::Yaml(_))));
}
