use spiral_core::db::{load_project_config, ProjectConfig, ProjectContext, ProjectLayout};

fn write_config(layout: &ProjectLayout, config: &ProjectConfig) {
    std::fs::create_dir_all(&layout.meta_dir).unwrap();
    std::fs::write(&layout.project_config_path, serde_json::to_string_pretty(config).unwrap())
        .unwrap();
}

#[test]
fn layout_paths_hang_off_the_root() {
    let layout = ProjectLayout::new("/tmp/spiral-project");
    assert!(layout.meta_dir.ends_with(".spiral"));
    assert!(layout.project_config_path.ends_with(".spiral/project.json"));
    assert_eq!(layout.relative_string(&layout.archive_db_path), ".spiral/archive.db");
    assert_eq!(layout.resolve(".spiral/audit.jsonl"), layout.audit_log_path);
    assert_eq!(layout.resolve("/var/log/a.jsonl"), std::path::PathBuf::from("/var/log/a.jsonl"));
}

#[test]
fn project_context_loads_config_and_archive() {
    let temp = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(temp.path());
    write_config(&layout, &ProjectConfig::new("CtxProject", &layout));

    let ctx = ProjectContext::from_root(temp.path()).expect("context");
    assert_eq!(ctx.config.name, "CtxProject");
    assert!(ctx.archive_path.is_file());
    assert!(ctx.archive.list_cards().expect("list cards").is_empty());

    let interpreter = ctx.interpreter_config();
    assert_eq!(interpreter.audit.log_path.as_deref(), Some(layout.audit_log_path.as_path()));
}

#[test]
fn embedded_interpreter_settings_are_respected() {
    let temp = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(temp.path());
    let mut config = ProjectConfig::new("Custom", &layout);
    config.interpreter.audit.log_path = Some("/elsewhere/audit.jsonl".into());
    config.interpreter.containment_handle = "quiet_room".into();
    write_config(&layout, &config);

    let loaded = load_project_config(&layout).unwrap();
    assert_eq!(loaded, config);

    let ctx = ProjectContext::from_root(temp.path()).unwrap();
    let interpreter = ctx.interpreter_config();
    assert_eq!(interpreter.containment_handle, "quiet_room");
    assert_eq!(
        interpreter.audit.log_path.as_deref(),
        Some(std::path::Path::new("/elsewhere/audit.jsonl"))
    );
}

#[test]
fn missing_project_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = ProjectContext::from_root(temp.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to read project config"));
}
