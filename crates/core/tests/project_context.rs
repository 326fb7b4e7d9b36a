use corpus_core::db::{default_workers, ProjectConfig, ProjectContext, ProjectLayout};

fn write_config(layout: &ProjectLayout, config: &ProjectConfig) {
    std::fs::create_dir_all(&layout.meta_dir).unwrap();
    std::fs::write(&layout.project_config_path, serde_json::to_string_pretty(config).unwrap())
        .unwrap();
}

#[test]
fn project_context_loads_config_and_db() {
    let temp = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(temp.path());
    write_config(&layout, &ProjectConfig::new("CtxProject", layout.db_path_relative_string()));

    let ctx = ProjectContext::from_root(temp.path()).expect("context");
    assert_eq!(ctx.config.name, "CtxProject");
    assert!(ctx.db_path.is_file());

    // DB should be initialized and usable.
    assert!(ctx.db.list_analyses(None).expect("list analyses").is_empty());
}

#[test]
fn worker_count_prefers_flag_then_config_then_host() {
    let temp = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(temp.path());
    let mut config = ProjectConfig::new("Workers", layout.db_path_relative_string());
    write_config(&layout, &config);

    let ctx = ProjectContext::from_root(temp.path()).unwrap();
    assert_eq!(ctx.workers(Some(3)), 3);
    assert_eq!(ctx.workers(None), default_workers());
    assert!(default_workers() >= 1);

    config.workers = Some(6);
    write_config(&layout, &config);
    let ctx = ProjectContext::from_root(temp.path()).unwrap();
    assert_eq!(ctx.workers(None), 6);
    assert_eq!(ctx.workers(Some(2)), 2);
}

#[test]
fn missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = ProjectContext::from_root(temp.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to read project config"), "{err:#}");
}
