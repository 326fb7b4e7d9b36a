use corpus_core::db::ProjectLayout;

#[test]
fn db_path_relative_string_prefers_relative() {
    let root = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(root.path());
    let rel = layout.db_path_relative_string();
    assert!(rel.starts_with(".corpus"));
    assert!(rel.ends_with("ledger.db"));
}

#[test]
fn resolve_keeps_absolute_paths() {
    let root = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(root.path());
    assert_eq!(layout.resolve("corpora/a.json"), root.path().join("corpora/a.json"));
    let abs = root.path().join("elsewhere.json");
    assert_eq!(layout.resolve(&abs), abs);
}

#[test]
fn report_path_is_named_after_batch() {
    let root = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(root.path());
    let out = layout.report_path("nightly");
    assert!(out.ends_with("reports/nightly.analysis.json"));
}
