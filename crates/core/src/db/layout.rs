use std::path::{Path, PathBuf};

/// Logical layout of a project on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
/// The CLI or other frontends are responsible for actually creating directories
/// and files based on this layout.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Root directory of the project.
    pub root: PathBuf,
    /// Directory for internal metadata (.corpus).
    pub meta_dir: PathBuf,
    /// Path to the project config file (JSON).
    pub project_config_path: PathBuf,
    /// Path to the ledger database file.
    pub db_path: PathBuf,
    /// Directory for corpus files (corpora).
    pub corpora_dir: PathBuf,
    /// Directory for analysis reports and event logs (reports).
    pub reports_dir: PathBuf,
}

impl ProjectLayout {
    /// Compute the default layout for a project rooted at `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".corpus");
        let project_config_path = meta_dir.join("project.json");
        let db_path = meta_dir.join("ledger.db");
        let corpora_dir = root.join("corpora");
        let reports_dir = root.join("reports");

        Self { root, meta_dir, project_config_path, db_path, corpora_dir, reports_dir }
    }

    /// Compute a database path string suitable for storing in `ProjectConfig`,
    /// typically as a path relative to `root`.
    pub fn db_path_relative_string(&self) -> String {
        match self.db_path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => self.db_path.to_string_lossy().to_string(),
        }
    }

    /// Resolve a user-supplied path against the project root unless it is absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Default report path for a batch.
    pub fn report_path(&self, batch: &str) -> PathBuf {
        self.reports_dir.join(format!("{batch}.analysis.json"))
    }
}
