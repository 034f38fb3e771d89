use std::path::{Path, PathBuf};

/// Logical layout of a ritual project on disk.
///
/// This is derived from a chosen root path. It does *not* perform any IO itself.
/// The CLI or other frontends are responsible for creating directories and files.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Root directory of the project.
    pub root: PathBuf,
    /// Directory for internal metadata (.spiral).
    pub meta_dir: PathBuf,
    /// Path to the project config file (JSON).
    pub project_config_path: PathBuf,
    /// Path to the SQLite memory archive.
    pub archive_db_path: PathBuf,
    /// Path to the JSON-lines audit log.
    pub audit_log_path: PathBuf,
    /// Directory for ritual programs (`*.spiral`).
    pub rituals_dir: PathBuf,
}

impl ProjectLayout {
    /// Compute the default layout for a project rooted at `root`.
    ///
    /// This does *not* touch the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".spiral");
        let project_config_path = meta_dir.join("project.json");
        let archive_db_path = meta_dir.join("archive.db");
        let audit_log_path = meta_dir.join("audit.jsonl");
        let rituals_dir = root.join("rituals");

        Self { root, meta_dir, project_config_path, archive_db_path, audit_log_path, rituals_dir }
    }

    /// Path of `target` relative to `root` when possible, for storing in `ProjectConfig`.
    pub fn relative_string(&self, target: &Path) -> String {
        match target.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => target.to_string_lossy().to_string(),
        }
    }

    /// Resolve a path stored in `ProjectConfig` (relative or absolute) against `root`.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
