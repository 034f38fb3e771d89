use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::InterpreterConfig;
use crate::db::{open_archive_db, ArchiveDb, ProjectConfig, ProjectLayout};

/// Convenience wrapper bundling layout, config, archive path, and an open ArchiveDb.
#[derive(Debug)]
pub struct ProjectContext {
    pub layout: ProjectLayout,
    pub config: ProjectConfig,
    pub archive_path: PathBuf,
    pub archive: ArchiveDb,
}

impl ProjectContext {
    /// Load project config and open the archive for a given root.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = ProjectLayout::new(root);
        let (config, archive_path, archive) = open_archive_db(&layout)?;
        Ok(Self { layout, config, archive_path, archive })
    }

    /// Interpreter config with the audit log pointed at the project's log
    /// unless the embedded config already names one.
    pub fn interpreter_config(&self) -> InterpreterConfig {
        let mut config = self.config.interpreter.clone();
        if config.audit.log_path.is_none() {
            config.audit.log_path = Some(self.layout.resolve(&self.config.audit_log));
        }
        config
    }
}
