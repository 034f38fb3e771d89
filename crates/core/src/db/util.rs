use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::db::{ArchiveDb, ProjectConfig, ProjectLayout};

/// Load the project config JSON from disk for a given layout.
pub fn load_project_config(layout: &ProjectLayout) -> Result<ProjectConfig> {
    let config_json = std::fs::read_to_string(&layout.project_config_path).with_context(|| {
        format!("Failed to read project config at {}", layout.project_config_path.display())
    })?;
    let config: ProjectConfig =
        serde_json::from_str(&config_json).context("Failed to parse project config JSON")?;
    Ok(config)
}

/// Resolve the archive path (respecting relative/absolute config) and open the archive.
pub fn open_archive_db(layout: &ProjectLayout) -> Result<(ProjectConfig, PathBuf, ArchiveDb)> {
    let config = load_project_config(layout)?;
    let db_path = layout.resolve(&config.archive.path);
    let db = ArchiveDb::open(&db_path)
        .with_context(|| format!("Failed to open memory archive at {}", db_path.display()))?;
    Ok((config, db_path, db))
}
