use serde::{Deserialize, Serialize};

use crate::config::InterpreterConfig;
use crate::db::ProjectLayout;

/// Database location (path is typically relative to project root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub path: String,
}

impl DbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Serializable configuration describing a ritual project.
///
/// This lives at `.spiral/project.json` in the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Human-friendly project name.
    pub name: String,
    /// Optional description / notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Config format version.
    pub config_version: String,
    /// Memory archive database.
    pub archive: DbConfig,
    /// Audit log path (typically relative to project root).
    pub audit_log: String,
    /// Interpreter settings used by `run` inside this project.
    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

impl ProjectConfig {
    /// Create a configuration with default interpreter settings and the layout's paths.
    pub fn new(name: impl Into<String>, layout: &ProjectLayout) -> Self {
        Self {
            name: name.into(),
            description: None,
            config_version: "0.1.0".to_string(),
            archive: DbConfig::new(layout.relative_string(&layout.archive_db_path)),
            audit_log: layout.relative_string(&layout.audit_log_path),
            interpreter: InterpreterConfig::default(),
        }
    }
}
