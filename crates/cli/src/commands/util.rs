use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use spiral_core::db::{ProjectContext, ProjectLayout};

use crate::canonicalize_or_current;

/// Read a ritual program from a file, or from stdin when `file` is `-`.
pub fn read_program(file: &str) -> Result<String> {
    if file == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body).context("Failed to read program from stdin")?;
        return Ok(body);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read ritual program {file}"))
}

/// Whether a program path carries the `.spiral` extension (stdin always does).
pub fn has_spiral_extension(file: &str) -> bool {
    file == "-" || Path::new(file).extension().and_then(|e| e.to_str()) == Some("spiral")
}

/// Open the project rooted at `root` (config + archive).
pub fn open_project(root: &str) -> Result<ProjectContext> {
    let root_path = canonicalize_or_current(root)?;
    ProjectContext::from_root(&root_path)
        .with_context(|| format!("Failed to open ritual project at {}", root_path.display()))
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

/// Layout for a root given on the command line.
pub fn layout_for(root: &str) -> Result<ProjectLayout> {
    Ok(ProjectLayout::new(canonicalize_or_current(root)?))
}
