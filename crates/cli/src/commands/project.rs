use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use spiral_core::audit::{read_log, verify_chain};
use spiral_core::db::{ArchiveDb, ProjectConfig};

use crate::commands::{layout_for, open_project, print_dir_status};
use crate::infer_project_name;

#[derive(Serialize)]
pub struct ProjectInfoSnapshot {
    pub name: String,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub archive_path: String,
    pub audit_log: String,
    pub cards: usize,
    pub audit_records: usize,
    pub audit_chain_valid: Option<bool>,
    pub personas: Vec<String>,
    pub initial_bandwidth: String,
    pub rituals_dir: String,
}

/// Initialize a new project at `root`.
pub fn init_project_command(root: &str, name: Option<String>) -> Result<()> {
    let layout = layout_for(root)?;

    // Derive project name if not provided.
    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&layout.root),
    };

    fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    fs::create_dir_all(&layout.rituals_dir).with_context(|| {
        format!("Failed to create rituals dir: {}", layout.rituals_dir.display())
    })?;

    let config = ProjectConfig::new(&project_name, &layout);
    let json = serde_json::to_string_pretty(&config)?;
    fs::write(&layout.project_config_path, json).with_context(|| {
        format!("Failed to write project config: {}", layout.project_config_path.display())
    })?;

    // Create the archive immediately so follow-on commands can rely on its presence.
    ArchiveDb::open(&layout.archive_db_path).with_context(|| {
        format!("Failed to initialize memory archive at {}", layout.archive_db_path.display())
    })?;

    println!("Initialized SpiralLogic project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  Archive (relative): {}", config.archive.path);
    println!("  Audit log (relative): {}", config.audit_log);
    println!("  Rituals dir: {}", layout.rituals_dir.display());

    Ok(())
}

/// Show basic information about an existing project.
pub fn project_info_command(root: &str, json: bool) -> Result<()> {
    let ctx = open_project(root)?;
    let cards = ctx.archive.list_cards().context("Failed to list memory cards")?;

    let audit_path = ctx.layout.resolve(&ctx.config.audit_log);
    let (audit_records, audit_chain_valid) = if audit_path.exists() {
        let records = read_log(&audit_path)
            .with_context(|| format!("Failed to read audit log {}", audit_path.display()))?;
        let valid = verify_chain(&records).is_ok();
        (records.len(), Some(valid))
    } else {
        (0, None)
    };

    let interpreter = &ctx.config.interpreter;
    let snapshot = ProjectInfoSnapshot {
        name: ctx.config.name.clone(),
        root: ctx.layout.root.display().to_string(),
        config_file: ctx.layout.project_config_path.display().to_string(),
        config_version: ctx.config.config_version.clone(),
        archive_path: ctx.config.archive.path.clone(),
        audit_log: ctx.config.audit_log.clone(),
        cards: cards.len(),
        audit_records,
        audit_chain_valid,
        personas: interpreter.personas.iter().map(ToString::to_string).collect(),
        initial_bandwidth: interpreter.bandwidth.initial_level.to_string(),
        rituals_dir: ctx.layout.rituals_dir.display().to_string(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("SpiralLogic Project Info");
    println!("========================");
    println!("Name: {}", snapshot.name);
    println!("Root: {}", snapshot.root);
    println!("Config file: {}", snapshot.config_file);
    println!("Config version: {}", snapshot.config_version);
    println!("Archive (config): {}", snapshot.archive_path);
    println!("Audit log (config): {}", snapshot.audit_log);
    println!("Personas: {}", snapshot.personas.join(", "));
    println!("Initial bandwidth: {}", snapshot.initial_bandwidth);
    println!();
    println!("Memory cards: {}", snapshot.cards);
    match snapshot.audit_chain_valid {
        Some(true) => println!("Audit records: {} (chain OK)", snapshot.audit_records),
        Some(false) => println!("Audit records: {} (chain BROKEN)", snapshot.audit_records),
        None => println!("Audit records: none yet"),
    }
    println!();
    println!("Directories:");
    print_dir_status("Meta", &ctx.layout.meta_dir);
    print_dir_status("Rituals", &ctx.layout.rituals_dir);

    Ok(())
}
