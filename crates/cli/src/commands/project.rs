use std::fs;

use anyhow::{Context, Result};
use corpus_core::db::{ProjectConfig, ProjectContext, ProjectDb, ProjectLayout};
use serde::Serialize;

use crate::commands::print_dir_status;
use crate::{canonicalize_or_current, infer_project_name};

#[derive(Serialize)]
pub struct ProjectInfoSnapshot {
    pub name: String,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub db_path: String,
    pub workers: usize,
    pub layout: ProjectInfoLayout,
    pub analyses: usize,
    pub batches: Vec<String>,
}

#[derive(Serialize)]
pub struct ProjectInfoLayout {
    pub meta_dir: String,
    pub corpora_dir: String,
    pub reports_dir: String,
}

/// Initialize a new project at `root`.
pub fn init_project_command(
    root: &str,
    name: Option<String>,
    workers: Option<usize>,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);

    // Derive project name if not provided.
    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&root_path),
    };

    // Ensure directories exist.
    fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    fs::create_dir_all(&layout.corpora_dir).with_context(|| {
        format!("Failed to create corpora dir: {}", layout.corpora_dir.display())
    })?;
    fs::create_dir_all(&layout.reports_dir).with_context(|| {
        format!("Failed to create reports dir: {}", layout.reports_dir.display())
    })?;

    // Build project config.
    let mut config = ProjectConfig::new(&project_name, layout.db_path_relative_string());
    config.workers = workers.filter(|&n| n > 0);

    let json = serde_json::to_string_pretty(&config)?;
    fs::write(&layout.project_config_path, json).with_context(|| {
        format!("Failed to write project config: {}", layout.project_config_path.display())
    })?;

    // Create the ledger immediately so follow-on commands can rely on it.
    ProjectDb::open(&layout.db_path).with_context(|| {
        format!("Failed to initialize ledger database at {}", layout.db_path.display())
    })?;

    println!("Initialized corpus project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  DB path (relative): {}", config.db.path);
    println!("  Corpora dir: {}", layout.corpora_dir.display());
    println!("  Reports dir: {}", layout.reports_dir.display());
    if let Some(n) = config.workers {
        println!("  Workers: {}", n);
    }

    Ok(())
}

/// Show basic information about an existing project.
pub fn project_info_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let layout = &ctx.layout;
    let config = &ctx.config;

    let analyses = ctx.db.list_analyses(None).context("Failed to list analyses")?;
    let mut batches: Vec<String> = analyses.iter().map(|a| a.batch.clone()).collect();
    batches.sort();
    batches.dedup();
    let workers = ctx.workers(None);

    if json {
        let snapshot = ProjectInfoSnapshot {
            name: config.name.clone(),
            root: layout.root.display().to_string(),
            config_file: layout.project_config_path.display().to_string(),
            config_version: config.config_version.clone(),
            db_path: config.db.path.clone(),
            workers,
            layout: ProjectInfoLayout {
                meta_dir: layout.meta_dir.display().to_string(),
                corpora_dir: layout.corpora_dir.display().to_string(),
                reports_dir: layout.reports_dir.display().to_string(),
            },
            analyses: analyses.len(),
            batches,
        };
        let serialized = serde_json::to_string_pretty(&snapshot)?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Corpus Project Info");
    println!("===================");
    println!("Name: {}", config.name);
    println!("Root: {}", layout.root.display());
    println!("Config file: {}", layout.project_config_path.display());
    println!("Config version: {}", config.config_version);
    println!("DB path (config): {}", config.db.path);
    match config.workers {
        Some(n) => println!("Workers: {}", n),
        None => println!("Workers: {} (host default)", workers),
    }
    println!();

    println!("Directories:");
    print_dir_status("Meta dir (.corpus)", &layout.meta_dir);
    print_dir_status("Corpora dir", &layout.corpora_dir);
    print_dir_status("Reports dir", &layout.reports_dir);
    println!();
    println!("Recorded analyses: {}", analyses.len());
    if !batches.is_empty() {
        println!("Batches: {}", batches.join(", "));
    }

    Ok(())
}
