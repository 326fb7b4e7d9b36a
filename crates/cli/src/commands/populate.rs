use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use corpus_core::db::{ProjectContext, ProjectLayout};
use corpus_core::model::{NamedSubject, Subject};
use corpus_core::services::builder::{Observer, ProgressObserver, TracingObserver};
use corpus_core::services::stage::Stage;
use corpus_core::services::CancelToken;
use tracing::debug;

use crate::commands::write_corpus;
use crate::{batch_name, canonicalize_or_current};

/// Observers attached to every CLI-driven batch.
pub fn batch_observers(progress: bool) -> Vec<Box<dyn Observer>> {
    let mut observers: Vec<Box<dyn Observer>> = vec![Box::new(TracingObserver::default())];
    if progress {
        observers.push(Box::new(ProgressObserver::new(io::stderr())));
    }
    observers
}

/// Input files directly under `dir`, sorted by path.
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            inputs.push(entry.path());
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn subject_for(layout: &ProjectLayout, path: &Path) -> NamedSubject {
    let source = path.strip_prefix(&layout.root).unwrap_or(path);
    Subject::new(source).named(batch_name(path))
}

/// Build a fresh corpus with one subject per file in `inputs`.
pub fn populate_command(
    root: &str,
    inputs: &str,
    out: Option<&str>,
    workers: Option<usize>,
    progress: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let layout = &ctx.layout;

    let inputs_dir = layout.resolve(inputs);
    let files = collect_inputs(&inputs_dir)?;
    if files.is_empty() {
        bail!("No input files found in {}", inputs_dir.display());
    }
    let subjects: Vec<NamedSubject> = files.iter().map(|f| subject_for(layout, f)).collect();
    debug!(inputs = %inputs_dir.display(), files = subjects.len(), "collected inputs");

    let out_path = match out {
        Some(p) => layout.resolve(p),
        None => layout.corpora_dir.join(format!("{}.json", batch_name(&inputs_dir))),
    };

    let token = CancelToken::new();
    let corpus = Stage::new("populate", ctx.workers(workers))
        .with_observers(batch_observers(progress))
        .populate(&token, subjects)
        .context("Populate stage failed")?;

    write_corpus(&out_path, &corpus)?;
    println!("Populated {} subjects into {}", corpus.len(), out_path.display());
    Ok(())
}
