use anyhow::{Context, Result};
use corpus_core::db::ProjectContext;

use crate::canonicalize_or_current;

/// List analyses recorded in the ledger, oldest first.
pub fn history_command(root: &str, batch: Option<&str>, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let records = ctx.db.list_analyses(batch).context("Failed to list analyses")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        match batch {
            Some(b) => println!("No analyses recorded for batch '{}'.", b),
            None => println!("No analyses recorded."),
        }
        return Ok(());
    }

    println!("Recorded analyses:");
    for record in records {
        let hash = record.corpus_hash.get(..12).unwrap_or(&record.corpus_hash);
        println!(
            "- {} [{}] subjects: {} flags: {} corpus: {}",
            record.batch, record.recorded_at, record.subjects, record.summary.flags, hash
        );
    }
    Ok(())
}
