use std::fs;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use corpus_core::db::{AnalysisRecord, ProjectContext};
use corpus_core::model::Status;
use corpus_core::services::analysis::{Analyser, Analysis};
use corpus_core::services::CancelToken;
use serde::Serialize;
use tracing::debug;

use crate::commands::read_corpus;
use crate::{batch_name, canonicalize_or_current, sha256_file};

/// JSON output of `analyse --json`.
#[derive(Serialize)]
pub struct AnalyseOutput<'a> {
    pub batch: &'a str,
    pub corpus_hash: &'a str,
    pub recorded: Option<i64>,
    pub analysis: &'a Analysis,
}

/// Options for [`analyse_command`].
#[derive(Debug, Default)]
pub struct AnalyseArgs<'a> {
    pub corpus: &'a str,
    pub workers: Option<usize>,
    pub compilers: Vec<String>,
    pub json: bool,
    pub record: bool,
    pub report: bool,
}

fn format_secs(d: Option<std::time::Duration>) -> String {
    d.map(|d| format!("{:.3}s", d.as_secs_f64())).unwrap_or_else(|| "-".to_string())
}

/// Print buckets and per-compiler statistics.
pub fn print_analysis(batch: &str, analysis: &Analysis) {
    println!("Analysis of '{}' ({} subjects)", batch, analysis.summary().subjects);
    println!("Flags: {}", analysis.flags);
    println!();
    println!("Buckets:");
    for status in Status::ALL {
        let names = analysis.subject_names(status);
        if names.is_empty() {
            println!("- {}: 0", status);
        } else {
            println!("- {}: {} ({})", status, names.len(), names.join(", "));
        }
    }
    if analysis.compilers.is_empty() {
        return;
    }
    println!();
    println!("Compilers:");
    for (id, stats) in &analysis.compilers {
        let counts: Vec<String> =
            stats.counts.iter().map(|(status, n)| format!("{status}={n}")).collect();
        println!("- {}: {}", id, counts.join(" "));
        println!(
            "    compile min/mean/max: {} / {} / {}",
            format_secs(stats.compile_time.min()),
            format_secs(stats.compile_time.mean()),
            format_secs(stats.compile_time.max())
        );
        println!(
            "    run min/mean/max: {} / {} / {}",
            format_secs(stats.run_time.min()),
            format_secs(stats.run_time.mean()),
            format_secs(stats.run_time.max())
        );
    }
}

/// Classify a finished corpus and (optionally) record the result in the ledger.
pub fn analyse_command(root: &str, args: AnalyseArgs<'_>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let layout = &ctx.layout;

    let corpus_path = layout.resolve(args.corpus);
    let corpus = read_corpus(&corpus_path)?;
    let corpus_hash = sha256_file(&corpus_path)?;
    let batch = batch_name(&corpus_path);

    let mut analyser = Analyser::new(ctx.workers(args.workers));
    if !args.compilers.is_empty() {
        analyser = analyser.with_compilers(args.compilers);
    }
    let token = CancelToken::new();
    let analysis = analyser
        .analyse(&token, &corpus)
        .with_context(|| format!("Failed to analyse {}", corpus_path.display()))?;

    let recorded = if args.record {
        let recorded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let record = AnalysisRecord::new(&batch, &corpus_hash, analysis.summary(), recorded_at);
        let id = ctx.db.insert_analysis(&record).context("Failed to record analysis")?;
        debug!(batch = %batch, id, "analysis recorded");
        Some(id)
    } else {
        None
    };

    if args.report {
        let report_path = layout.report_path(&batch);
        fs::create_dir_all(&layout.reports_dir).with_context(|| {
            format!("Failed to create reports dir: {}", layout.reports_dir.display())
        })?;
        fs::write(&report_path, serde_json::to_string_pretty(&analysis)?)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        if !args.json {
            println!("Report written to {}", report_path.display());
        }
    }

    if args.json {
        let output = AnalyseOutput {
            batch: &batch,
            corpus_hash: &corpus_hash,
            recorded,
            analysis: &analysis,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_analysis(&batch, &analysis);
    if let Some(id) = recorded {
        println!();
        println!("Recorded as analysis #{}", id);
    }
    Ok(())
}
