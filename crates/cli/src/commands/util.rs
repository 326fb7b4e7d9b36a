use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use corpus_core::model::Corpus;
use corpus_core::services::builder::Request;

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Read a corpus file; `.json` is parsed as JSON, anything else as YAML.
pub fn read_corpus(path: &Path) -> Result<Corpus> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file {}", path.display()))?;
    let corpus = if is_json(path) {
        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse corpus JSON {}", path.display()))?
    } else {
        serde_yaml::from_str(&body)
            .with_context(|| format!("Failed to parse corpus YAML {}", path.display()))?
    };
    Ok(corpus)
}

/// Write a corpus file in the format implied by its extension, creating parent dirs.
pub fn write_corpus(path: &Path, corpus: &Corpus) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let body = if is_json(path) {
        serde_json::to_string_pretty(corpus)?
    } else {
        serde_yaml::to_string(corpus)?
    };
    fs::write(path, body).with_context(|| format!("Failed to write corpus {}", path.display()))
}

/// Read a JSON-lines request stream, skipping blank lines.
pub fn read_requests(path: &Path) -> Result<Vec<Request>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open requests file {}", path.display()))?;
    let mut requests = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let request = Request::from_json_line(&line)
            .with_context(|| format!("{}:{}: invalid request", path.display(), lineno + 1))?;
        requests.push(request);
    }
    if requests.is_empty() {
        bail!("No requests found in {}", path.display());
    }
    Ok(requests)
}
