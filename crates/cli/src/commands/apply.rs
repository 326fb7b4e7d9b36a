use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufReader, BufWriter};

use anyhow::{anyhow, Context, Result};
use corpus_core::db::ProjectContext;
use corpus_core::services::builder::{
    read_build_messages, BuildMessage, JsonLinesObserver, Observer, ProgressObserver,
    RecordingObserver, SharedObserver,
};
use corpus_core::services::stage::Stage;
use corpus_core::services::CancelToken;

use crate::commands::{batch_observers, read_corpus, read_requests, write_corpus};
use crate::{batch_name, canonicalize_or_current};

/// Options for [`apply_command`].
#[derive(Debug, Default)]
pub struct ApplyArgs<'a> {
    pub corpus: Option<&'a str>,
    pub requests: &'a str,
    pub out: Option<&'a str>,
    pub events: Option<&'a str>,
    pub workers: Option<usize>,
    pub progress: bool,
}

/// Count applied requests by kind from a recorded event log.
pub fn request_kinds(messages: &[BuildMessage]) -> BTreeMap<&'static str, usize> {
    let mut kinds = BTreeMap::new();
    for message in messages {
        if let BuildMessage::Request { request, .. } = message {
            *kinds.entry(request.kind()).or_insert(0) += 1;
        }
    }
    kinds
}

/// Apply a JSON-lines request stream to a corpus through the builder.
pub fn apply_command(root: &str, args: ApplyArgs<'_>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let ctx = ProjectContext::from_root(&root_path)?;
    let layout = &ctx.layout;

    let corpus_path = args.corpus.map(|p| layout.resolve(p));
    let out_path = match (args.out, &corpus_path) {
        (Some(out), _) => layout.resolve(out),
        (None, Some(corpus)) => corpus.clone(),
        (None, None) => return Err(anyhow!("--out is required when no --corpus is given")),
    };
    let initial = corpus_path.as_deref().map(read_corpus).transpose()?;

    let requests_path = layout.resolve(args.requests);
    let requests = read_requests(&requests_path)?;
    let batch = batch_name(&requests_path);

    let recorder = RecordingObserver::new();
    let mut observers = batch_observers(args.progress);
    observers.push(Box::new(recorder.clone()));
    let event_log = match args.events {
        Some(events) => {
            let events_path = layout.resolve(events);
            if let Some(parent) = events_path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = fs::File::create(&events_path).with_context(|| {
                format!("Failed to create event log {}", events_path.display())
            })?;
            let log = SharedObserver::new(JsonLinesObserver::new(BufWriter::new(file)));
            observers.push(Box::new(log.clone()));
            Some((events_path, log))
        }
        None => None,
    };

    let token = CancelToken::new();
    let corpus = Stage::new(&batch, ctx.workers(args.workers))
        .with_observers(observers)
        .replay(&token, initial.as_ref(), requests)
        .with_context(|| format!("Batch '{batch}' failed"))?;

    if let Some((events_path, log)) = event_log {
        log.take()
            .ok_or_else(|| anyhow!("event log {} is still in use", events_path.display()))?
            .finish()
            .with_context(|| format!("Failed to write event log {}", events_path.display()))?;
    }

    write_corpus(&out_path, &corpus)?;

    let kinds = request_kinds(&recorder.messages());
    let applied: Vec<String> = kinds.iter().map(|(k, n)| format!("{k}={n}")).collect();
    println!(
        "Applied batch '{}' ({}) -> {} subjects in {}",
        batch,
        applied.join(", "),
        corpus.len(),
        out_path.display()
    );
    Ok(())
}

/// Re-render an event log written by `apply --events` as progress lines.
pub fn replay_events_command(file: &str) -> Result<()> {
    let path = canonicalize_or_current(file)?;
    let reader = BufReader::new(
        fs::File::open(&path)
            .with_context(|| format!("Failed to open event log {}", path.display()))?,
    );
    let messages = read_build_messages(reader)
        .with_context(|| format!("Failed to parse event log {}", path.display()))?;

    let mut observers: Vec<Box<dyn Observer>> =
        vec![Box::new(ProgressObserver::new(io::stdout()))];
    for message in &messages {
        message.forward(&mut observers);
    }
    Ok(())
}
