//! Observer bus: best-effort progress notifications from a running builder.
//!
//! Observers are called from the builder's thread only, never concurrently.
//! A panicking observer is logged and skipped; it cannot fail the batch.

use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::services::builder::{Manifest, Request};

/// Listener for batch progress.
pub trait Observer: Send {
    fn on_build_start(&mut self, manifest: &Manifest);
    /// Called after request number `index` (0-based) has been applied.
    fn on_build_request(&mut self, request: &Request, index: usize);
    fn on_build_finish(&mut self);
}

/// Deliver one event to every observer, isolating panics.
pub(crate) fn notify(
    observers: &mut [Box<dyn Observer>],
    event: &'static str,
    mut deliver: impl FnMut(&mut dyn Observer),
) {
    for (slot, observer) in observers.iter_mut().enumerate() {
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| deliver(observer.as_mut())));
        if delivered.is_err() {
            warn!(observer = slot, event, "observer panicked; continuing batch");
        }
    }
}

/// Serializable form of an observer event, for forwarding over a side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildMessage {
    Start { manifest: Manifest },
    Request { index: usize, request: Request },
    Finish,
}

impl BuildMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            BuildMessage::Start { .. } => "start",
            BuildMessage::Request { .. } => "request",
            BuildMessage::Finish => "finish",
        }
    }

    pub fn deliver(&self, observer: &mut dyn Observer) {
        match self {
            BuildMessage::Start { manifest } => observer.on_build_start(manifest),
            BuildMessage::Request { index, request } => observer.on_build_request(request, *index),
            BuildMessage::Finish => observer.on_build_finish(),
        }
    }

    /// Replay this message onto a local observer list.
    pub fn forward(&self, observers: &mut [Box<dyn Observer>]) {
        notify(observers, self.event_name(), |o| self.deliver(o));
    }
}

/// Parse a stream written by [`JsonLinesObserver`]. Blank lines are skipped.
pub fn read_build_messages(reader: impl BufRead) -> EngineResult<Vec<BuildMessage>> {
    let mut messages = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message = serde_json::from_str(&line).map_err(|err| {
            EngineError::MalformedRequest(format!("event line {}: {}", lineno + 1, err))
        })?;
        messages.push(message);
    }
    Ok(messages)
}

/// Writes every event as one line of JSON.
///
/// Write failures are remembered rather than raised; the first one is
/// returned by [`JsonLinesObserver::finish`].
pub struct JsonLinesObserver<W: Write + Send> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, error: None }
    }

    /// Flush and hand back the writer, or the first write error seen.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn emit(&mut self, message: &BuildMessage) {
        if self.error.is_some() {
            return;
        }
        let written = serde_json::to_writer(&mut self.writer, message)
            .map_err(io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(err) = written {
            warn!(error = %err, "dropping build events after write failure");
            self.error = Some(err);
        }
    }
}

impl<W: Write + Send> Observer for JsonLinesObserver<W> {
    fn on_build_start(&mut self, manifest: &Manifest) {
        self.emit(&BuildMessage::Start { manifest: manifest.clone() });
    }

    fn on_build_request(&mut self, request: &Request, index: usize) {
        self.emit(&BuildMessage::Request { index, request: request.clone() });
    }

    fn on_build_finish(&mut self) {
        self.emit(&BuildMessage::Finish);
        if let Err(err) = self.writer.flush() {
            self.error.get_or_insert(err);
        }
    }
}

/// Shares one observer between the builder and the caller.
///
/// The builder gets a clone; once the batch is over the caller can
/// [`take`](SharedObserver::take) the observer back, for example to call
/// [`JsonLinesObserver::finish`].
pub struct SharedObserver<O> {
    inner: Arc<Mutex<O>>,
}

impl<O: Observer> SharedObserver<O> {
    pub fn new(observer: O) -> Self {
        Self { inner: Arc::new(Mutex::new(observer)) }
    }

    /// The wrapped observer, or `None` while a clone is still alive.
    pub fn take(self) -> Option<O> {
        Arc::try_unwrap(self.inner)
            .ok()
            .map(|inner| inner.into_inner().unwrap_or_else(PoisonError::into_inner))
    }

    fn with(&self, f: impl FnOnce(&mut O)) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

impl<O> Clone for SharedObserver<O> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<O: Observer> Observer for SharedObserver<O> {
    fn on_build_start(&mut self, manifest: &Manifest) {
        self.with(|o| o.on_build_start(manifest));
    }

    fn on_build_request(&mut self, request: &Request, index: usize) {
        self.with(|o| o.on_build_request(request, index));
    }

    fn on_build_finish(&mut self) {
        self.with(|o| o.on_build_finish());
    }
}

/// Logs build progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver {
    batch: String,
}

impl Observer for TracingObserver {
    fn on_build_start(&mut self, manifest: &Manifest) {
        self.batch = manifest.name.clone();
        info!(batch = %manifest.name, expected = manifest.n_reqs, "batch started");
    }

    fn on_build_request(&mut self, request: &Request, index: usize) {
        debug!(
            batch = %self.batch,
            index,
            subject = %request.name,
            kind = request.kind(),
            "request applied"
        );
    }

    fn on_build_finish(&mut self) {
        info!(batch = %self.batch, "batch finished");
    }
}

/// Collects every event; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<BuildMessage>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<BuildMessage> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, message: BuildMessage) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }
}

impl Observer for RecordingObserver {
    fn on_build_start(&mut self, manifest: &Manifest) {
        self.push(BuildMessage::Start { manifest: manifest.clone() });
    }

    fn on_build_request(&mut self, request: &Request, index: usize) {
        self.push(BuildMessage::Request { index, request: request.clone() });
    }

    fn on_build_finish(&mut self) {
        self.push(BuildMessage::Finish);
    }
}

/// Renders `batch [done/total]` progress lines.
pub struct ProgressObserver<W: Write + Send> {
    writer: W,
    batch: String,
    total: usize,
}

impl<W: Write + Send> ProgressObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, batch: String::new(), total: 0 }
    }
}

impl<W: Write + Send> Observer for ProgressObserver<W> {
    fn on_build_start(&mut self, manifest: &Manifest) {
        self.batch = manifest.name.clone();
        self.total = manifest.n_reqs;
        let _ = writeln!(self.writer, "{} [0/{}]", self.batch, self.total);
    }

    fn on_build_request(&mut self, request: &Request, index: usize) {
        let _ = writeln!(
            self.writer,
            "{} [{}/{}] {} {}",
            self.batch,
            index + 1,
            self.total,
            request.kind(),
            request.name
        );
    }

    fn on_build_finish(&mut self) {
        let _ = writeln!(self.writer, "{} done", self.batch);
        let _ = self.writer.flush();
    }
}
