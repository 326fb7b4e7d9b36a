//! Single-consumer corpus builder.
//!
//! A [`Builder`] owns its corpus exclusively and is the only thing that
//! mutates it. Any number of producers hold [`RequestSender`]s; the builder
//! applies exactly `manifest.n_reqs` requests, one at a time, then hands the
//! finished corpus back.

mod manifest;
mod observer;
mod request;

pub use manifest::Manifest;
pub use observer::{
    read_build_messages, BuildMessage, JsonLinesObserver, Observer, ProgressObserver,
    RecordingObserver, SharedObserver, TracingObserver,
};
pub use request::{Request, RequestBody, RequestSender};

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::model::Corpus;
use crate::services::{queue, CancelToken, QueueReceiver};
use observer::notify;

pub struct Builder {
    manifest: Manifest,
    corpus: Corpus,
    observers: Vec<Box<dyn Observer>>,
    tx: RequestSender,
    rx: QueueReceiver<Request>,
}

impl Builder {
    /// Prepare a builder for one batch.
    ///
    /// `initial` is copied, so the caller's corpus is never touched. Fails with
    /// [`EngineError::EmptyBatch`] if the manifest expects no requests.
    pub fn new(
        manifest: Manifest,
        initial: Option<&Corpus>,
        observers: Vec<Box<dyn Observer>>,
    ) -> EngineResult<Self> {
        if manifest.n_reqs == 0 {
            return Err(EngineError::EmptyBatch { name: manifest.name });
        }
        let (tx, rx) = queue(0);
        Ok(Self { manifest, corpus: initial.cloned().unwrap_or_default(), observers, tx, rx })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// A handle producers use to submit requests to this builder.
    pub fn sender(&self) -> RequestSender {
        self.tx.clone()
    }

    /// Apply exactly `n_reqs` requests and return the resulting corpus.
    ///
    /// Stops at the first collection-consistency error, on cancellation, or
    /// with [`EngineError::ShortBatch`] if every sender is dropped early.
    pub fn run(self, token: &CancelToken) -> EngineResult<Corpus> {
        let Builder { manifest, mut corpus, mut observers, tx, rx } = self;
        // Only producers' senders may keep the queue open from here on.
        drop(tx);

        debug!(
            batch = %manifest.name,
            expected = manifest.n_reqs,
            subjects = corpus.len(),
            "builder starting"
        );
        notify(&mut observers, "start", |o| o.on_build_start(&manifest));

        for index in 0..manifest.n_reqs {
            let request = rx.recv(token).map_err(|err| match err {
                EngineError::QueueClosed => {
                    EngineError::ShortBatch { received: index, expected: manifest.n_reqs }
                }
                other => other,
            })?;
            let echo = (!observers.is_empty()).then(|| request.clone());
            request.apply(&mut corpus)?;
            if let Some(request) = echo {
                notify(&mut observers, "request", |o| o.on_build_request(&request, index));
            }
        }

        notify(&mut observers, "finish", |o| o.on_build_finish());
        debug!(batch = %manifest.name, subjects = corpus.len(), "builder finished");
        Ok(corpus)
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("manifest", &self.manifest)
            .field("subjects", &self.corpus.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
