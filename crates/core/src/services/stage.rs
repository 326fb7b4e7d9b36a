//! Stage driver: wires a builder and the worker pool together for one batch.

use std::collections::BTreeMap;

use tracing::info;

use crate::error::EngineResult;
use crate::model::{Corpus, NamedSubject, Subject};
use crate::services::builder::{Builder, Manifest, Observer, Request, RequestSender};
use crate::services::{par, par_each, CancelToken};

/// One pipeline stage run over a corpus.
pub struct Stage {
    name: String,
    nworkers: usize,
    observers: Vec<Box<dyn Observer>>,
}

impl Stage {
    pub fn new(name: impl Into<String>, nworkers: usize) -> Self {
        Self { name: name.into(), nworkers, observers: Vec::new() }
    }

    pub fn observe(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn with_observers(mut self, observers: Vec<Box<dyn Observer>>) -> Self {
        self.observers.extend(observers);
        self
    }

    /// Run `task` once per subject, where every task sends exactly
    /// `per_subject` requests. Returns an updated copy of `corpus`.
    pub fn run_per_subject<F>(
        self,
        token: &CancelToken,
        corpus: &Corpus,
        per_subject: usize,
        task: F,
    ) -> EngineResult<Corpus>
    where
        F: Fn(&CancelToken, &str, &Subject, &RequestSender) -> EngineResult<()> + Send + Sync,
    {
        corpus.require_nonempty()?;
        let manifest = Manifest::per_subject(&self.name, corpus.len(), per_subject)?;
        info!(
            stage = %self.name,
            subjects = corpus.len(),
            requests = manifest.n_reqs,
            "running stage"
        );
        let builder = Builder::new(manifest, Some(corpus), self.observers)?;
        let sender = builder.sender();
        par(
            token,
            self.nworkers,
            corpus,
            move |token, name, subject| task(token, name, subject, &sender),
            move |token| builder.run(token),
        )
    }

    /// Create a corpus from scratch, one Add request per subject.
    pub fn populate(
        self,
        token: &CancelToken,
        subjects: Vec<NamedSubject>,
    ) -> EngineResult<Corpus> {
        let manifest = Manifest::new(&self.name, subjects.len());
        info!(stage = %self.name, subjects = subjects.len(), "populating corpus");
        let builder = Builder::new(manifest, None, self.observers)?;
        let sender = builder.sender();
        par_each(
            token,
            self.nworkers,
            subjects,
            move |token, named| Request::add(named).send_to(token, &sender),
            move |token| builder.run(token),
        )
    }

    /// Apply a fixed list of requests on top of `initial`.
    ///
    /// Requests are grouped by subject; each group is sent in its original
    /// order by a single producer, so per-subject ordering (Add before
    /// attaches) is preserved while different subjects proceed in parallel.
    pub fn replay(
        self,
        token: &CancelToken,
        initial: Option<&Corpus>,
        requests: Vec<Request>,
    ) -> EngineResult<Corpus> {
        let manifest = Manifest::new(&self.name, requests.len());
        let builder = Builder::new(manifest, initial, self.observers)?;

        let mut groups: BTreeMap<String, Vec<Request>> = BTreeMap::new();
        for request in requests {
            groups.entry(request.name.clone()).or_default().push(request);
        }
        info!(stage = %self.name, subjects = groups.len(), "replaying requests");

        let sender = builder.sender();
        par_each(
            token,
            self.nworkers,
            groups.into_values().collect(),
            move |token, group: Vec<Request>| {
                group.into_iter().try_for_each(|request| request.send_to(token, &sender))
            },
            move |token| builder.run(token),
        )
    }
}
