//! Post-hoc classification of a finished corpus by outcome.
//!
//! Subjects are classified concurrently through the same worker pool the
//! pipeline stages use; a single accumulator folds one classification per
//! subject into the [`Analysis`]. Every fold step is commutative, so the
//! result does not depend on worker count or completion order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::model::{Corpus, Flag, Status, Subject, TimeSet};
use crate::services::{par, queue, CancelToken};

/// Per-compiler aggregate over every subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerAnalysis {
    /// Number of compile and run results per status.
    pub counts: BTreeMap<Status, usize>,
    /// Durations of compiles that neither failed nor timed out.
    pub compile_time: TimeSet,
    /// Durations of runs that neither failed nor timed out.
    pub run_time: TimeSet,
}

impl CompilerAnalysis {
    fn count(&mut self, status: Status) {
        *self.counts.entry(status).or_default() += 1;
    }

    fn merge(&mut self, other: &CompilerAnalysis) {
        for (status, n) in &other.counts {
            *self.counts.entry(*status).or_default() += n;
        }
        self.compile_time.merge(&other.compile_time);
        self.run_time.merge(&other.run_time);
    }
}

/// Read-only classification of a finished corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Subjects exhibiting each status. Every status has an entry, possibly empty.
    pub by_status: BTreeMap<Status, Corpus>,
    pub compilers: BTreeMap<String, CompilerAnalysis>,
    /// Union of every subject's flags.
    pub flags: Flag,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            by_status: Status::ALL.into_iter().map(|s| (s, Corpus::new())).collect(),
            compilers: BTreeMap::new(),
            flags: Flag::OK,
        }
    }
}

impl Analysis {
    pub fn bucket(&self, status: Status) -> Option<&Corpus> {
        self.by_status.get(&status)
    }

    pub fn subject_names(&self, status: Status) -> Vec<&str> {
        self.bucket(status).map(|c| c.names().collect()).unwrap_or_default()
    }

    /// Whether any subject failed or timed out anywhere.
    pub fn has_failures(&self) -> bool {
        Status::ALL
            .into_iter()
            .filter(|s| !s.has_usable_timing())
            .any(|s| self.flags.matches(s.flag()))
    }

    pub fn summary(&self) -> AnalysisSummary {
        let subjects: BTreeSet<&str> = self.by_status.values().flat_map(|c| c.names()).collect();
        AnalysisSummary {
            subjects: subjects.len(),
            flags: self.flags,
            buckets: self.by_status.iter().map(|(s, c)| (*s, c.len())).collect(),
            compilers: self
                .compilers
                .iter()
                .map(|(id, c)| (id.clone(), c.counts.clone()))
                .collect(),
        }
    }

    fn file(&mut self, classified: Classification) {
        let Classification { name, subject, flags, compilers } = classified;
        self.flags |= flags;
        for status in flags.statuses() {
            if let Some(bucket) = self.by_status.get_mut(&status) {
                // Each subject is classified exactly once, so this cannot collide.
                let _ = bucket.add(name.clone(), subject.clone());
            }
        }
        for (id, partial) in compilers {
            self.compilers.entry(id).or_default().merge(&partial);
        }
    }
}

/// Compact, serializable digest of an [`Analysis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub subjects: usize,
    pub flags: Flag,
    pub buckets: BTreeMap<Status, usize>,
    pub compilers: BTreeMap<String, BTreeMap<Status, usize>>,
}

/// One subject's contribution to an analysis.
struct Classification {
    name: String,
    subject: Subject,
    flags: Flag,
    compilers: BTreeMap<String, CompilerAnalysis>,
}

fn classify(name: &str, subject: &Subject, known: Option<&BTreeSet<String>>) -> Classification {
    let is_known = |id: &str| known.map_or(true, |k| k.contains(id));
    let mut flags = Flag::OK;
    let mut compilers: BTreeMap<String, CompilerAnalysis> = BTreeMap::new();

    for (id, result) in subject.compiles() {
        flags |= result.status.flag();
        if is_known(id) {
            let entry = compilers.entry(id.clone()).or_default();
            entry.count(result.status);
            if result.status.has_usable_timing() {
                entry.compile_time.add(result.duration);
            }
        }
    }
    for (id, result) in subject.runs() {
        flags |= result.status.flag();
        if is_known(id) {
            let entry = compilers.entry(id.clone()).or_default();
            entry.count(result.status);
            if result.status.has_usable_timing() {
                entry.run_time.add(result.duration);
            }
        }
    }

    Classification { name: name.to_string(), subject: subject.clone(), flags, compilers }
}

/// Classifier configuration.
#[derive(Debug, Clone, Default)]
pub struct Analyser {
    nworkers: usize,
    compilers: Option<BTreeSet<String>>,
}

impl Analyser {
    pub fn new(nworkers: usize) -> Self {
        Self { nworkers, compilers: None }
    }

    /// Only count results from these compilers. Results from other compilers
    /// still decide which buckets a subject lands in.
    pub fn with_compilers<I, S>(mut self, compilers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compilers = Some(compilers.into_iter().map(Into::into).collect());
        self
    }

    pub fn analyse(&self, token: &CancelToken, corpus: &Corpus) -> EngineResult<Analysis> {
        corpus.require_nonempty()?;
        let expected = corpus.len();
        let known = self.compilers.as_ref();
        let (tx, rx) = queue(0);

        let analysis = par(
            token,
            self.nworkers,
            corpus,
            move |token, name, subject| tx.send(token, classify(name, subject, known)),
            move |token| {
                let mut analysis = Analysis::default();
                for received in 0..expected {
                    let classified = rx.recv(token).map_err(|err| match err {
                        EngineError::QueueClosed => EngineError::ShortBatch { received, expected },
                        other => other,
                    })?;
                    analysis.file(classified);
                }
                Ok(analysis)
            },
        )?;
        debug!(subjects = expected, flags = %analysis.flags, "analysis complete");
        Ok(analysis)
    }
}

/// Classify `corpus` on up to `nworkers` threads.
pub fn analyse(token: &CancelToken, corpus: &Corpus, nworkers: usize) -> EngineResult<Analysis> {
    Analyser::new(nworkers).analyse(token, corpus)
}
