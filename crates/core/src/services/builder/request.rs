use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{CompileResult, Corpus, NamedSubject, Recipe, RunResult, Subject};
use crate::services::{CancelToken, QueueSender};

/// Producer end of a builder's request queue.
pub type RequestSender = QueueSender<Request>;

/// One change to apply to a named subject.
///
/// On the wire this is a flat JSON object: `{"name": .., "kind": "compile", ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub name: String,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody {
    Add { subject: Subject },
    Recipe { arch: String, recipe: Recipe },
    Compile { compiler: String, result: CompileResult },
    Run { compiler: String, result: RunResult },
}

impl Request {
    pub fn add(named: NamedSubject) -> Self {
        Self { name: named.name, body: RequestBody::Add { subject: named.subject } }
    }

    pub fn recipe(name: impl Into<String>, arch: impl Into<String>, recipe: Recipe) -> Self {
        Self { name: name.into(), body: RequestBody::Recipe { arch: arch.into(), recipe } }
    }

    pub fn compile(
        name: impl Into<String>,
        compiler: impl Into<String>,
        result: CompileResult,
    ) -> Self {
        Self { name: name.into(), body: RequestBody::Compile { compiler: compiler.into(), result } }
    }

    pub fn run(name: impl Into<String>, compiler: impl Into<String>, result: RunResult) -> Self {
        Self { name: name.into(), body: RequestBody::Run { compiler: compiler.into(), result } }
    }

    pub fn kind(&self) -> &'static str {
        match self.body {
            RequestBody::Add { .. } => "add",
            RequestBody::Recipe { .. } => "recipe",
            RequestBody::Compile { .. } => "compile",
            RequestBody::Run { .. } => "run",
        }
    }

    /// Hand this request to the builder behind `queue`, giving up if `token` fires first.
    pub fn send_to(self, token: &CancelToken, queue: &RequestSender) -> EngineResult<()> {
        queue.send(token, self)
    }

    /// Decode one request from a line of JSON.
    pub fn from_json_line(line: &str) -> EngineResult<Self> {
        serde_json::from_str(line).map_err(|err| EngineError::MalformedRequest(err.to_string()))
    }

    /// Apply this request to `corpus`, leaving it untouched on error.
    pub(crate) fn apply(self, corpus: &mut Corpus) -> EngineResult<()> {
        let Request { name, body } = self;
        let attached = match body {
            RequestBody::Add { subject } => return corpus.add(name, subject),
            RequestBody::Recipe { arch, recipe } => {
                corpus.subject_mut(&name)?.add_recipe(arch.clone(), recipe).map_err(|k| (k, arch))
            }
            RequestBody::Compile { compiler, result } => corpus
                .subject_mut(&name)?
                .add_compile(compiler.clone(), result)
                .map_err(|k| (k, compiler)),
            RequestBody::Run { compiler, result } => corpus
                .subject_mut(&name)?
                .add_run(compiler.clone(), result)
                .map_err(|k| (k, compiler)),
        };
        attached.map_err(|(kind, key)| EngineError::DuplicateResult { name, kind, key })
    }
}
