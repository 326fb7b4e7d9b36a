use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::Status;

/// Output of the fuzzing stage for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzRecord {
    pub duration: Duration,
    /// Generated source file.
    pub file: PathBuf,
}

impl FuzzRecord {
    pub fn new(duration: Duration, file: impl Into<PathBuf>) -> Self {
        Self { duration, file: file.into() }
    }
}

/// Files produced by a compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileFiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<PathBuf>,
}

/// Result of compiling one subject with one compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub status: Status,
    pub duration: Duration,
    #[serde(default)]
    pub files: CompileFiles,
}

impl CompileResult {
    pub fn new(status: Status, duration: Duration) -> Self {
        Self { status, duration, files: CompileFiles::default() }
    }

    pub fn with_files(mut self, files: CompileFiles) -> Self {
        self.files = files;
        self
    }
}

/// One final state of a litmus observation: variable name to value.
pub type State = BTreeMap<String, String>;

/// Parsed observation from running a compiled subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Tool-reported tags such as `sat`, `unsat` or `undef`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default)]
    pub states: Vec<State>,
    /// Subset of `states` that witnessed the postcondition.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub witnesses: Vec<State>,
}

/// Result of running one subject's compiled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: Status,
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
}

impl RunResult {
    pub fn new(status: Status, duration: Duration) -> Self {
        Self { status, duration, observation: None }
    }

    pub fn with_observation(mut self, observation: Observation) -> Self {
        self.observation = Some(observation);
        self
    }
}
