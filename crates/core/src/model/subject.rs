use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ResultKind;
use crate::model::{CompileResult, FuzzRecord, Recipe, RunResult};

/// One test case tracked through the pipeline.
///
/// The three result maps are append-only: a stage may populate a key once,
/// and only the corpus builder may do so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Original input file.
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzz: Option<FuzzRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    recipes: BTreeMap<String, Recipe>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    compiles: BTreeMap<String, CompileResult>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    runs: BTreeMap<String, RunResult>,
}

impl Subject {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            fuzz: None,
            recipes: BTreeMap::new(),
            compiles: BTreeMap::new(),
            runs: BTreeMap::new(),
        }
    }

    pub fn with_fuzz(mut self, fuzz: FuzzRecord) -> Self {
        self.fuzz = Some(fuzz);
        self
    }

    /// Pair this subject with its corpus name.
    pub fn named(self, name: impl Into<String>) -> NamedSubject {
        NamedSubject { name: name.into(), subject: self }
    }

    /// The file later stages should work from: fuzz output if any, else the source.
    pub fn best_source(&self) -> &Path {
        self.fuzz.as_ref().map_or(self.source.as_path(), |f| f.file.as_path())
    }

    pub fn recipes(&self) -> &BTreeMap<String, Recipe> {
        &self.recipes
    }

    pub fn recipe(&self, arch: &str) -> Option<&Recipe> {
        self.recipes.get(arch)
    }

    pub fn compiles(&self) -> &BTreeMap<String, CompileResult> {
        &self.compiles
    }

    pub fn compile(&self, compiler: &str) -> Option<&CompileResult> {
        self.compiles.get(compiler)
    }

    pub fn runs(&self) -> &BTreeMap<String, RunResult> {
        &self.runs
    }

    pub fn run(&self, compiler: &str) -> Option<&RunResult> {
        self.runs.get(compiler)
    }

    pub(crate) fn add_recipe(&mut self, arch: String, recipe: Recipe) -> Result<(), ResultKind> {
        insert_once(&mut self.recipes, arch, recipe).map_err(|()| ResultKind::Recipe)
    }

    pub(crate) fn add_compile(
        &mut self,
        compiler: String,
        result: CompileResult,
    ) -> Result<(), ResultKind> {
        insert_once(&mut self.compiles, compiler, result).map_err(|()| ResultKind::Compile)
    }

    pub(crate) fn add_run(
        &mut self,
        compiler: String,
        result: RunResult,
    ) -> Result<(), ResultKind> {
        insert_once(&mut self.runs, compiler, result).map_err(|()| ResultKind::Run)
    }
}

fn insert_once<V>(map: &mut BTreeMap<String, V>, key: String, value: V) -> Result<(), ()> {
    match map.entry(key) {
        Entry::Occupied(_) => Err(()),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

/// A subject paired with its unique corpus name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSubject {
    pub name: String,
    pub subject: Subject,
}
