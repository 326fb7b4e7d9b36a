use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::{NamedSubject, Subject};

/// Every subject of one test run, keyed by unique name.
///
/// Iteration and serialization order is by name so that derived data is
/// reproducible. Outside this crate a corpus is read-only: the only way to
/// change one is to send mutation requests to a
/// [`Builder`](crate::services::builder::Builder), which owns its corpus
/// exclusively while a batch runs. Deserializing rejects a repeated subject
/// name instead of keeping the last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Corpus(BTreeMap<String, Subject>);

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a corpus from named subjects, rejecting repeated names.
    pub fn from_subjects(subjects: impl IntoIterator<Item = NamedSubject>) -> EngineResult<Self> {
        let mut corpus = Self::new();
        for named in subjects {
            corpus.add(named.name, named.subject)?;
        }
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail with [`EngineError::EmptyCorpus`] for stages that need work to do.
    pub fn require_nonempty(&self) -> EngineResult<()> {
        if self.is_empty() {
            Err(EngineError::EmptyCorpus)
        } else {
            Ok(())
        }
    }

    pub fn get(&self, name: &str) -> Option<&Subject> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Subject> {
        self.0.iter()
    }

    pub(crate) fn add(&mut self, name: String, subject: Subject) -> EngineResult<()> {
        match self.0.entry(name) {
            Entry::Occupied(slot) => Err(EngineError::DuplicateName(slot.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(subject);
                Ok(())
            }
        }
    }

    pub(crate) fn subject_mut(&mut self, name: &str) -> EngineResult<&mut Subject> {
        self.0.get_mut(name).ok_or_else(|| EngineError::NameNotFound(name.to_string()))
    }
}

impl<'de> Deserialize<'de> for Corpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CorpusVisitor;

        impl<'de> Visitor<'de> for CorpusVisitor {
            type Value = Corpus;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from subject names to subjects")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Corpus, A::Error> {
                let mut corpus = Corpus::new();
                while let Some((name, subject)) = map.next_entry::<String, Subject>()? {
                    corpus.add(name, subject).map_err(de::Error::custom)?;
                }
                Ok(corpus)
            }
        }

        deserializer.deserialize_map(CorpusVisitor)
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = (&'a String, &'a Subject);
    type IntoIter = btree_map::Iter<'a, String, Subject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
