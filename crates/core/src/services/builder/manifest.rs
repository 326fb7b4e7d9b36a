use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Metadata for one batch of mutation requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Human-readable batch name (usually the stage name).
    pub name: String,
    /// Exact number of requests the builder will accept.
    pub n_reqs: usize,
}

impl Manifest {
    pub fn new(name: impl Into<String>, n_reqs: usize) -> Self {
        Self { name: name.into(), n_reqs }
    }

    /// Manifest for a stage emitting `per_subject` requests for each of `subjects`.
    pub fn per_subject(
        name: impl Into<String>,
        subjects: usize,
        per_subject: usize,
    ) -> EngineResult<Self> {
        let name = name.into();
        match subjects.checked_mul(per_subject) {
            Some(n_reqs) => Ok(Self { name, n_reqs }),
            None => Err(EngineError::BatchTooLarge { name, subjects, per_subject }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_subject_multiplies() {
        let manifest = Manifest::per_subject("compile", 5, 3).unwrap();
        assert_eq!(manifest, Manifest::new("compile", 15));
    }

    #[test]
    fn overflowing_request_count_is_rejected() {
        let err = Manifest::per_subject("compile", usize::MAX, 2).unwrap_err();
        match err {
            EngineError::BatchTooLarge { name, subjects, per_subject } => {
                assert_eq!(name, "compile");
                assert_eq!((subjects, per_subject), (usize::MAX, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
