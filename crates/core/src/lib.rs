//! corpus-core
//!
//! Core library for driving many independent test subjects through a
//! multi-stage compiler/memory-model testing pipeline.
//!
//! This crate defines the subject model, the worker pool every pipeline stage
//! fans out through, the mutation-request protocol and the single-writer
//! corpus builder that fans results back in, the observer bus, the outcome
//! classifier, and the ledger that records finished analyses.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends (the CLI, remote stage runners, etc.).

pub mod db;
pub mod error;
pub mod model;
pub mod services;

pub use error::{EngineError, EngineResult};

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
