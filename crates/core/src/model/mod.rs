//! Core data model for test subjects and their outcomes.
//!
//! - `Subject` / `NamedSubject`: one test case and its accumulated results
//! - `Corpus`: every subject of a test run, keyed by unique name
//! - `Status` / `Flag`: per-result outcome and its bitset form
//! - `TimeSet`: min/mean/max summary over timing samples
//! - Recipes, compile results, run results: the per-key payloads a stage attaches

mod corpus;
mod recipe;
mod results;
mod status;
mod subject;
mod timeset;

pub use corpus::Corpus;
pub use recipe::{Instruction, Recipe};
pub use results::{CompileFiles, CompileResult, FuzzRecord, Observation, RunResult, State};
pub use status::{Flag, Status};
pub use subject::{NamedSubject, Subject};
pub use timeset::TimeSet;
