use serde::{Deserialize, Serialize};

use crate::services::analysis::AnalysisSummary;

/// Record of one finished analysis, as stored in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisRecord {
    /// Batch name the analysis was run under (typically the corpus file stem).
    pub batch: String,
    /// SHA-256 of the corpus file the analysis was computed from.
    pub corpus_hash: String,
    pub subjects: usize,
    pub summary: AnalysisSummary,
    /// RFC 3339 timestamp.
    pub recorded_at: String,
}

impl AnalysisRecord {
    pub fn new(
        batch: impl Into<String>,
        corpus_hash: impl Into<String>,
        summary: AnalysisSummary,
        recorded_at: impl Into<String>,
    ) -> Self {
        Self {
            batch: batch.into(),
            corpus_hash: corpus_hash.into(),
            subjects: summary.subjects,
            summary,
            recorded_at: recorded_at.into(),
        }
    }
}
