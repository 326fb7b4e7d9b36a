//! Project configuration, layout, and the analysis ledger.
//!
//! The ledger is a small SQLite database recording every finished analysis:
//! - which batch it belonged to and which corpus file it was computed from
//! - per-status bucket sizes and per-compiler counts
//!
//! Nothing here stores partial progress; a batch either finishes and is
//! recorded, or leaves no trace.

mod config;
mod context;
mod layout;
mod models;
mod util;

pub use config::{DbConfig, ProjectConfig};
pub use context::{default_workers, ProjectContext};
pub use layout::ProjectLayout;
pub use models::AnalysisRecord;
pub use util::{load_project_config, open_project_db};

use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::model::Flag;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Error type for ledger operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A stored summary could not be encoded or decoded.
    #[error("summary JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed analysis ledger.
#[derive(Debug)]
pub struct ProjectDb {
    conn: Connection,
}

impl ProjectDb {
    /// Open (or create) a ledger at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert an analysis record and return its row id.
    pub fn insert_analysis(&self, record: &AnalysisRecord) -> DbResult<i64> {
        let summary = serde_json::to_string(&record.summary)?;
        self.conn.execute(
            r#"
            INSERT INTO analyses (batch, corpus_hash, subjects, flags, summary, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.batch,
                record.corpus_hash,
                record.subjects as i64,
                record.summary.flags.bits(),
                summary,
                record.recorded_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List recorded analyses (oldest first), optionally filtered by batch name.
    pub fn list_analyses(&self, batch: Option<&str>) -> DbResult<Vec<AnalysisRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT batch, corpus_hash, subjects, flags, summary, recorded_at
            FROM analyses
            WHERE ?1 IS NULL OR batch = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![batch], |row| {
            let batch: String = row.get(0)?;
            let corpus_hash: String = row.get(1)?;
            let subjects: i64 = row.get(2)?;
            let flags: u8 = row.get(3)?;
            let summary: String = row.get(4)?;
            let recorded_at: String = row.get(5)?;
            Ok((batch, corpus_hash, subjects, flags, summary, recorded_at))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (batch, corpus_hash, subjects, flags, summary, recorded_at) = row?;
            let mut summary: crate::services::analysis::AnalysisSummary =
                serde_json::from_str(&summary)?;
            summary.flags = Flag::from_bits_truncate(flags);
            out.push(AnalysisRecord {
                batch,
                corpus_hash,
                subjects: usize::try_from(subjects).unwrap_or_default(),
                summary,
                recorded_at,
            });
        }
        Ok(out)
    }
}

/// Apply schema migrations to bring the database to the latest version.
///
/// We use `PRAGMA user_version` as the schema version indicator.
///
/// Version map:
/// - 0: no schema
/// - 1: analyses table
fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS analyses (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                batch        TEXT NOT NULL,
                corpus_hash  TEXT NOT NULL,
                subjects     INTEGER NOT NULL,
                flags        INTEGER NOT NULL,
                summary      TEXT NOT NULL,
                recorded_at  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS analyses_batch ON analyses (batch);

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read the SQLite schema version from `PRAGMA user_version`.
fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
