use std::collections::BTreeMap;

use corpus_core::db::{AnalysisRecord, ProjectDb};
use corpus_core::model::{Flag, Status};
use corpus_core::services::analysis::AnalysisSummary;
use tempfile::tempdir;

fn summary(subjects: usize, flags: Flag) -> AnalysisSummary {
    let buckets: BTreeMap<Status, usize> = Status::ALL
        .into_iter()
        .map(|s| (s, if flags.matches(s.flag()) { subjects } else { 0 }))
        .collect();
    let mut gcc = BTreeMap::new();
    gcc.insert(Status::Ok, subjects * 2);
    AnalysisSummary {
        subjects,
        flags,
        buckets,
        compilers: BTreeMap::from([("gcc".to_string(), gcc)]),
    }
}

#[test]
fn project_db_initializes_and_records_analyses() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("ledger.db");

    // First open should create schema and allow inserts.
    {
        let db = ProjectDb::open(&db_path).expect("open db");
        let conn = db.connection();

        let version: i32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .expect("schema version");
        assert_eq!(version, 1);

        let first =
            AnalysisRecord::new("nightly", "abc123", summary(3, Flag::OK), "2026-01-01T00:00:00Z");
        let id = db.insert_analysis(&first).expect("insert analysis");
        assert!(id > 0);

        let flagged = Flag::FLAGGED | Flag::RUN_TIMEOUT;
        let second =
            AnalysisRecord::new("weekly", "def456", summary(5, flagged), "2026-01-02T00:00:00Z");
        let id2 = db.insert_analysis(&second).expect("insert second analysis");
        assert!(id2 > id);

        let all = db.list_analyses(None).expect("list analyses");
        assert_eq!(all, vec![first, second]);
    }

    // Second open should see existing schema and data.
    {
        let db = ProjectDb::open(&db_path).expect("re-open db");
        let version: i32 = db
            .connection()
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .expect("schema version");
        assert_eq!(version, 1);

        let weekly = db.list_analyses(Some("weekly")).expect("filter by batch");
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].corpus_hash, "def456");
        assert_eq!(weekly[0].subjects, 5);
        assert!(weekly[0].summary.flags.matches(Flag::RUN_TIMEOUT));
        assert_eq!(weekly[0].summary.compilers["gcc"].get(&Status::Ok), Some(&10));

        assert!(db.list_analyses(Some("monthly")).expect("unknown batch").is_empty());
    }
}
