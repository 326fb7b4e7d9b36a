use std::time::Duration;

use corpus_core::model::{CompileResult, Corpus, Flag, RunResult, Status, Subject};
use corpus_core::services::analysis::{analyse, Analyser};
use corpus_core::services::builder::Request;
use corpus_core::services::stage::Stage;
use corpus_core::services::CancelToken;
use corpus_core::EngineError;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn compile(name: &str, compiler: &str, status: Status, duration: Duration) -> Request {
    Request::compile(name, compiler, CompileResult::new(status, duration))
}

fn run(name: &str, compiler: &str, status: Status, duration: Duration) -> Request {
    Request::run(name, compiler, RunResult::new(status, duration))
}

/// Four subjects, one per interesting outcome, over two compilers.
fn fixture() -> Corpus {
    let mut requests = Vec::new();
    for name in ["foo", "bar", "baz", "barbaz"] {
        requests.push(Request::add(Subject::new(format!("{name}.litmus")).named(name)));
    }
    requests.extend([
        compile("foo", "gcc", Status::Ok, secs(1)),
        run("foo", "gcc", Status::Ok, secs(2)),
        compile("bar", "gcc", Status::CompileFail, secs(100)),
        run("bar", "gcc", Status::CompileFail, Duration::ZERO),
        run("bar", "clang", Status::Ok, secs(7)),
        compile("baz", "gcc", Status::Ok, secs(3)),
        compile("baz", "clang", Status::Ok, secs(6)),
        run("baz", "gcc", Status::Flagged, secs(4)),
        run("baz", "clang", Status::Flagged, secs(8)),
        compile("barbaz", "gcc", Status::Ok, secs(5)),
        run("barbaz", "gcc", Status::RunTimeout, secs(60)),
    ]);
    Stage::new("fixture", 2).replay(&CancelToken::new(), None, requests).expect("fixture builds")
}

#[test]
fn subjects_land_in_the_expected_buckets() {
    let corpus = fixture();
    let analysis = analyse(&CancelToken::new(), &corpus, 4).expect("analysis");

    assert_eq!(analysis.subject_names(Status::Ok), vec!["foo"]);
    assert_eq!(analysis.subject_names(Status::CompileFail), vec!["bar"]);
    assert_eq!(analysis.subject_names(Status::Flagged), vec!["baz"]);
    assert_eq!(analysis.subject_names(Status::RunTimeout), vec!["barbaz"]);
    for empty in [Status::Unknown, Status::CompileTimeout, Status::RunFail] {
        let bucket = analysis.bucket(empty).expect("every status has a bucket");
        assert!(bucket.is_empty(), "{empty} should be empty");
    }

    // Bucketed subjects are the corpus's own entries.
    assert_eq!(analysis.bucket(Status::Flagged).unwrap().get("baz"), corpus.get("baz"));
    assert_eq!(analysis.flags, Flag::FLAGGED | Flag::COMPILE_FAIL | Flag::RUN_TIMEOUT);
    assert!(analysis.has_failures());
}

#[test]
fn compiler_counts_and_timings() {
    let analysis = analyse(&CancelToken::new(), &fixture(), 3).unwrap();

    let gcc = &analysis.compilers["gcc"];
    assert_eq!(gcc.counts.get(&Status::Ok), Some(&4));
    assert_eq!(gcc.counts.get(&Status::CompileFail), Some(&2));
    assert_eq!(gcc.counts.get(&Status::Flagged), Some(&1));
    assert_eq!(gcc.counts.get(&Status::RunTimeout), Some(&1));
    assert_eq!(gcc.counts.values().sum::<usize>(), 8);

    // Failed and timed-out results contribute no timing samples.
    assert_eq!(gcc.compile_time.count(), 3);
    assert_eq!(gcc.compile_time.min(), Some(secs(1)));
    assert_eq!(gcc.compile_time.mean(), Some(secs(3)));
    assert_eq!(gcc.compile_time.max(), Some(secs(5)));
    assert_eq!(gcc.run_time.count(), 2);
    assert_eq!(gcc.run_time.min(), Some(secs(2)));
    assert_eq!(gcc.run_time.mean(), Some(secs(3)));
    assert_eq!(gcc.run_time.max(), Some(secs(4)));

    let clang = &analysis.compilers["clang"];
    assert_eq!(clang.counts.get(&Status::Ok), Some(&2));
    assert_eq!(clang.counts.get(&Status::Flagged), Some(&1));
    assert_eq!(clang.compile_time.mean(), Some(secs(6)));
    assert_eq!(clang.run_time.mean(), Some(secs(15) / 2));
}

#[test]
fn result_is_independent_of_worker_count() {
    let corpus = fixture();
    let token = CancelToken::new();
    let reference = serde_json::to_string(&analyse(&token, &corpus, 1).unwrap()).unwrap();
    for nworkers in [2, 4, 16] {
        for _ in 0..5 {
            let again = analyse(&token, &corpus, nworkers).unwrap();
            assert_eq!(serde_json::to_string(&again).unwrap(), reference, "nworkers={nworkers}");
        }
    }
}

#[test]
fn known_compiler_filter_limits_counts_not_buckets() {
    let analysis =
        Analyser::new(2).with_compilers(["gcc"]).analyse(&CancelToken::new(), &fixture()).unwrap();
    assert_eq!(analysis.compilers.keys().collect::<Vec<_>>(), vec!["gcc"]);
    assert_eq!(analysis.subject_names(Status::Flagged), vec!["baz"]);
}

#[test]
fn clean_corpus_has_no_failures() {
    let requests = vec![
        Request::add(Subject::new("a.litmus").named("a")),
        compile("a", "gcc", Status::Ok, secs(1)),
        run("a", "gcc", Status::Ok, secs(1)),
    ];
    let corpus = Stage::new("clean", 1).replay(&CancelToken::new(), None, requests).unwrap();
    let analysis = analyse(&CancelToken::new(), &corpus, 1).unwrap();
    assert!(analysis.flags.is_ok());
    assert!(!analysis.has_failures());

    let summary = analysis.summary();
    assert_eq!(summary.subjects, 1);
    assert_eq!(summary.buckets.get(&Status::Ok), Some(&1));
    assert_eq!(summary.buckets.get(&Status::RunFail), Some(&0));
    assert_eq!(summary.compilers["gcc"].get(&Status::Ok), Some(&2));
}

#[test]
fn subject_without_results_counts_as_ok() {
    let corpus = Corpus::from_subjects([Subject::new("bare.litmus").named("bare")]).unwrap();
    let analysis = analyse(&CancelToken::new(), &corpus, 1).unwrap();
    assert_eq!(analysis.subject_names(Status::Ok), vec!["bare"]);
    assert!(analysis.compilers.is_empty());
}

#[test]
fn empty_corpus_is_rejected() {
    let err = analyse(&CancelToken::new(), &Corpus::new(), 4).unwrap_err();
    assert!(matches!(err, EngineError::EmptyCorpus), "{err}");
}

#[test]
fn cancelled_token_aborts_analysis() {
    let token = CancelToken::new();
    token.cancel();
    let err = analyse(&token, &fixture(), 2).unwrap_err();
    assert!(err.is_cancelled());
}
