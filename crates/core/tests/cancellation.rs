use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use corpus_core::model::{Corpus, Subject};
use corpus_core::services::builder::{Builder, Manifest, Request};
use corpus_core::services::{par, queue, CancelToken};
use corpus_core::EngineError;

fn corpus_of(n: usize) -> Corpus {
    Corpus::from_subjects(
        (0..n).map(|i| Subject::new(format!("s{i}.litmus")).named(format!("s{i}"))),
    )
    .unwrap()
}

#[test]
fn builder_run_returns_cancelled_when_no_request_arrives() {
    let token = CancelToken::new();
    let builder = Builder::new(Manifest::new("idle", 3), None, vec![]).unwrap();
    // Keep a sender alive so the queue never reports closure.
    let _sender = builder.sender();

    let (tx, rx) = mpsc::channel();
    let runner = {
        let token = token.clone();
        thread::spawn(move || {
            let _ = tx.send(builder.run(&token));
        })
    };

    thread::sleep(Duration::from_millis(20));
    let cancelled_at = Instant::now();
    token.cancel();
    let result =
        rx.recv_timeout(Duration::from_millis(500)).expect("builder should observe cancellation");
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(cancelled_at.elapsed() < Duration::from_millis(500));
    runner.join().unwrap();
}

#[test]
fn par_and_builder_both_unwind_on_cancellation() {
    let corpus = corpus_of(8);
    let token = CancelToken::new();
    let builder = Builder::new(Manifest::new("stalled", 16), Some(&corpus), vec![]).unwrap();
    let sender = builder.sender();

    let (tx, rx) = mpsc::channel();
    let driver = {
        let token = token.clone();
        thread::spawn(move || {
            let result = par(
                &token,
                4,
                &corpus,
                // One request per subject, then stall; the builder expects two.
                move |token, name, _| {
                    Request::add(Subject::new("copy.litmus").named(format!("{name}-copy")))
                        .send_to(token, &sender)?;
                    let (_hold, stall) = queue::<()>(0);
                    stall.recv(token)
                },
                move |token| builder.run(token),
            );
            let _ = tx.send(result);
        })
    };

    thread::sleep(Duration::from_millis(30));
    let cancelled_at = Instant::now();
    token.cancel();
    let result =
        rx.recv_timeout(Duration::from_secs(1)).expect("par should return after cancellation");
    assert!(matches!(result, Err(EngineError::Cancelled)), "unexpected: {result:?}");
    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    driver.join().unwrap();
}

#[test]
fn cancellation_beats_a_concurrent_task_error() {
    let corpus = corpus_of(4);
    let outer = CancelToken::new();
    let result = par(
        &outer,
        2,
        &corpus,
        |_, name, _| {
            outer.cancel();
            Err(EngineError::NameNotFound(name.to_string()))
        },
        |_| Ok(()),
    );
    assert!(matches!(result, Err(EngineError::Cancelled)), "unexpected: {result:?}");
}

#[test]
fn already_cancelled_token_stops_before_any_work() {
    let corpus = corpus_of(3);
    let token = CancelToken::new();
    token.cancel();
    let result = par(
        &token,
        2,
        &corpus,
        |_, _, _| panic!("no task should run after cancellation"),
        |token| token.check(),
    );
    assert!(matches!(result, Err(EngineError::Cancelled)));
}
