//! Bounded worker pool running a per-item task next to one long-lived consumer.
//!
//! The pool never touches the corpus: per-subject tasks talk to the consumer
//! only through a [`queue`](crate::services::queue()), and the consumer is the
//! sole owner of whatever it builds.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::model::{Corpus, Subject};
use crate::services::CancelToken;

/// Run `task` over every corpus entry on up to `nworkers` threads while
/// `consumer` runs alongside, returning the consumer's value.
///
/// `nworkers` of 0 or 1 processes subjects one at a time. The first error from
/// any task or the consumer cancels the rest and is returned, except that a
/// later real error replaces an induced one (see [`EngineError::is_induced`]).
/// If `token` itself fired, [`EngineError::Cancelled`] is returned regardless
/// of what else failed.
pub fn par<F, C, R>(
    token: &CancelToken,
    nworkers: usize,
    corpus: &Corpus,
    task: F,
    consumer: C,
) -> EngineResult<R>
where
    F: Fn(&CancelToken, &str, &Subject) -> EngineResult<()> + Send + Sync,
    C: FnOnce(&CancelToken) -> EngineResult<R> + Send,
    R: Send,
{
    let items: Vec<(&String, &Subject)> = corpus.iter().collect();
    par_each(
        token,
        nworkers,
        items,
        move |token, (name, subject)| task(token, name, subject),
        consumer,
    )
}

/// Item-generic form of [`par`].
///
/// Items are handed out in order, but with more than one worker completion
/// order is unspecified. The task closure is dropped as soon as the last
/// worker exits, so queue senders it owns close even while the consumer is
/// still waiting.
pub fn par_each<I, F, C, R>(
    token: &CancelToken,
    nworkers: usize,
    items: Vec<I>,
    task: F,
    consumer: C,
) -> EngineResult<R>
where
    I: Send,
    F: Fn(&CancelToken, I) -> EngineResult<()> + Send + Sync,
    C: FnOnce(&CancelToken) -> EngineResult<R> + Send,
    R: Send,
{
    let local = token.child();
    let first_error: Mutex<Option<EngineError>> = Mutex::new(None);
    // A failing consumer drops its receiver, so blocked producers can report
    // `QueueClosed` before the consumer's own error is joined. Induced errors
    // hold the slot only until a real one arrives.
    let record = |err: EngineError| {
        let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
        let replace = match slot.as_ref() {
            None => true,
            Some(held) => held.is_induced() && !err.is_induced(),
        };
        if replace {
            debug!(error = %err, "worker pool recorded first error; cancelling peers");
            *slot = Some(err);
        }
        drop(slot);
        local.cancel();
    };

    let nworkers = nworkers.clamp(1, items.len().max(1));
    let (work_tx, work_rx) = crossbeam_channel::unbounded();
    for item in items {
        // The receiver is alive, so an unbounded send cannot fail.
        let _ = work_tx.send(item);
    }
    drop(work_tx);

    let task = Arc::new(task);
    let value = thread::scope(|scope| {
        let local = &local;
        let record = &record;
        let consumer_handle = scope.spawn(move || consumer(local));

        for _ in 0..nworkers {
            let task = Arc::clone(&task);
            let work_rx = work_rx.clone();
            scope.spawn(move || {
                for item in work_rx.iter() {
                    if let Err(err) = local.check().and_then(|()| task(local, item)) {
                        record(err);
                        break;
                    }
                }
            });
        }
        drop(task);

        match consumer_handle.join() {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                record(err);
                None
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    if token.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    let first_error = first_error.into_inner().unwrap_or_else(PoisonError::into_inner);
    match (first_error, value) {
        (Some(err), _) => Err(err),
        (None, Some(value)) => Ok(value),
        (None, None) => Err(EngineError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::services::queue;

    #[test]
    fn every_item_is_processed_once() {
        for nworkers in [0, 1, 3, 16] {
            let token = CancelToken::new();
            let seen = AtomicUsize::new(0);
            let (tx, rx) = queue::<u32>(0);
            let sum = par_each(
                &token,
                nworkers,
                (1..=10).collect(),
                |token, n| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    tx.send(token, n)
                },
                |token| (0..10).map(|_| rx.recv(token)).sum::<EngineResult<u32>>(),
            )
            .unwrap();
            assert_eq!(sum, 55, "nworkers={nworkers}");
            assert_eq!(seen.load(Ordering::SeqCst), 10);
        }
    }

    #[test]
    fn single_worker_runs_items_sequentially() {
        let token = CancelToken::new();
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        par_each(
            &token,
            1,
            (0..8).collect::<Vec<u32>>(),
            |_, _| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(2));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            },
            |_| Ok(()),
        )
        .unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_task_error_wins_over_induced_cancellation() {
        let token = CancelToken::new();
        let (tx, rx) = queue::<u32>(0);
        let err = par_each(
            &token,
            4,
            (0..4).collect::<Vec<u32>>(),
            |token, n| {
                if n == 2 {
                    return Err(EngineError::NameNotFound("boom".into()));
                }
                tx.send(token, n)
            },
            // Waits for more items than will ever arrive.
            |token| (0..100).try_for_each(|_| rx.recv(token).map(drop)),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NameNotFound(ref n) if n == "boom"), "{err}");
        assert!(!token.is_cancelled(), "the caller's token is left alone");
    }

    #[test]
    fn consumer_error_unblocks_producers() {
        let token = CancelToken::new();
        let (tx, _rx) = queue::<u32>(0);
        let err = par_each(
            &token,
            2,
            vec![1, 2],
            |token, n| tx.send(token, n),
            |_| -> EngineResult<()> { Err(EngineError::EmptyCorpus) },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCorpus));
    }

    #[test]
    fn consumer_error_beats_queue_closed_from_blocked_producers() {
        for _ in 0..50 {
            let token = CancelToken::new();
            let (tx, rx) = queue::<u32>(0);
            let err = par_each(
                &token,
                8,
                (0..64).collect::<Vec<u32>>(),
                |token, n| tx.send(token, n),
                move |token| -> EngineResult<()> {
                    // Take a few items so producers are in flight, then fail.
                    for _ in 0..4 {
                        rx.recv(token)?;
                    }
                    Err(EngineError::DuplicateName("dup".into()))
                },
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::DuplicateName(ref n) if n == "dup"), "{err}");
        }
    }

    #[test]
    fn induced_errors_are_cancellation_and_closed_queues() {
        assert!(EngineError::Cancelled.is_induced());
        assert!(EngineError::QueueClosed.is_induced());
        assert!(!EngineError::NameNotFound("a".into()).is_induced());
        assert!(!EngineError::ShortBatch { received: 1, expected: 2 }.is_induced());
    }
}
