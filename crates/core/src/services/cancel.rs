//! Cancellation token shared by every producer, queue and consumer of a batch.
//!
//! Cancelling drops the token's internal channel sender, so [`CancelToken::done`]
//! becomes permanently ready and can sit in a `select!` next to any other
//! blocking channel operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{EngineError, EngineResult};

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Self {
        let (trigger, done) = crossbeam_channel::bounded(0);
        Self {
            fired: AtomicBool::new(false),
            trigger: Mutex::new(Some(trigger)),
            done,
            children: Mutex::new(Vec::new()),
        }
    }

    fn fire(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(lock(&self.trigger).take());
        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.iter().filter_map(Weak::upgrade) {
            child.fire();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle; every clone observes the same cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner::new()) }
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        self.inner.fire();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Receiver that becomes ready (disconnected) once the token fires.
    ///
    /// Never yields a value; use it as a `recv` arm in `crossbeam_channel::select!`.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// A token that fires with this one but can also be fired on its own.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        lock(&self.inner.children).push(Arc::downgrade(&child.inner));
        // The parent may have fired between creating the child and registering it.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }
}
