//! Cancellable handoff queue between per-subject producers and the single consumer.
//!
//! Every blocking operation selects over "operation ready" and "token fired".
//! A token that has already fired wins over a ready operation.

use crossbeam_channel::{select, Receiver, Sender};

use crate::error::{EngineError, EngineResult};
use crate::services::CancelToken;

/// Create a queue. `capacity == 0` is a rendezvous: a send completes only once
/// the consumer takes the item.
pub fn queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (QueueSender { tx }, QueueReceiver { rx })
}

#[derive(Debug)]
pub struct QueueSender<T> {
    tx: Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> QueueSender<T> {
    /// Block until the consumer accepts `item` or `token` fires.
    pub fn send(&self, token: &CancelToken, item: T) -> EngineResult<()> {
        token.check()?;
        select! {
            send(self.tx, item) -> sent => sent.map_err(|_| EngineError::QueueClosed),
            recv(token.done()) -> _ => Err(EngineError::Cancelled),
        }
    }
}

#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Block until an item arrives, every sender is gone, or `token` fires.
    pub fn recv(&self, token: &CancelToken) -> EngineResult<T> {
        token.check()?;
        select! {
            recv(self.rx) -> item => item.map_err(|_| EngineError::QueueClosed),
            recv(token.done()) -> _ => Err(EngineError::Cancelled),
        }
    }
}
