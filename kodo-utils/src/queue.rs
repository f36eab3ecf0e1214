use std::fmt;

use async_channel::TrySendError;

/// Bounded FIFO queue shared by producers and consumers.
pub struct Queue<T> {
    tx: async_channel::Sender<T>,
    rx: async_channel::Receiver<T>,
}

pub enum PushError<T> {
    Full(T),
    Closed(T),
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Full(_) => f.write_str("Full(..)"),
            PushError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T: Send> Queue<T> {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Pushes without waiting. A full queue hands the value back.
    pub fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        self.tx.try_send(value).map_err(|err| match err {
            TrySendError::Full(v) => PushError::Full(v),
            TrySendError::Closed(v) => PushError::Closed(v),
        })
    }

    /// Returns `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        self.rx.recv().await.ok()
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn close(&self) -> bool {
        self.tx.close()
    }
}
