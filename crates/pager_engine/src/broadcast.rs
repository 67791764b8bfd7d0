use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Stream of state snapshots as seen by a feedback or a presentation layer.
pub type StateStream<S> = BoxStream<'static, S>;

/// Single-slot "replay latest" publisher.
///
/// A publish overwrites the slot; a new subscriber first receives whatever the
/// slot holds, then every later value it is fast enough to observe.
#[derive(Debug)]
pub struct StateBroadcast<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for StateBroadcast<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S> StateBroadcast<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Overwrites the slot. Works with or without subscribers.
    pub fn publish(&self, state: S) {
        self.tx.send_replace(state);
    }

    pub fn latest(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<S> {
        WatchStream::new(self.tx.subscribe()).boxed()
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
