//! Typed event delivery with explicit subscriptions.
//!
//! Every subscriber owns an unbounded receiver registered in a shared
//! listener map. Dropping the [`Subscription`] removes its entry, so a
//! torn-down duplex leaves no listener behind on the sink or source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;

type Listeners<E> = DashMap<u64, mpsc::UnboundedSender<E>>;

/// Broadcasts events to every live [`Subscription`].
///
/// Cloning an emitter shares the listener registry. Once every clone is
/// dropped, pending subscriptions drain their queued events and then
/// yield `None`.
pub struct Emitter<E> {
    listeners: Arc<Listeners<E>>,
    next_id: Arc<AtomicU64>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E: Clone> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. Only events emitted afterwards are delivered.
    pub fn subscribe(&self) -> Subscription<E> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.insert(id, tx);

        Subscription {
            id,
            rx,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver `event` to every live listener, returning how many received it.
    pub fn emit(&self, event: E) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.listeners.iter() {
            if entry.value().send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*entry.key());
            }
        }

        // Removal must wait until the iterator has released its shard guards.
        for id in closed {
            self.listeners.remove(&id);
        }

        delivered
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// A registered listener. Dropping it unsubscribes.
pub struct Subscription<E> {
    id: u64,
    rx: mpsc::UnboundedReceiver<E>,
    listeners: Weak<Listeners<E>>,
}

impl<E> Subscription<E> {
    /// Wait for the next event. Cancel safe.
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Drain every event queued so far.
    pub fn drain(&mut self) -> Vec<E> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Unregister explicitly; equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(&self.id);
        }
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
