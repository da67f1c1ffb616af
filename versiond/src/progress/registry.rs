//! Registry of attached progress observers
//!
//! Each observer owns a bounded queue. Broadcasting never waits: an observer
//! whose queue is full or whose receiving end is gone is pruned on the spot,
//! so a slow client only ever loses its own connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::errors::VersiondError;

pub type ObserverId = u64;

/// Default per-observer queue length
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

pub struct ObserverRegistry {
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Attach a new observer
    pub fn add(&self) -> (ObserverId, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        observers.insert(id, tx);
        debug!("Observer {} attached ({} total)", id, observers.len());

        (id, rx)
    }

    /// Detach an observer; returns false if it was already gone
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        let removed = observers.remove(&id).is_some();
        if removed {
            debug!("Observer {} detached ({} left)", id, observers.len());
        }
        removed
    }

    /// Serialize `event` once and hand it to every attached observer.
    ///
    /// Returns the number of observers that received it.
    pub fn broadcast<T: Serialize>(&self, event: &T) -> Result<usize, VersiondError> {
        let payload: Arc<str> = serde_json::to_string(event)?.into();

        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        observers.retain(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Observer {} is not keeping up, dropping it", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Observer {} closed", id);
                false
            }
        });

        Ok(observers.len())
    }

    /// Number of attached observers
    pub fn len(&self) -> usize {
        self.observers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach an observer that detaches itself when dropped
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (id, receiver) = self.add();
        Subscription {
            id,
            receiver,
            registry: Arc::clone(self),
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// An attached observer
pub struct Subscription {
    id: ObserverId,
    receiver: mpsc::Receiver<Arc<str>>,
    registry: Arc<ObserverRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Next serialized event; `None` once the observer has been pruned
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
