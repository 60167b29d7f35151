//! Named event channels with synchronous fan-out.
//!
//! A channel keeps its listeners in subscription order behind a mutex. `emit`
//! holds that mutex while it calls every listener on the emitting thread, so a
//! listener must not subscribe to or unsubscribe from the channel that is
//! calling it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`EventChannel::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct EventChannel<T: ?Sized> {
    name: String,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
}

impl<T: ?Sized> EventChannel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener, in subscription order, on this thread
    pub fn emit(&self, event: &T) {
        let listeners = self.lock();
        for (_, listener) in listeners.iter() {
            listener(event);
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A listener that panicked leaves the list itself intact.
    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener<T>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.name)
            .field("listeners", &self.len())
            .finish()
    }
}
