use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

pub type ListenerId = u64;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Shared observable cell.
///
/// Reads return the latest written value. Every write synchronously calls the
/// registered listeners before returning, and wakes async subscribers.
/// Clones share the same cell.
pub struct Reactive<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    tx: watch::Sender<T>,
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive")
            .field(&*self.inner.tx.borrow())
            .finish()
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Reactive<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + 'static> Reactive<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                tx,
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Reads without cloning. Do not write to the same cell from `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.tx.borrow())
    }

    pub fn set(&self, value: T) {
        self.inner.tx.send_replace(value);
        self.notify();
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.tx.send_modify(f);
        self.notify();
    }

    /// Registers a listener called after every write with the new value.
    pub fn on_change(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.tx.subscribe()
    }

    /// Resolves with the first value, current or future, matching `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&T) -> bool) -> T {
        let mut rx = self.subscribe();
        let found = rx.wait_for(predicate).await.map(|value| (*value).clone());
        // The sender lives as long as `self`, so the channel cannot close here.
        found.unwrap_or_else(|_| self.get())
    }

    /// Writes without calling listeners; pair with [`Self::notify`] once
    /// any surrounding lock has been released.
    pub(crate) fn store(&self, value: T) {
        self.inner.tx.send_replace(value);
    }

    /// [`Self::store`] through an in-place edit.
    pub(crate) fn store_with(&self, f: impl FnOnce(&mut T)) {
        self.inner.tx.send_modify(f);
    }

    pub(crate) fn notify(&self) {
        // Listeners run without the lock held so they may touch this cell.
        let listeners: Vec<Listener<T>> = self
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.get();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener<T>)>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
