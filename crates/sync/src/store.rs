//! In-memory cart state with push-based subscriptions.
//!
//! [`CartStateStore`] owns the one canonical [`CartSnapshot`]. Replacing it
//! notifies every registered handler synchronously, in registration order,
//! with the complete new snapshot. By the time `replace` returns, every
//! handler has seen it.
//!
//! Handlers may read the store (`current()`) but must not call `replace`
//! from inside a notification. A handler whose [`Subscription`] is dropped
//! is never called again, even in the middle of a fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use cartwheel_core::CartSnapshot;

/// Callback invoked with every new snapshot.
pub type SnapshotHandler = Arc<dyn Fn(&CartSnapshot) + Send + Sync>;

/// Handle to the cart state. Cheap to clone; clones share the same state.
#[derive(Clone, Default)]
pub struct CartStateStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    state: Mutex<StoreState>,
    // Held for a whole replace so fan-outs never interleave
    publish: Mutex<()>,
}

#[derive(Clone)]
struct Registration {
    id: u64,
    active: Arc<AtomicBool>,
    handler: SnapshotHandler,
}

#[derive(Default)]
struct StoreState {
    snapshot: CartSnapshot,
    next_id: u64,
    handlers: Vec<Registration>,
}

impl StoreState {
    fn register(&mut self, store: &Arc<StoreInner>, handler: SnapshotHandler) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        let active = Arc::new(AtomicBool::new(true));
        self.handlers.push(Registration {
            id,
            active: Arc::clone(&active),
            handler,
        });

        tracing::trace!(subscriber = id, total = self.handlers.len(), "Cart subscriber added");

        Subscription {
            store: Arc::downgrade(store),
            active,
            id,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking handler must not wedge the cart for everyone else
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CartStateStore {
    /// Create a store holding the empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest snapshot.
    #[must_use]
    pub fn current(&self) -> CartSnapshot {
        lock(&self.inner.state).snapshot.clone()
    }

    /// Register `handler` for every future snapshot.
    ///
    /// The handler is not called with the current snapshot. Dropping the
    /// returned [`Subscription`] deregisters it.
    #[must_use = "dropping the subscription immediately deregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        lock(&self.inner.state).register(&self.inner, Arc::new(handler))
    }

    /// Register `handler` and call it once with the current snapshot.
    ///
    /// No `replace` can run between the seed call and registration, so the
    /// handler sees the current snapshot first and then every later one.
    #[must_use = "dropping the subscription immediately deregisters the handler"]
    pub fn subscribe_with_current<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        let _publishing = lock(&self.inner.publish);

        let handler: SnapshotHandler = Arc::new(handler);
        let (subscription, snapshot) = {
            let mut state = lock(&self.inner.state);
            let subscription = state.register(&self.inner, Arc::clone(&handler));
            (subscription, state.snapshot.clone())
        };

        handler(&snapshot);
        subscription
    }

    /// Install `snapshot` and notify every handler with it.
    pub fn replace(&self, snapshot: CartSnapshot) {
        let _publishing = lock(&self.inner.publish);

        let handlers: Vec<Registration> = {
            let mut state = lock(&self.inner.state);
            state.snapshot = snapshot.clone();
            state.handlers.clone()
        };

        tracing::trace!(
            items = snapshot.len(),
            subscribers = handlers.len(),
            "Publishing cart snapshot"
        );

        for registration in handlers {
            // Deregistered by an earlier handler in this fan-out
            if registration.active.load(Ordering::SeqCst) {
                (registration.handler)(&snapshot);
            }
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.state).handlers.len()
    }
}

/// Registration of a snapshot handler. Deregisters on drop.
#[derive(Debug)]
pub struct Subscription {
    store: Weak<StoreInner>,
    active: Arc<AtomicBool>,
    id: u64,
}

impl Subscription {
    /// Deregister the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(store) = self.store.upgrade() {
            lock(&store.state).handlers.retain(|r| r.id != self.id);
            tracing::trace!(subscriber = self.id, "Cart subscriber removed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cartwheel_core::{LineItem, ProductId, Quantity, Size};

    fn snapshot_of(products: &[i32]) -> CartSnapshot {
        products
            .iter()
            .map(|p| LineItem::unsaved(ProductId::new(*p), Size::Small, Quantity::ONE))
            .collect()
    }

    #[test]
    fn test_starts_empty() {
        let store = CartStateStore::new();
        assert!(store.current().is_empty());
    }

    #[test]
    fn test_replace_notifies_in_registration_order() {
        let store = CartStateStore::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let _subs: Vec<Subscription> = (0..3)
            .map(|n| {
                let log = Arc::clone(&log);
                store.subscribe(move |snapshot| {
                    log.lock().unwrap().push((n, snapshot.len()));
                })
            })
            .collect();

        store.replace(snapshot_of(&[1, 2]));

        assert_eq!(*log.lock().unwrap(), vec![(0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_subscribe_does_not_replay_current() {
        let store = CartStateStore::new();
        store.replace(snapshot_of(&[1]));

        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let _sub = store.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_handler_sees_complete_snapshot_and_store_agrees() {
        let store = CartStateStore::new();
        let reader = store.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let _sub = store.subscribe(move |snapshot| {
            // The store already holds the snapshot being delivered
            assert_eq!(&reader.current(), snapshot);
            sink.lock().unwrap().push(snapshot.clone());
        });

        store.replace(snapshot_of(&[1, 2, 3]));
        store.replace(CartSnapshot::empty());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].len(), 3);
        assert!(seen[1].is_empty());
    }

    #[test]
    fn test_drop_subscription_deregisters() {
        let store = CartStateStore::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);

        let sub = store.subscribe(move |_| *counter.lock().unwrap() += 1);
        store.replace(snapshot_of(&[1]));
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        store.replace(snapshot_of(&[2]));

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_dropped_mid_fanout_is_not_called() {
        let store = CartStateStore::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let victim_calls = Arc::new(Mutex::new(0));

        let target = Arc::clone(&slot);
        let _first = store.subscribe(move |_| {
            target.lock().unwrap().take();
        });

        let counter = Arc::clone(&victim_calls);
        *slot.lock().unwrap() = Some(store.subscribe(move |_| *counter.lock().unwrap() += 1));

        store.replace(snapshot_of(&[1]));
        store.replace(CartSnapshot::empty());

        assert_eq!(*victim_calls.lock().unwrap(), 0);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_subscribe_with_current_seeds_then_follows() {
        let store = CartStateStore::new();
        store.replace(snapshot_of(&[1, 2]));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe_with_current(move |snapshot| {
            sink.lock().unwrap().push(snapshot.len());
        });
        store.replace(snapshot_of(&[1]));

        assert_eq!(*seen.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_subscribe_with_current_never_ends_on_stale_seed() {
        for _ in 0..200 {
            let store = CartStateStore::new();
            let writer = store.clone();
            let publisher = std::thread::spawn(move || {
                for n in 1..=20 {
                    writer.replace(snapshot_of(&(0..n).collect::<Vec<_>>()));
                }
            });

            let latest = Arc::new(Mutex::new(0));
            let sink = Arc::clone(&latest);
            let _sub = store.subscribe_with_current(move |snapshot| {
                *sink.lock().unwrap() = snapshot.len();
            });

            publisher.join().unwrap();
            assert_eq!(*latest.lock().unwrap(), store.current().len());
        }
    }

    #[test]
    fn test_subscription_outliving_store_is_harmless() {
        let sub = {
            let store = CartStateStore::new();
            store.subscribe(|_| {})
        };
        drop(sub);
    }

    #[test]
    fn test_published_snapshot_is_not_affected_by_later_replace() {
        let store = CartStateStore::new();
        store.replace(snapshot_of(&[1]));
        let held = store.current();

        store.replace(snapshot_of(&[1, 2]));

        assert_eq!(held.len(), 1);
        assert_eq!(store.current().len(), 2);
    }
}
