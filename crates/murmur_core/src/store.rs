//! Observable value stores
//!
//! A [`Store<T>`] holds a single current value and pushes every new value to
//! the observers registered with [`Store::subscribe`]. It is the one
//! primitive behind every piece of shared UI state in Murmur: the message
//! history, the active profile and the modal-closed signal are all plain
//! stores that differ only in their value type.
//!
//! # Semantics
//!
//! - `subscribe` calls the observer once, right away, with the current value.
//! - `set` replaces the value unconditionally. There is no equality check, so
//!   writing the same value twice notifies twice.
//! - `update` reads the latest value at call time and behaves as `set`.
//! - Observers may write to the store they observe. A write issued while a
//!   notification is being delivered updates the value immediately and queues
//!   its notifications behind the ones already pending, so every observer sees
//!   each value exactly once, in write order.
//! - Unsubscribing is idempotent, and an observer removed mid-dispatch gets
//!   none of its still-queued notifications.
//!
//! Stores are single-threaded (`Rc`/`RefCell`) and meant to live on the UI
//! thread for the whole session.
//!
//! # Example
//!
//! ```rust
//! use murmur_core::store::Store;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let count = Store::new(0i32);
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let log = seen.clone();
//! let sub = count.subscribe(move |v| log.borrow_mut().push(*v));
//!
//! count.set(5);
//! count.update(|v| v + 1);
//! sub.unsubscribe();
//! count.set(100);
//!
//! assert_eq!(*seen.borrow(), vec![0, 5, 6]);
//! assert_eq!(count.get(), 100);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Slot of a registered observer
    pub struct SubscriberId;
}

/// Registered observer callback
type Observer<T> = Rc<dyn Fn(&T)>;

/// Shared state behind every [`Store`] handle
struct StoreInner<T> {
    /// Current value; shared with pending notifications
    value: RefCell<Rc<T>>,
    /// Registered observers
    observers: RefCell<SlotMap<SubscriberId, Observer<T>>>,
    /// Notifications not yet delivered, oldest first
    pending: RefCell<VecDeque<(SubscriberId, Rc<T>)>>,
    /// True while `dispatch` is draining `pending`
    dispatching: Cell<bool>,
    /// Number of writes so far
    version: Cell<u64>,
    /// Optional name, used in log output
    label: Option<Cow<'static, str>>,
}

impl<T> StoreInner<T> {
    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed>")
    }

    /// Deliver pending notifications until the queue is empty.
    ///
    /// A nested call (an observer writing to this store) returns at once and
    /// leaves the queued work to the outer loop.
    fn dispatch(&self) {
        if self.dispatching.replace(true) {
            return;
        }
        let _guard = DispatchGuard { inner: self };

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some((id, value)) = next else {
                break;
            };
            let observer = self.observers.borrow().get(id).cloned();
            if let Some(observer) = observer {
                observer(&*value);
            }
        }
    }
}

/// Clears the dispatch state when draining ends, including by unwinding
struct DispatchGuard<'a, T> {
    inner: &'a StoreInner<T>,
}

impl<T> Drop for DispatchGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner.pending.borrow_mut().clear();
        }
        self.inner.dispatching.set(false);
    }
}

/// Type-erased detach access, so a [`Subscription`] is not generic over `T`
trait Detach {
    fn detach(&self, id: SubscriberId) -> bool;
    fn is_attached(&self, id: SubscriberId) -> bool;
}

impl<T> Detach for StoreInner<T> {
    fn detach(&self, id: SubscriberId) -> bool {
        let removed = self.observers.borrow_mut().remove(id).is_some();
        if removed {
            tracing::debug!(store = self.label(), ?id, "observer unsubscribed");
        }
        removed
    }

    fn is_attached(&self, id: SubscriberId) -> bool {
        self.observers.borrow().contains_key(id)
    }
}

/// A shared, observable value
///
/// Cloning a `Store` clones the handle; all clones read and write the same
/// value and share one set of observers.
pub struct Store<T: 'static> {
    inner: Rc<StoreInner<T>>,
}

impl<T: 'static> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Store<T> {
    /// Create a store holding `initial`
    pub fn new(initial: T) -> Self {
        Self::build(None, initial)
    }

    /// Create a store with a name that shows up in log output
    pub fn labeled(label: impl Into<Cow<'static, str>>, initial: T) -> Self {
        Self::build(Some(label.into()), initial)
    }

    fn build(label: Option<Cow<'static, str>>, initial: T) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                value: RefCell::new(Rc::new(initial)),
                observers: RefCell::new(SlotMap::with_key()),
                pending: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                version: Cell::new(0),
                label,
            }),
        }
    }

    /// Get a copy of the current value
    pub fn get(&self) -> T {
        (*self.current()).clone()
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let current = self.current();
        f(&*current)
    }

    /// Replace the value and notify every observer
    pub fn set(&self, value: T) {
        let value = Rc::new(value);
        *self.inner.value.borrow_mut() = Rc::clone(&value);
        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);

        let ids: SmallVec<[SubscriberId; 8]> = self.inner.observers.borrow().keys().collect();
        tracing::trace!(
            store = self.inner.label(),
            version,
            observers = ids.len(),
            "store set"
        );

        self.inner
            .pending
            .borrow_mut()
            .extend(ids.into_iter().map(|id| (id, Rc::clone(&value))));
        self.inner.dispatch();
    }

    /// Compute a new value from the current one and [`set`](Self::set) it
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        let next = f(self.get());
        self.set(next);
    }

    /// Register an observer
    ///
    /// The observer runs once immediately with the current value, then once
    /// per write until the returned [`Subscription`] is unsubscribed.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let observer: Observer<T> = Rc::new(observer);
        let id = self
            .inner
            .observers
            .borrow_mut()
            .insert(Rc::clone(&observer));
        tracing::debug!(store = self.inner.label(), ?id, "observer subscribed");

        let current = self.current();
        observer(&*current);

        let source: Weak<StoreInner<T>> = Rc::downgrade(&self.inner);
        let source: Weak<dyn Detach> = source;
        Subscription { id, source }
    }

    /// A read-only handle to this store
    pub fn readonly(&self) -> Readable<T> {
        Readable {
            store: self.clone(),
            upstream: None,
        }
    }

    /// A read-only store holding `f(value)`, recomputed on every write here
    ///
    /// The derived handle keeps this store alive, while this store only holds
    /// a weak link back. Once every derived handle is dropped, the link is
    /// removed on the next write.
    pub fn derive<U, F>(&self, f: F) -> Readable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let upstream: Rc<dyn Any> = Rc::new(self.clone());
        self.derive_with_upstream(f, upstream)
    }

    /// `derive`, with `upstream` held by the result so the chain above it
    /// outlives every intermediate handle
    fn derive_with_upstream<U, F>(&self, f: F, upstream: Rc<dyn Any>) -> Readable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let label = self
            .inner
            .label
            .as_ref()
            .map(|l| Cow::Owned(format!("{l}.derived")));
        let derived = Store::build(label, self.with(&f));

        let target = derived.downgrade();
        let source = self.downgrade();
        let own_id: Rc<Cell<Option<SubscriberId>>> = Rc::new(Cell::new(None));
        let link_id = Rc::clone(&own_id);
        let primed = Cell::new(false);

        let subscription = self.subscribe(move |value| {
            // The initial call sees the value `derived` was built from.
            if !primed.replace(true) {
                return;
            }
            match target.upgrade() {
                Some(target) => target.set(f(value)),
                None => {
                    if let (Some(source), Some(id)) = (source.upgrade(), link_id.get()) {
                        source.inner.detach(id);
                    }
                }
            }
        });
        own_id.set(Some(subscription.id()));

        Readable {
            store: derived,
            upstream: Some(upstream),
        }
    }

    fn current(&self) -> Rc<T> {
        Rc::clone(&self.inner.value.borrow())
    }
}

impl<T: 'static> Store<T> {
    /// Number of writes since creation
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of registered observers
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Name given at creation, if any
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Whether both handles point at the same store
    pub fn ptr_eq(&self, other: &Store<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the store alive
    pub fn downgrade(&self) -> WeakStore<T> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<T: Clone + Default + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("label", &self.inner.label)
            .field("value", &**self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("subscribers", &self.inner.observers.borrow().len())
            .finish()
    }
}

/// Non-owning store handle, for observers that refer back to a store
pub struct WeakStore<T: 'static> {
    inner: Weak<StoreInner<T>>,
}

impl<T: 'static> WeakStore<T> {
    /// The store, if any strong handle to it is still alive
    pub fn upgrade(&self) -> Option<Store<T>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<T: 'static> Clone for WeakStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: 'static> fmt::Debug for WeakStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Read-only view of a [`Store`]
pub struct Readable<T: 'static> {
    store: Store<T>,
    /// Source handle of a derived view, held so the source stays alive
    upstream: Option<Rc<dyn Any>>,
}

impl<T: 'static> Clone for Readable<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            upstream: self.upstream.clone(),
        }
    }
}

impl<T: Clone + 'static> Readable<T> {
    /// Clone of the current value
    pub fn get(&self) -> T {
        self.store.get()
    }

    /// Borrow the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.store.with(f)
    }

    /// Register an observer, see [`Store::subscribe`]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.store.subscribe(observer)
    }

    /// A read-only store holding `f(value)`; keeps this view alive
    pub fn derive<U, F>(&self, f: F) -> Readable<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let upstream: Rc<dyn Any> = Rc::new(self.clone());
        self.store.derive_with_upstream(f, upstream)
    }

    /// Number of writes since creation
    pub fn version(&self) -> u64 {
        self.store.version()
    }

    /// Number of registered observers
    pub fn subscriber_count(&self) -> usize {
        self.store.subscriber_count()
    }
}

impl<T: Clone + 'static> From<Store<T>> for Readable<T> {
    fn from(store: Store<T>) -> Self {
        Self {
            store,
            upstream: None,
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Readable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Readable").field(&self.store).finish()
    }
}

/// Handle returned by `subscribe`
///
/// Dropping it does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
pub struct Subscription {
    id: SubscriberId,
    source: Weak<dyn Detach>,
}

impl Subscription {
    /// Stop notifications to this observer. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(source) = self.source.upgrade() {
            source.detach(self.id);
        }
    }

    /// Whether the observer is still registered
    pub fn is_active(&self) -> bool {
        self.source
            .upgrade()
            .is_some_and(|source| source.is_attached(self.id))
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(&T) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v: &T| sink.borrow_mut().push(v.clone()))
    }

    #[test]
    fn test_get_returns_last_written_value() {
        let store = Store::new(1i32);
        store.set(2);
        store.update(|v| v * 10);
        store.set(7);
        assert_eq!(store.get(), 7);
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn test_subscribe_calls_observer_immediately() {
        let store = Store::new("idle".to_string());
        let (seen, observer) = recorder::<String>();

        let _sub = store.subscribe(observer);

        assert_eq!(*seen.borrow(), vec!["idle".to_string()]);
    }

    #[test]
    fn test_every_observer_notified_once_per_set() {
        let store = Store::new(0u8);
        let (a, obs_a) = recorder::<u8>();
        let (b, obs_b) = recorder::<u8>();
        let _sa = store.subscribe(obs_a);
        let _sb = store.subscribe(obs_b);

        store.set(1);
        store.set(1);

        assert_eq!(*a.borrow(), vec![0, 1, 1]);
        assert_eq!(*b.borrow(), vec![0, 1, 1]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let store = Store::new(0i32);
        let (seen, observer) = recorder::<i32>();
        let sub = store.subscribe(observer);

        store.set(1);
        sub.unsubscribe();
        assert!(!sub.is_active());
        sub.unsubscribe();
        store.set(2);

        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_store_dropped() {
        let store = Store::new(0i32);
        let sub = store.subscribe(|_| {});
        drop(store);

        assert!(!sub.is_active());
        sub.unsubscribe();
    }

    #[test]
    fn test_update_reads_latest_value() {
        let store = Store::new(Vec::<u32>::new());
        store.set(vec![1]);
        store.update(|mut v| {
            v.push(2);
            v
        });
        assert_eq!(store.get(), vec![1, 2]);
    }

    #[test]
    fn test_nested_set_preserves_order() {
        let store = Store::new(0i32);
        let (seen, observer) = recorder::<i32>();

        let writer = store.clone();
        let _bump = store.subscribe(move |v| {
            if *v == 1 {
                writer.set(2);
            }
        });
        let _log = store.subscribe(observer);

        store.set(1);

        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(store.get(), 2);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_drops_queued_notifications() {
        let store = Store::new(0i32);
        let (seen, observer) = recorder::<i32>();
        let victim = Rc::new(store.subscribe(observer));

        let handle = victim.clone();
        let _killer = store.subscribe(move |v| {
            if *v == 1 {
                handle.unsubscribe();
            }
        });

        store.set(1);
        store.set(2);

        // The victim may or may not see 1 depending on slot order, never 2.
        assert!(!seen.borrow().contains(&2));
        assert_eq!(seen.borrow()[0], 0);
    }

    #[test]
    fn test_subscribe_inside_observer() {
        let store = Store::new(0i32);
        let (seen, observer) = recorder::<i32>();
        let observer = Rc::new(observer);
        let late: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let source = store.clone();
        let slot = late.clone();
        let _spawner = store.subscribe(move |v| {
            if *v == 1 && slot.borrow().is_none() {
                let obs = observer.clone();
                let sub = source.subscribe(move |v| obs(v));
                *slot.borrow_mut() = Some(sub);
            }
        });

        store.set(1);
        store.set(2);

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_derive_follows_source() {
        let names = Store::new(vec!["ada".to_string()]);
        let count = names.derive(|v| v.len());
        let (seen, observer) = recorder::<usize>();
        let _sub = count.subscribe(observer);

        names.update(|mut v| {
            v.push("bob".into());
            v
        });

        assert_eq!(count.get(), 2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(count.version(), 1);
    }

    #[test]
    fn test_dropped_derived_detaches_from_source() {
        let source = Store::new(1i32);
        let doubled = source.derive(|v| v * 2);
        assert_eq!(source.subscriber_count(), 1);

        drop(doubled);
        source.set(2);

        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn test_chained_derive_keeps_updating() {
        let source = Store::new(1i32);
        let chained = source.derive(|v| v * 2).derive(|v| v + 1);
        assert_eq!(chained.get(), 3);

        source.set(5);
        assert_eq!(chained.get(), 11);

        source.update(|v| v - 5);
        assert_eq!(chained.get(), 1);
    }

    #[test]
    fn test_readable_derive_follows_source() {
        let source = Store::new("ada".to_string());
        let view = source.readonly();
        let upper = view.derive(|s| s.to_uppercase());
        drop(view);

        let (seen, observer) = recorder::<String>();
        let _sub = upper.subscribe(observer);
        source.set("bo".into());

        assert_eq!(*seen.borrow(), vec!["ADA".to_string(), "BO".to_string()]);
    }

    #[test]
    fn test_dropped_chain_detaches_from_source() {
        let source = Store::new(1i32);
        let chained = source.derive(|v| v * 2).derive(|v| v + 1);
        assert_eq!(source.subscriber_count(), 1);

        drop(chained);
        source.set(2);

        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn test_readonly_shares_value() {
        let store = Store::labeled("flag", false);
        let view = store.readonly();
        store.set(true);
        assert!(view.get());
        assert_eq!(store.label(), Some("flag"));
    }

    #[test]
    fn test_clone_shares_state() {
        let a = Store::new(0i32);
        let b = a.clone();
        b.set(9);
        assert_eq!(a.get(), 9);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Store::new(9)));
    }

    #[test]
    fn test_weak_store_does_not_keep_store_alive() {
        let store = Store::new(0i32);
        let weak = store.downgrade();
        assert!(weak.upgrade().is_some());
        drop(store);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_store_usable_after_observer_panic() {
        let store = Store::new(0i32);
        let _boom = store.subscribe(|v| {
            if *v == 1 {
                panic!("observer failed");
            }
        });

        let writer = store.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| writer.set(1)));
        assert!(result.is_err());

        let (seen, observer) = recorder::<i32>();
        let _log = store.subscribe(observer);
        store.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Set(i32),
        Add(i32),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![any::<i32>().prop_map(Op::Set), (-100i32..100).prop_map(Op::Add)]
    }

    fn apply(store: &Store<i32>, op: &Op) {
        match *op {
            Op::Set(v) => store.set(v),
            Op::Add(d) => store.update(|v| v.wrapping_add(d)),
        }
    }

    proptest! {
        /// `get` after any write sequence is the last value written, and an
        /// observer sees the initial value followed by every write in order.
        #[test]
        fn writes_are_observed_in_order(initial in any::<i32>(), ops in prop::collection::vec(arb_op(), 0..40)) {
            let store = Store::new(initial);
            let seen = Rc::new(RefCell::new(Vec::new()));
            let log = seen.clone();
            let _sub = store.subscribe(move |v: &i32| log.borrow_mut().push(*v));

            let mut expected = vec![initial];
            let mut current = initial;
            for op in &ops {
                current = match *op {
                    Op::Set(v) => v,
                    Op::Add(d) => current.wrapping_add(d),
                };
                apply(&store, op);
                expected.push(current);
            }

            prop_assert_eq!(store.get(), current);
            prop_assert_eq!(store.version(), ops.len() as u64);
            let seen = seen.borrow().clone();
            prop_assert_eq!(seen, expected);
        }

        /// A derive chain always holds its functions applied to the source.
        #[test]
        fn derive_chain_tracks_source(ops in prop::collection::vec(arb_op(), 1..40)) {
            let source = Store::new(0i32);
            let chained = source
                .derive(|v| v.wrapping_mul(2))
                .derive(|v| v.wrapping_add(1));

            for op in &ops {
                apply(&source, op);
                prop_assert_eq!(chained.get(), source.get().wrapping_mul(2).wrapping_add(1));
            }
        }
    }
}
