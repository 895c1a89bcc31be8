#![forbid(unsafe_code)]

//! Reactive cell: a value holder that pushes `(old, new)` to its subscribers.
//!
//! # Design
//!
//! [`ReactiveCell<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). Every write notifies all live subscriptions in
//! registration order with the previous and the new value. There is no
//! equality check: writing the same value again is still a notification.
//!
//! Each subscription is bound to a *host* held through a [`WeakHandle`]. The
//! cell never keeps a host alive; once the host is dropped its callback is
//! inert and the entry is pruned on the next publish.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone of `T`        |
//! | `publish()`   | O(S) where S = subscribers |
//! | `subscribe()` | O(1) amortized             |
//! | `unsubscribe()` | O(S)                     |
//!
//! # Failure Modes
//!
//! - **Re-entrant publish**: a callback may publish to the cell that
//!   triggered it. The nested publish runs to completion before the outer
//!   dispatch continues, so later subscribers of the outer round see the outer
//!   `(old, new)` pair after having already seen the nested one. Callers that
//!   write back into their own source are responsible for terminating the
//!   recursion.
//! - **Subscriber leak**: subscriptions whose host stays alive are never
//!   removed automatically. Use [`Subscription::unsubscribe`] or a
//!   [`SubscriptionRegistry`](crate::SubscriptionRegistry).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::config::{CellConfig, crossed_threshold};
use crate::weak::WeakHandle;

/// Unique token identifying one subscription.
///
/// Tokens are unique across all cells in the process, so a token can be
/// logged or stored next to others without ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the token.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Callback with the host type erased. Returns `false` when the host is not
/// of the type the subscriber registered with.
type ErasedCallback<T> = Box<dyn Fn(&dyn Any, &T, &T) -> bool>;

struct Entry<T> {
    id: SubscriptionId,
    host: WeakHandle<dyn Any>,
    callback: ErasedCallback<T>,
    /// Cleared by `unsubscribe` so a round already in flight skips it.
    active: Cell<bool>,
}

impl<T> Entry<T> {
    fn is_live(&self) -> bool {
        self.active.get() && self.host.is_alive()
    }

    fn dispatch(&self, old: &T, new: &T) -> bool {
        if !self.active.get() {
            return false;
        }
        match self.host.value() {
            Some(host) => (self.callback)(&*host, old, new),
            None => false,
        }
    }
}

struct CellState<T> {
    value: T,
    version: u64,
    entries: Vec<Rc<Entry<T>>>,
    config: CellConfig,
}

/// Removes `id` from `state`. The removed entry is returned so the caller
/// can drop it after the borrow ends: its callback may own values whose
/// destructors call back into this cell.
fn detach<T>(state: &RefCell<CellState<T>>, id: SubscriptionId) -> Option<Rc<Entry<T>>> {
    let mut state = state.borrow_mut();
    let index = state.entries.iter().position(|entry| entry.id == id)?;
    let entry = state.entries.remove(index);
    entry.active.set(false);
    Some(entry)
}

/// Type-erased unsubscribe capability, so a [`Subscription`] does not carry
/// the cell's value type.
trait Release {
    fn release(&self, id: SubscriptionId) -> bool;
}

impl<T> Release for RefCell<CellState<T>> {
    fn release(&self, id: SubscriptionId) -> bool {
        let removed = detach(self, id);
        removed.is_some()
    }
}

/// A shared value holder that notifies subscribers on every write.
///
/// Cloning a `ReactiveCell` creates a new handle to the **same** state: both
/// handles see the same value and share subscribers.
///
/// # Invariants
///
/// 1. No two subscriptions share a [`SubscriptionId`].
/// 2. Subscribers are notified in registration order.
/// 3. A subscription whose host is dead is never dispatched to, and is gone
///    from the list once the next `publish` returns.
/// 4. `version` increments by exactly 1 per publish.
pub struct ReactiveCell<T> {
    inner: Rc<RefCell<CellState<T>>>,
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("ReactiveCell")
            .field("label", &state.config.label)
            .field("value", &state.value)
            .field("version", &state.version)
            .field("subscriber_count", &state.entries.len())
            .finish()
    }
}

impl<T: Clone + Default + 'static> Default for ReactiveCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> ReactiveCell<T> {
    /// Create a cell with the given initial value and default configuration.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_config(value, CellConfig::default())
    }

    /// Create a cell with an explicit configuration.
    #[must_use]
    pub fn with_config(value: T, config: CellConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellState {
                value,
                version: 0,
                entries: Vec::new(),
                config,
            })),
        }
    }

    /// A clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// The value stays borrowed while `f` runs, so `f` may read this cell
    /// (`get`, `with`, `version`) but must not write to it.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls `publish`, `update`, or `republish` on this cell
    /// or on a clone of it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store `value` and notify every live subscriber with `(old, new)`.
    ///
    /// Runs synchronously on the calling thread. Subscriptions whose host has
    /// been dropped are skipped and removed before this returns.
    pub fn publish(&self, value: T) {
        let new = value.clone();
        let old = {
            let mut state = self.inner.borrow_mut();
            state.version += 1;
            std::mem::replace(&mut state.value, value)
        };
        self.notify(&old, &new);
    }

    /// Modify a copy of the value and publish the result.
    ///
    /// `f` runs outside any internal borrow, so it may read this cell.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.publish(next);
    }

    /// Notify every live subscriber with `(current, current)` without
    /// changing the value.
    ///
    /// Used after mutating shared state the cell only points to (e.g. an
    /// element of a list of `Rc`s) to force views to refresh.
    pub fn republish(&self) {
        let current = {
            let mut state = self.inner.borrow_mut();
            state.version += 1;
            state.value.clone()
        };
        self.notify(&current, &current);
    }

    /// Register `callback` on behalf of `host`.
    ///
    /// The cell keeps only a weak reference to `host`; the callback receives
    /// the live host together with `(old, new)` on every publish. With
    /// `immediate`, the callback is also invoked once with
    /// `(current, current)` before this returns.
    ///
    /// Any host is accepted, including one unrelated to the cell's owner.
    pub fn subscribe<H, F>(&self, host: &Rc<H>, immediate: bool, callback: F) -> Subscription
    where
        H: 'static,
        F: Fn(&H, &T, &T) + 'static,
    {
        let id = SubscriptionId::next();
        let erased: ErasedCallback<T> =
            Box::new(move |host: &dyn Any, old: &T, new: &T| match host.downcast_ref::<H>() {
                Some(host) => {
                    callback(host, old, new);
                    true
                }
                None => false,
            });
        let entry = Rc::new(Entry {
            id,
            host: WeakHandle::erased(host),
            callback: erased,
            active: Cell::new(true),
        });

        {
            let mut state = self.inner.borrow_mut();
            state.entries.push(Rc::clone(&entry));
            let len = state.entries.len();
            if crossed_threshold(len, state.config.subscriber_warn_threshold) {
                warn!(
                    cell = state.config.label_or_default(),
                    subscribers = len,
                    "subscriber list grew past threshold; hosts may be leaking"
                );
            }
            trace!(cell = state.config.label_or_default(), %id, immediate, "subscribe");
        }

        if immediate {
            let current = self.get();
            entry.dispatch(&current, &current);
        }

        let release: Rc<dyn Release> = self.inner.clone();
        Subscription {
            id,
            cell: Rc::downgrade(&release),
        }
    }

    /// Remove the subscription with `id`. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let removed = detach(&self.inner, id);
        if removed.is_some() {
            trace!(cell = self.label(), %id, "unsubscribe");
        }
    }

    /// Number of publishes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of stored subscriptions, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Log label from the cell's configuration.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.inner.borrow().config.label_or_default()
    }

    fn notify(&self, old: &T, new: &T) {
        let (snapshot, version) = {
            let state = self.inner.borrow();
            (state.entries.clone(), state.version)
        };
        trace!(
            cell = self.label(),
            version,
            subscribers = snapshot.len(),
            "publish"
        );

        // No borrow is held here: callbacks may publish, subscribe, or
        // unsubscribe on this very cell.
        for entry in &snapshot {
            entry.dispatch(old, new);
        }

        self.prune();
    }

    fn prune(&self) {
        let dead: Vec<Rc<Entry<T>>> = {
            let mut state = self.inner.borrow_mut();
            let (live, dead) = std::mem::take(&mut state.entries)
                .into_iter()
                .partition(|entry| entry.is_live());
            state.entries = live;
            dead
        };
        if !dead.is_empty() {
            debug!(cell = self.label(), pruned = dead.len(), "pruned dead subscriptions");
        }
    }
}

/// Capability to cancel one subscription later.
///
/// Dropping a `Subscription` does **not** unsubscribe; the subscription
/// lives until [`unsubscribe`](Self::unsubscribe) is called or its host is
/// dropped. The handle holds the cell weakly, so it is safe to keep after the
/// cell is gone.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    cell: Weak<dyn Release>,
}

impl Subscription {
    /// The token of this subscription.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription from its cell. Idempotent.
    ///
    /// Returns `true` if a subscription was actually removed.
    pub fn unsubscribe(&self) -> bool {
        match self.cell.upgrade() {
            Some(cell) => cell.release(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("cell_alive", &(self.cell.strong_count() > 0))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
