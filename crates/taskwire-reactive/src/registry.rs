#![forbid(unsafe_code)]

//! Scoped subscriptions tied to the lifetime of their owner.
//!
//! A [`SubscriptionRegistry`] is created by a UI component for one source
//! object (typically a model). Every binding made through it is recorded,
//! and all of them are unsubscribed when the registry is dropped, which
//! happens when the owning component is dropped. Callbacks into a destroyed
//! view are therefore impossible even if the view's host handle is still
//! reachable elsewhere.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::cell::{ReactiveCell, Subscription, SubscriptionId};

/// Records subscriptions made against cells of one source object and
/// releases them all on drop.
///
/// # Invariants
///
/// 1. Every recorded token came from a cell reachable from `source`.
/// 2. Each token is released exactly once (on [`release`](Self::release) or
///    on drop, whichever comes first).
pub struct SubscriptionRegistry<S> {
    source: Rc<S>,
    tokens: RefCell<Vec<Subscription>>,
}

impl<S> SubscriptionRegistry<S> {
    /// Create an empty registry observing `source`.
    #[must_use]
    pub fn new(source: Rc<S>) -> Self {
        Self {
            source,
            tokens: RefCell::new(Vec::new()),
        }
    }

    /// The object whose cells this registry binds to.
    #[must_use]
    pub fn source(&self) -> &Rc<S> {
        &self.source
    }

    /// Subscribe `callback` on behalf of `host` to the cell chosen by
    /// `select`, and record the subscription for later release.
    ///
    /// `select` names a field of the source, e.g. `|group| &group.name`.
    pub fn bind<T, H, F>(
        &self,
        select: impl FnOnce(&S) -> &ReactiveCell<T>,
        host: &Rc<H>,
        immediate: bool,
        callback: F,
    ) -> SubscriptionId
    where
        T: Clone + 'static,
        H: 'static,
        F: Fn(&H, &T, &T) + 'static,
    {
        // Clone the cell handle first: an immediate callback may bind again
        // through this registry.
        let cell = select(&self.source).clone();
        let subscription = cell.subscribe(host, immediate, callback);
        let id = subscription.id();
        self.tokens.borrow_mut().push(subscription);
        id
    }

    /// Number of recorded subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.borrow().len()
    }

    /// Whether nothing is currently recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.borrow().is_empty()
    }

    /// Unsubscribe everything recorded so far. The registry stays usable.
    pub fn release(&self) {
        let tokens = std::mem::take(&mut *self.tokens.borrow_mut());
        if tokens.is_empty() {
            return;
        }
        let released = tokens.iter().filter(|token| token.unsubscribe()).count();
        debug!(
            recorded = tokens.len(),
            released, "subscription registry released"
        );
    }
}

impl<S> Drop for SubscriptionRegistry<S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S> fmt::Debug for SubscriptionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("tokens", &self.tokens.borrow().len())
            .finish_non_exhaustive()
    }
}
