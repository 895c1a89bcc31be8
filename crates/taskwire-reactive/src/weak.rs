#![forbid(unsafe_code)]

//! Non-owning references to subscription hosts.
//!
//! A [`WeakHandle`] never keeps its target alive. Cells and the event bus
//! store their hosts this way so that a view can be dropped independently of
//! the models and buses it subscribed through; a dead handle simply makes the
//! corresponding callback inert.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

/// A non-owning reference to a host object.
///
/// Absence is the only failure signal: [`value`](Self::value) returns `None`
/// once the last strong reference to the target has been dropped.
pub struct WeakHandle<T: ?Sized> {
    inner: Weak<T>,
}

impl<T: ?Sized> WeakHandle<T> {
    /// Create a handle to `target` without extending its lifetime.
    #[must_use]
    pub fn new(target: &Rc<T>) -> Self {
        Self {
            inner: Rc::downgrade(target),
        }
    }

    /// The referenced object, if it is still alive.
    #[must_use]
    pub fn value(&self) -> Option<Rc<T>> {
        self.inner.upgrade()
    }

    /// Whether the referenced object is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Whether this handle refers to the same allocation as `other`.
    ///
    /// Compares addresses only, so a `WeakHandle<dyn Any>` can be matched
    /// against the concrete `Rc<H>` it was erased from. A dead handle still
    /// compares by address; the allocation is not reused while the handle
    /// exists.
    #[must_use]
    pub fn points_to<U: ?Sized>(&self, other: &Rc<U>) -> bool {
        std::ptr::addr_eq(self.inner.as_ptr(), Rc::as_ptr(other))
    }
}

impl<T> WeakHandle<T> {
    /// A handle that refers to nothing and is never alive.
    #[must_use]
    pub fn empty() -> Self {
        Self { inner: Weak::new() }
    }
}

impl WeakHandle<dyn Any> {
    /// Erase the host type so hosts of any type can share one registry.
    ///
    /// The concrete type is recovered at dispatch time with
    /// [`Any::downcast_ref`].
    #[must_use]
    pub fn erased<H: 'static>(host: &Rc<H>) -> Self {
        let any: Rc<dyn Any> = host.clone();
        Self::new(&any)
    }
}

impl<T: ?Sized> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
