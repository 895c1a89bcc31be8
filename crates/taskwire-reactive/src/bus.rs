#![forbid(unsafe_code)]

//! Type-keyed event bus for commands and notifications between components.
//!
//! Emitters and handlers never reference each other: a view emits
//! `DeleteTask`, and whichever controller registered for `DeleteTask` handles
//! it. Handlers are stored together with a weak reference to the host that
//! registered them; a dropped host makes its handlers inert and they are
//! removed the next time their event is emitted.
//!
//! # Invariants
//!
//! 1. Handlers for one event type run in registration order.
//! 2. `emit` of event type A never reaches handlers registered for type B.
//! 3. No empty bucket stays in the map: whichever operation empties an
//!    event's listener list also removes the entry.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No listeners | Nothing registered for the event | `emit` is a no-op |
//! | Dead host | Host dropped without `reset` | Skipped, removed during `emit` |
//! | Type mismatch | Stored host or payload is not the registered type | Skipped silently |
//! | Listener leak | Host alive, never calls `reset`/`off` | Warning past threshold |

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::config::{EventBusConfig, crossed_threshold};
use crate::weak::WeakHandle;

/// An event that can travel over an [`EventBus`].
///
/// Each event type has a fixed payload shape, possibly `()`. The Rust type of
/// the event is its routing identity; [`name`](Self::name) is only used for
/// diagnostics.
pub trait Event: 'static {
    /// Data delivered to handlers.
    type Payload: 'static;

    /// The payload carried by this instance.
    fn payload(&self) -> &Self::Payload;

    /// Human-readable event name.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Handler with host and payload types erased.
trait ErasedHandler {
    /// Invoke the handler if `host` and `payload` are of the types it was
    /// registered with. Returns whether it ran.
    fn try_invoke(&self, host: &dyn Any, payload: &dyn Any) -> bool;
}

struct TypedHandler<H, P, F> {
    callback: F,
    _types: PhantomData<fn(&H, &P)>,
}

impl<H, P, F> TypedHandler<H, P, F> {
    fn new(callback: F) -> Self {
        Self {
            callback,
            _types: PhantomData,
        }
    }
}

impl<H, P, F> ErasedHandler for TypedHandler<H, P, F>
where
    H: 'static,
    P: 'static,
    F: Fn(&H, &P),
{
    fn try_invoke(&self, host: &dyn Any, payload: &dyn Any) -> bool {
        match (host.downcast_ref::<H>(), payload.downcast_ref::<P>()) {
            (Some(host), Some(payload)) => {
                (self.callback)(host, payload);
                true
            }
            _ => false,
        }
    }
}

struct Listener {
    host: WeakHandle<dyn Any>,
    handler: Box<dyn ErasedHandler>,
    /// Cleared by `off`/`reset` so an emit already in flight skips it.
    active: Cell<bool>,
}

impl Listener {
    fn is_live(&self) -> bool {
        self.active.get() && self.host.is_alive()
    }
}

struct Bucket {
    name: &'static str,
    listeners: Vec<Rc<Listener>>,
}

/// Outcome counters of one [`EventBus::emit`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    /// Handlers that ran.
    pub delivered: usize,
    /// Entries skipped because their host was gone.
    pub dead: usize,
    /// Entries skipped because of a host or payload type mismatch.
    pub mismatched: usize,
}

thread_local! {
    static SHARED: Rc<EventBus> = Rc::new(EventBus::new());
}

/// Registry of event handlers keyed by event type.
///
/// The bus is single-threaded: it is neither `Send` nor `Sync`, and all
/// dispatch is synchronous on the caller's thread. Handlers may call back
/// into the bus (`on`, `off`, `reset`, `emit`) while an emit is running.
pub struct EventBus {
    buckets: RefCell<HashMap<TypeId, Bucket>>,
    config: EventBusConfig,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = self.buckets.borrow();
        let listeners: usize = buckets.values().map(|b| b.listeners.len()).sum();
        f.debug_struct("EventBus")
            .field("events", &buckets.len())
            .field("listeners", &listeners)
            .field("config", &self.config)
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create an empty bus with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            buckets: RefCell::new(HashMap::new()),
            config,
        }
    }

    /// The default bus of the current thread.
    ///
    /// Every call on the same thread returns the same instance. It is never
    /// torn down; dead hosts are pruned during `emit`, and live hosts should
    /// call [`reset`](Self::reset) from their teardown path.
    #[must_use]
    pub fn shared() -> Rc<EventBus> {
        SHARED.with(Rc::clone)
    }

    /// Register `handler` for events of type `E` on behalf of `host`.
    ///
    /// The bus holds `host` weakly. Registering the same host twice for the
    /// same event yields two independent handlers.
    pub fn on<E, H, F>(&self, host: &Rc<H>, handler: F)
    where
        E: Event,
        H: 'static,
        F: Fn(&H, &E::Payload) + 'static,
    {
        let listener = Listener {
            host: WeakHandle::erased(host),
            handler: Box::new(TypedHandler::<H, E::Payload, F>::new(handler)),
            active: Cell::new(true),
        };
        self.register(TypeId::of::<E>(), E::name(), listener);
    }

    fn register(&self, key: TypeId, name: &'static str, listener: Listener) {
        let mut buckets = self.buckets.borrow_mut();
        let bucket = buckets.entry(key).or_insert_with(|| Bucket {
            name,
            listeners: Vec::new(),
        });
        bucket.listeners.push(Rc::new(listener));
        let len = bucket.listeners.len();
        if crossed_threshold(len, self.config.listener_warn_threshold) {
            warn!(
                event = name,
                listeners = len,
                "event listener list grew past threshold; hosts may be missing reset"
            );
        }
        trace!(event = name, listeners = len, "on");
    }

    /// Deliver `event` to every live handler registered for its type, in
    /// registration order.
    ///
    /// Entries whose host has been dropped are skipped and removed, so one
    /// call both dispatches and collects garbage. Emitting an event nobody
    /// listens to does nothing.
    pub fn emit<E: Event>(&self, event: &E) -> EmitStats {
        let key = TypeId::of::<E>();
        let snapshot = {
            let buckets = self.buckets.borrow();
            match buckets.get(&key) {
                Some(bucket) => bucket.listeners.clone(),
                None => {
                    trace!(event = E::name(), "emit without listeners");
                    return EmitStats::default();
                }
            }
        };

        let payload: &dyn Any = event.payload();
        let mut stats = EmitStats::default();
        // No borrow is held while handlers run.
        for listener in &snapshot {
            if !listener.active.get() {
                continue;
            }
            let Some(host) = listener.host.value() else {
                stats.dead += 1;
                continue;
            };
            if listener.handler.try_invoke(&*host, payload) {
                stats.delivered += 1;
            } else {
                stats.mismatched += 1;
            }
        }
        trace!(
            event = E::name(),
            delivered = stats.delivered,
            dead = stats.dead,
            mismatched = stats.mismatched,
            "emit"
        );

        self.prune(key);
        stats
    }

    /// Drop inactive and dead entries of one event, removing the bucket if
    /// it ends up empty.
    fn prune(&self, key: TypeId) {
        let removed: Vec<Rc<Listener>> = {
            let mut buckets = self.buckets.borrow_mut();
            let Some(bucket) = buckets.get_mut(&key) else {
                return;
            };
            let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut bucket.listeners)
                .into_iter()
                .partition(|listener| listener.is_live());
            bucket.listeners = live;
            let name = bucket.name;
            if bucket.listeners.is_empty() {
                buckets.remove(&key);
                debug!(event = name, "removed empty event bucket");
            }
            if !dead.is_empty() {
                debug!(event = name, pruned = dead.len(), "pruned dead listeners");
            }
            dead
        };
        // Handlers may own values whose destructors re-enter the bus.
        drop(removed);
    }

    /// Remove every registration of `host` for event type `E`.
    ///
    /// Returns the number of registrations removed.
    pub fn off<E: Event, H: 'static>(&self, host: &Rc<H>) -> usize {
        let key = TypeId::of::<E>();
        let removed = {
            let mut buckets = self.buckets.borrow_mut();
            let Some(bucket) = buckets.get_mut(&key) else {
                return 0;
            };
            let removed = detach_host(&mut bucket.listeners, host);
            if bucket.listeners.is_empty() {
                buckets.remove(&key);
            }
            removed
        };
        trace!(event = E::name(), removed = removed.len(), "off");
        removed.len()
    }

    /// Remove every registration of `host` across all event types.
    ///
    /// Intended for the host's teardown path. Returns the number of
    /// registrations removed.
    pub fn reset<H: 'static>(&self, host: &Rc<H>) -> usize {
        let removed: Vec<Rc<Listener>> = {
            let mut buckets = self.buckets.borrow_mut();
            let mut removed = Vec::new();
            buckets.retain(|_, bucket| {
                removed.extend(detach_host(&mut bucket.listeners, host));
                !bucket.listeners.is_empty()
            });
            removed
        };
        debug!(removed = removed.len(), "reset host registrations");
        removed.len()
    }

    /// Number of stored registrations for `E`, including dead ones not yet
    /// pruned.
    #[must_use]
    pub fn listener_count<E: Event>(&self) -> usize {
        self.buckets
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, |bucket| bucket.listeners.len())
    }

    /// Number of event types with at least one stored registration.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.buckets.borrow().len()
    }

    /// Whether no registrations are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.borrow().is_empty()
    }

    /// Names of the event types with stored registrations, sorted.
    #[must_use]
    pub fn registered_events(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> =
            self.buckets.borrow().values().map(|b| b.name).collect();
        names.sort_unstable();
        names
    }
}

/// Split the listeners belonging to `host` out of `listeners`, marking them
/// inactive.
fn detach_host<H>(listeners: &mut Vec<Rc<Listener>>, host: &Rc<H>) -> Vec<Rc<Listener>> {
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(listeners)
        .into_iter()
        .partition(|listener| listener.host.points_to(host));
    *listeners = kept;
    for listener in &removed {
        listener.active.set(false);
    }
    removed
}
