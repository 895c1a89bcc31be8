#![forbid(unsafe_code)]

//! Reactive properties and event dispatch for taskwire.
//!
//! This crate provides the primitives every screen of the application is
//! wired through:
//!
//! - [`ReactiveCell`]: a shared value holder that notifies subscribers with
//!   `(old, new)` on every write.
//! - [`Subscription`]: the token returned by `subscribe`, able to cancel it.
//! - [`SubscriptionRegistry`]: groups the subscriptions of one owner and
//!   releases them all when the owner is dropped.
//! - [`EventBus`]: routes typed events to handlers registered by other
//!   components.
//! - [`WeakHandle`]: the non-owning host reference all of the above rely on.
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. State lives in
//! `Rc<RefCell<..>>`, so none of the types are `Send`; confining them to one
//! thread is enforced by the compiler. Hosts are held through `Weak`
//! references and their callbacks become inert once the host is dropped.
//! Dead entries are pruned lazily: on the next publish for cells, on the next
//! emit of the same event for the bus.
//!
//! # Invariants
//!
//! 1. Subscribers and handlers are notified in registration order.
//! 2. A callback whose host is dead is never invoked.
//! 3. No internal borrow is held while user callbacks run, so callbacks may
//!    re-enter the cell or bus that invoked them.
//! 4. Unsubscribing an unknown id, emitting an event with no listeners, or
//!    resetting an unknown host are silent no-ops.

pub mod bus;
pub mod cell;
pub mod config;
pub mod registry;
pub mod weak;

pub use bus::{EmitStats, Event, EventBus};
pub use cell::{ReactiveCell, Subscription, SubscriptionId};
pub use config::{CellConfig, EventBusConfig};
pub use registry::SubscriptionRegistry;
pub use weak::WeakHandle;
