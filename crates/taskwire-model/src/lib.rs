#![forbid(unsafe_code)]

//! Task-group view models for taskwire.
//!
//! # Role in taskwire
//! `taskwire-model` is the data side of the application. Each model field is
//! a [`ReactiveCell`](taskwire_reactive::ReactiveCell) that views bind to,
//! and the command events in [`events`] are what views emit over the
//! [`EventBus`](taskwire_reactive::EventBus) when they need a controller to
//! act.
//!
//! # Primary responsibilities
//! - **TaskGroup / Subtask**: reactive fields, progress recomputation.
//! - **TaskService**: in-memory list of groups; every structural mutation.
//! - **ListChange**: row insert/delete detection from `(old, new)` lists.
//! - **Rgba**: accent colors with hex parsing.
//!
//! Persistence and image fetching are left to the embedding application.

pub mod color;
pub mod diff;
pub mod events;
pub mod service;
pub mod task;

pub use color::{ColorParseError, Rgba};
pub use diff::ListChange;
pub use service::{TaskError, TaskService};
pub use task::{Subtask, TaskGroup, TaskGroupBuilder, completion_ratio};
