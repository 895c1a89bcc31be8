#![forbid(unsafe_code)]

//! Task groups and their subtasks.
//!
//! Every user-visible field is a [`ReactiveCell`], so views bind to a group
//! or task and are pushed each change. Fields are public so that a
//! [`SubscriptionRegistry`](taskwire_reactive::SubscriptionRegistry) can
//! select them with `|group| &group.name`.

use std::fmt;
use std::rc::{Rc, Weak};

use taskwire_reactive::{CellConfig, ReactiveCell};
use ulid::Ulid;

use crate::color::Rgba;

/// Completed fraction of `tasks` in `[0, 1]`; `0` for an empty list.
#[must_use]
pub fn completion_ratio(tasks: &[Rc<Subtask>]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let done = tasks.iter().filter(|task| task.completed.get()).count();
    done as f64 / tasks.len() as f64
}

/// A single to-do item belonging to one [`TaskGroup`].
pub struct Subtask {
    id: String,
    pub name: ReactiveCell<String>,
    pub completed: ReactiveCell<bool>,
    group: Weak<TaskGroup>,
}

impl Subtask {
    /// Create an open task in `group`. The task is not added to the group's
    /// list; see [`TaskService::add_task`](crate::TaskService::add_task).
    #[must_use]
    pub fn new(name: impl Into<String>, group: &Rc<TaskGroup>) -> Rc<Self> {
        Self::restore(Ulid::new().to_string(), name, false, group)
    }

    /// Recreate a task with a known id and state.
    #[must_use]
    pub fn restore(
        id: impl Into<String>,
        name: impl Into<String>,
        completed: bool,
        group: &Rc<TaskGroup>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: id.into(),
            name: ReactiveCell::with_config(name.into(), CellConfig::labeled("Subtask.name")),
            completed: ReactiveCell::with_config(
                completed,
                CellConfig::labeled("Subtask.completed"),
            ),
            group: Rc::downgrade(group),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The owning group, unless it has already been dropped.
    #[must_use]
    pub fn group(&self) -> Option<Rc<TaskGroup>> {
        self.group.upgrade()
    }

    /// Flip the completed flag.
    pub fn toggle(&self) {
        self.completed.update(|done| *done = !*done);
    }
}

impl fmt::Debug for Subtask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subtask")
            .field("id", &self.id)
            .field("name", &self.name.get())
            .field("completed", &self.completed.get())
            .finish()
    }
}

/// A named list of tasks with an optional accent color and cover image.
pub struct TaskGroup {
    id: String,
    pub name: ReactiveCell<String>,
    /// Base64-encoded cover image; opaque to this crate.
    pub image: ReactiveCell<Option<String>>,
    pub color: ReactiveCell<Option<Rgba>>,
    pub tasks: ReactiveCell<Vec<Rc<Subtask>>>,
    /// Completed fraction of `tasks`, refreshed by [`sync`](Self::sync).
    pub progress: ReactiveCell<f64>,
}

impl TaskGroup {
    /// Create an empty group with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Self::builder(name).build()
    }

    /// Start building a group.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TaskGroupBuilder {
        TaskGroupBuilder {
            id: None,
            name: name.into(),
            image: None,
            color: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Recompute and publish `progress` from the current task list.
    pub fn sync(&self) {
        let ratio = self.tasks.with(|tasks| completion_ratio(tasks));
        self.progress.publish(ratio);
    }

    /// Number of tasks in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.with(Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `task` in the list, by identity.
    #[must_use]
    pub fn position(&self, task: &Rc<Subtask>) -> Option<usize> {
        self.tasks
            .with(|tasks| tasks.iter().position(|t| Rc::ptr_eq(t, task)))
    }
}

impl fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("id", &self.id)
            .field("name", &self.name.get())
            .field("color", &self.color.get())
            .field("tasks", &self.len())
            .field("progress", &self.progress.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`TaskGroup`].
///
/// Tasks are added after `build`, since each task needs a reference to its
/// group.
#[derive(Debug, Clone)]
pub struct TaskGroupBuilder {
    id: Option<String>,
    name: String,
    image: Option<String>,
    color: Option<Rgba>,
}

impl TaskGroupBuilder {
    /// Use a known id instead of a fresh one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: Rgba) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn build(self) -> Rc<TaskGroup> {
        Rc::new(TaskGroup {
            id: self.id.unwrap_or_else(|| Ulid::new().to_string()),
            name: ReactiveCell::with_config(self.name, CellConfig::labeled("TaskGroup.name")),
            image: ReactiveCell::with_config(self.image, CellConfig::labeled("TaskGroup.image")),
            color: ReactiveCell::with_config(self.color, CellConfig::labeled("TaskGroup.color")),
            tasks: ReactiveCell::with_config(Vec::new(), CellConfig::labeled("TaskGroup.tasks")),
            progress: ReactiveCell::with_config(0.0, CellConfig::labeled("TaskGroup.progress")),
        })
    }
}
