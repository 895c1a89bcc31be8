#![forbid(unsafe_code)]

//! In-memory task service.
//!
//! The service owns the list of groups and performs every structural
//! mutation, so progress is always re-synced after a task is added, removed,
//! or toggled. Views never mutate lists directly; they emit commands and a
//! controller calls into the service.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Empty name | Blank input for a new or renamed task | `TaskError::EmptyName` |
//! | Detached task | The task's group has been dropped | `TaskError::DetachedTask` |
//! | Unknown task/group | Not in the list | `remove_*` returns `None` |

use std::fmt;
use std::rc::Rc;

use taskwire_reactive::{CellConfig, ReactiveCell};
use tracing::debug;

use crate::task::{Subtask, TaskGroup};

/// Errors from task service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A task name was empty after trimming.
    EmptyName,
    /// The task's group no longer exists.
    DetachedTask { task_id: String },
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "task name must not be empty"),
            Self::DetachedTask { task_id } => {
                write!(f, "task '{task_id}' does not belong to a live group")
            }
        }
    }
}

impl std::error::Error for TaskError {}

fn validate_name(name: &str) -> Result<String, TaskError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn owning_group(task: &Subtask) -> Result<Rc<TaskGroup>, TaskError> {
    task.group().ok_or_else(|| TaskError::DetachedTask {
        task_id: task.id().to_string(),
    })
}

/// Owns all task groups and applies mutations to them.
pub struct TaskService {
    pub groups: ReactiveCell<Vec<Rc<TaskGroup>>>,
}

impl Default for TaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService")
            .field("groups", &self.groups.with(Vec::len))
            .finish()
    }
}

impl TaskService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: ReactiveCell::with_config(
                Vec::new(),
                CellConfig::labeled("TaskService.groups"),
            ),
        }
    }

    /// Append a group.
    pub fn add_group(&self, group: Rc<TaskGroup>) {
        debug!(group = group.id(), "add group");
        self.groups.update(|groups| groups.push(group));
    }

    /// Remove a group by identity, returning the index it occupied.
    pub fn remove_group(&self, group: &Rc<TaskGroup>) -> Option<usize> {
        let index = self
            .groups
            .with(|groups| groups.iter().position(|g| Rc::ptr_eq(g, group)))?;
        self.groups.update(|groups| {
            groups.remove(index);
        });
        debug!(group = group.id(), index, "remove group");
        Some(index)
    }

    /// Validate `name` and append a new open task to `group`.
    pub fn create_task(&self, group: &Rc<TaskGroup>, name: &str) -> Result<Rc<Subtask>, TaskError> {
        let name = validate_name(name)?;
        let task = Subtask::new(name, group);
        self.add_task(Rc::clone(&task))?;
        Ok(task)
    }

    /// Append `task` to its own group and re-sync progress.
    pub fn add_task(&self, task: Rc<Subtask>) -> Result<(), TaskError> {
        let group = owning_group(&task)?;
        debug!(group = group.id(), task = task.id(), "add task");
        group.tasks.update(|tasks| tasks.push(task));
        group.sync();
        Ok(())
    }

    /// Remove `task` from its group, returning the index it occupied.
    ///
    /// Returns `None` if the group is gone or the task is not in it.
    pub fn remove_task(&self, task: &Rc<Subtask>) -> Option<usize> {
        let group = task.group()?;
        let index = group.position(task)?;
        group.tasks.update(|tasks| {
            tasks.remove(index);
        });
        group.sync();
        debug!(group = group.id(), task = task.id(), index, "remove task");
        Some(index)
    }

    /// Toggle the task's completed flag and re-sync its group's progress.
    pub fn complete(&self, task: &Subtask) -> Result<(), TaskError> {
        let group = owning_group(task)?;
        task.toggle();
        group.sync();
        Ok(())
    }

    /// Validate and publish a new name for `task`.
    pub fn rename_task(&self, task: &Subtask, name: &str) -> Result<(), TaskError> {
        let name = validate_name(name)?;
        task.name.publish(name);
        Ok(())
    }

    /// Look up a group by id.
    #[must_use]
    pub fn group(&self, id: &str) -> Option<Rc<TaskGroup>> {
        self.groups
            .with(|groups| groups.iter().find(|g| g.id() == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ListChange;
    use std::cell::RefCell;
    use tracing_test::traced_test;

    #[test]
    fn add_and_remove_groups() {
        let service = TaskService::new();
        let a = TaskGroup::new("a");
        let b = TaskGroup::new("b");
        service.add_group(Rc::clone(&a));
        service.add_group(Rc::clone(&b));

        assert_eq!(service.remove_group(&a), Some(0));
        assert_eq!(service.remove_group(&a), None);
        assert!(service.group(b.id()).is_some());
        assert!(service.group(a.id()).is_none());
    }

    #[test]
    fn create_task_validates_name() {
        let service = TaskService::new();
        let group = TaskGroup::new("Inbox");
        assert_eq!(service.create_task(&group, "   ").err(), Some(TaskError::EmptyName));

        let task = service.create_task(&group, "  milk ").expect("valid name");
        assert_eq!(task.name.get(), "milk");
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn add_task_to_dropped_group_fails() {
        let service = TaskService::new();
        let group = TaskGroup::new("gone");
        let task = Subtask::new("orphan", &group);
        drop(group);

        let err = service.add_task(Rc::clone(&task)).expect_err("detached");
        assert_eq!(
            err,
            TaskError::DetachedTask {
                task_id: task.id().to_string()
            }
        );
        assert!(err.to_string().contains(task.id()));
        assert_eq!(service.remove_task(&task), None);
    }

    #[test]
    fn complete_resyncs_progress() {
        let service = TaskService::new();
        let group = TaskGroup::new("Inbox");
        let a = service.create_task(&group, "a").expect("task");
        service.create_task(&group, "b").expect("task");
        assert_eq!(group.progress.get(), 0.0);

        service.complete(&a).expect("attached");
        assert_eq!(group.progress.get(), 0.5);
        service.complete(&a).expect("attached");
        assert_eq!(group.progress.get(), 0.0);
    }

    #[test]
    fn remove_task_publishes_diffable_change() {
        let service = TaskService::new();
        let group = TaskGroup::new("Inbox");
        let first = service.create_task(&group, "first").expect("task");
        let second = service.create_task(&group, "second").expect("task");
        service.create_task(&group, "third").expect("task");

        let changes = Rc::new(RefCell::new(Vec::new()));
        group.tasks.subscribe(&changes, false, |log: &RefCell<Vec<ListChange>>, old, new| {
            log.borrow_mut().push(ListChange::between(old, new));
        });

        assert_eq!(service.remove_task(&second), Some(1));
        service.create_task(&group, "fourth").expect("task");
        assert_eq!(service.remove_task(&first), Some(0));
        assert_eq!(
            *changes.borrow(),
            vec![
                ListChange::Removed(1),
                ListChange::Inserted(2),
                ListChange::Removed(0)
            ]
        );
    }

    #[test]
    fn rename_rejects_blank() {
        let service = TaskService::new();
        let group = TaskGroup::new("Inbox");
        let task = service.create_task(&group, "old").expect("task");
        assert_eq!(service.rename_task(&task, ""), Err(TaskError::EmptyName));
        service.rename_task(&task, "new").expect("valid");
        assert_eq!(task.name.get(), "new");
    }

    #[traced_test]
    #[test]
    fn mutations_are_logged() {
        let service = TaskService::new();
        let group = TaskGroup::new("Inbox");
        service.add_group(Rc::clone(&group));
        let task = service.create_task(&group, "milk").expect("task");
        assert_eq!(service.remove_task(&task), Some(0));

        assert!(logs_contain("add group"));
        assert!(logs_contain("add task"));
        assert!(logs_contain("remove task"));
        assert!(logs_contain(task.id()));
    }

    #[traced_test]
    #[test]
    fn rejected_mutation_is_not_logged() {
        let service = TaskService::new();
        let group = TaskGroup::new("Inbox");
        assert!(service.create_task(&group, "").is_err());
        assert!(!logs_contain("add task"));
    }
}
