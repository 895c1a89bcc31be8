#![forbid(unsafe_code)]

//! Commands exchanged between views and controllers over the event bus.
//!
//! Views emit these when the user asks for something they cannot do alone
//! (navigate, present a picker, confirm a deletion). Controllers register for
//! them and perform the action.

use std::rc::Rc;

use taskwire_reactive::Event;

use crate::task::{Subtask, TaskGroup};

/// Payload of events that act on a whole group.
#[derive(Debug, Clone)]
pub struct GroupPayload {
    pub group: Rc<TaskGroup>,
}

/// Payload of events that act on one task.
#[derive(Debug, Clone)]
pub struct TaskPayload {
    pub task: Rc<Subtask>,
}

macro_rules! command_event {
    ($(#[$meta:meta])* $name:ident, unit) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Event for $name {
            type Payload = ();

            fn payload(&self) -> &() {
                &()
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, group) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub payload: GroupPayload,
        }

        impl $name {
            #[must_use]
            pub fn new(group: &Rc<TaskGroup>) -> Self {
                Self {
                    payload: GroupPayload {
                        group: Rc::clone(group),
                    },
                }
            }
        }

        impl Event for $name {
            type Payload = GroupPayload;

            fn payload(&self) -> &GroupPayload {
                &self.payload
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, task) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub payload: TaskPayload,
        }

        impl $name {
            #[must_use]
            pub fn new(task: &Rc<Subtask>) -> Self {
                Self {
                    payload: TaskPayload {
                        task: Rc::clone(task),
                    },
                }
            }
        }

        impl Event for $name {
            type Payload = TaskPayload;

            fn payload(&self) -> &TaskPayload {
                &self.payload
            }
        }
    };
}

command_event!(
    /// Navigate to the new-task screen.
    PushToNewTaskScreen,
    unit
);
command_event!(
    /// Let the user pick the group's accent color.
    PresentColorPicker,
    group
);
command_event!(
    /// Replace the group's cover image with a freshly fetched one.
    FetchRandomImage,
    group
);
command_event!(
    /// Ask the user for a name and append a task to the group.
    CreateNewTask,
    group
);
command_event!(
    /// Ask the user for a new name for the task.
    EditTaskName,
    task
);
command_event!(
    /// Remove the task from its group.
    DeleteTask,
    task
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use taskwire_reactive::EventBus;

    #[test]
    fn payloads_reach_handlers() {
        let bus = EventBus::new();
        let group = TaskGroup::new("Inbox");
        let task = Subtask::new("milk", &group);
        let seen = Rc::new(RefCell::new(Vec::new()));

        bus.on::<CreateNewTask, _, _>(&seen, |log: &RefCell<Vec<String>>, p| {
            log.borrow_mut().push(format!("create in {}", p.group.name.get()));
        });
        bus.on::<DeleteTask, _, _>(&seen, |log: &RefCell<Vec<String>>, p| {
            log.borrow_mut().push(format!("delete {}", p.task.name.get()));
        });
        bus.on::<PushToNewTaskScreen, _, _>(&seen, |log: &RefCell<Vec<String>>, _| {
            log.borrow_mut().push("push".to_string());
        });

        bus.emit(&CreateNewTask::new(&group));
        bus.emit(&DeleteTask::new(&task));
        bus.emit(&PushToNewTaskScreen);
        assert_eq!(*seen.borrow(), vec!["create in Inbox", "delete milk", "push"]);
    }

    #[test]
    fn events_with_same_payload_stay_separate() {
        let bus = EventBus::new();
        let group = TaskGroup::new("Inbox");
        let seen = Rc::new(RefCell::new(Vec::<&'static str>::new()));
        bus.on::<PresentColorPicker, _, _>(&seen, |log: &RefCell<Vec<&'static str>>, _| {
            log.borrow_mut().push("picker");
        });

        bus.emit(&FetchRandomImage::new(&group));
        assert!(seen.borrow().is_empty());
        bus.emit(&PresentColorPicker::new(&group));
        assert_eq!(*seen.borrow(), vec!["picker"]);
    }

    #[test]
    fn event_names_are_type_names() {
        assert!(EditTaskName::name().ends_with("EditTaskName"));
        assert!(PushToNewTaskScreen::name().ends_with("PushToNewTaskScreen"));
    }
}
