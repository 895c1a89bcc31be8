#![forbid(unsafe_code)]

//! Row-level change detection for list cells.
//!
//! Task lists change one row at a time: a task is appended or a task is
//! removed. Because cells publish `(old, new)`, a table view can work out
//! which row to animate without keeping its own copy of the list.

use std::rc::Rc;

/// The single-row change between two versions of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// A row was appended; the payload is its index in the new list.
    Inserted(usize),
    /// A row was removed; the payload is its index in the old list.
    Removed(usize),
    /// Same length: nothing to insert or delete.
    Unchanged,
}

impl ListChange {
    /// Compare two lists by element identity.
    ///
    /// A longer list is reported as an append at its last index. A shorter
    /// list is reported as a removal at the first position where the two
    /// lists stop sharing the same element, or at the old last index when
    /// the common prefix is intact.
    #[must_use]
    pub fn between<T>(old: &[Rc<T>], new: &[Rc<T>]) -> Self {
        use std::cmp::Ordering;

        match old.len().cmp(&new.len()) {
            Ordering::Less => Self::Inserted(new.len() - 1),
            Ordering::Greater => {
                let index = old
                    .iter()
                    .zip(new)
                    .position(|(a, b)| !Rc::ptr_eq(a, b))
                    .unwrap_or(old.len() - 1);
                Self::Removed(index)
            }
            Ordering::Equal => Self::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Rc<usize>> {
        (0..n).map(Rc::new).collect()
    }

    #[test]
    fn append_is_inserted_at_end() {
        let old = rows(2);
        let mut new = old.clone();
        new.push(Rc::new(9));
        assert_eq!(ListChange::between(&old, &new), ListChange::Inserted(2));
        assert_eq!(ListChange::between(&[], &new[..1]), ListChange::Inserted(0));
    }

    #[test]
    fn removal_in_the_middle() {
        let old = rows(4);
        let mut new = old.clone();
        new.remove(1);
        assert_eq!(ListChange::between(&old, &new), ListChange::Removed(1));
    }

    #[test]
    fn removal_of_last_row() {
        let old = rows(3);
        let new = old[..2].to_vec();
        assert_eq!(ListChange::between(&old, &new), ListChange::Removed(2));
    }

    #[test]
    fn equal_length_is_unchanged() {
        let old = rows(3);
        let new = rows(3);
        assert_eq!(ListChange::between(&old, &new), ListChange::Unchanged);
    }
}
