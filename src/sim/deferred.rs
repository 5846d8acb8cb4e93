//! Deferred structural mutation
//!
//! Adds and removals requested while a tick iterates the live set are queued
//! here and applied at end of tick, so iteration order within a tick never
//! changes underneath the code doing the iterating.

use std::collections::HashSet;

use super::state::EntityId;

/// Mutations drained at end of tick
#[derive(Debug)]
pub struct Mutations<T> {
    pub added: Vec<T>,
    /// Unique ids, in request order
    pub removed: Vec<EntityId>,
}

/// Queue of pending adds and removals
#[derive(Debug)]
pub struct DeferredQueue<T> {
    added: Vec<T>,
    removed: Vec<EntityId>,
    removed_set: HashSet<EntityId>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            removed_set: HashSet::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer_add(&mut self, entity: T) {
        self.added.push(entity);
    }

    /// Queue a removal; repeated requests for the same id collapse into one
    pub fn defer_remove(&mut self, id: EntityId) -> bool {
        if self.removed_set.insert(id) {
            self.removed.push(id);
            true
        } else {
            false
        }
    }

    pub fn is_pending_removal(&self, id: EntityId) -> bool {
        self.removed_set.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn pending_adds(&self) -> &[T] {
        &self.added
    }

    /// Take everything queued so far, leaving the queue empty
    pub fn take(&mut self) -> Mutations<T> {
        self.removed_set.clear();
        Mutations {
            added: std::mem::take(&mut self.added),
            removed: std::mem::take(&mut self.removed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removals_are_deduplicated() {
        let mut queue: DeferredQueue<u8> = DeferredQueue::new();
        assert!(queue.defer_remove(EntityId(3)));
        assert!(!queue.defer_remove(EntityId(3)));
        assert!(queue.defer_remove(EntityId(1)));
        assert!(queue.is_pending_removal(EntityId(3)));

        let mutations = queue.take();
        assert_eq!(mutations.removed, vec![EntityId(3), EntityId(1)]);
        assert!(queue.is_empty());
        assert!(!queue.is_pending_removal(EntityId(3)));
    }

    #[test]
    fn test_adds_keep_order() {
        let mut queue = DeferredQueue::new();
        queue.defer_add("a");
        queue.defer_add("b");
        assert_eq!(queue.pending_adds(), &["a", "b"]);
        assert_eq!(queue.take().added, vec!["a", "b"]);
        assert!(queue.take().added.is_empty());
    }
}
