//! Listener registry keyed by listener identity.
//!
//! # Invariants
//! - Every subscription gets a fresh `ListenerId`; ids are never reused.
//! - Notification iterates a snapshot, so listeners may subscribe or
//!   unsubscribe (themselves included) while being notified.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identity of one subscription, used to unsubscribe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Ordered set of listeners of one callback shape.
pub struct Listeners<F: ?Sized> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(ListenerId, Rc<F>)>>,
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(1),
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> Listeners<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Rc<F>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Clones the current listeners so callers can invoke them without
    /// holding a borrow on the registry.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }
}
