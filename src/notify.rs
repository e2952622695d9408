//! Listener lists shared by the drawing and settings stores.
//!
//! Notification takes `&mut self`, so the listener set cannot change while a
//! pass is running: every listener registered when the pass starts is called
//! exactly once, in subscription order.

#[cfg(test)]
#[path = "notify_test.rs"]
mod notify_test;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Ordered set of listeners receiving `&E`.
pub struct Listeners<E: ?Sized> {
    entries: Vec<(SubscriptionId, Listener<E>)>,
    next_id: u64,
}

impl<E: ?Sized> Listeners<E> {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new(), next_id: 0 }
    }

    /// Register a listener at the end of the notification order.
    pub fn add(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Call every listener once, in subscription order.
    pub fn notify(&mut self, event: &E) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }

    /// Drop every listener.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: ?Sized> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
