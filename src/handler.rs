use std::sync::Arc;

use parking_lot::Mutex;

use crate::sample::Sample;

/// A data-element callback registered by a consumer module.
pub type Callback<T> = Arc<dyn Fn(Sample<T>) + Send + Sync>;

/// One registered consumer of a data element.
///
/// `active` gates delivery: a handler exists from the moment it is registered, but only fires
/// while its owning module is `Operational`. The owner is recorded by name, not by a back-pointer,
/// so a Service Module can flip every handler belonging to a module without holding a reference to
/// that module's controller.
pub struct HandlerEntry<T> {
    pub owner: String,
    pub active: bool,
    callback: Callback<T>,
}

/// The registered handlers for a single data element, in registration order.
///
/// Fan-out takes a snapshot of the active entries before invoking any of them, so a handler that
/// registers another handler for the same element during its own callback does not see itself
/// invoked in the same publish, and a concurrent registration from another thread never races with
/// an in-flight fan-out.
pub struct HandlerList<T> {
    entries: Mutex<Vec<HandlerEntry<T>>>,
}

impl<T> HandlerList<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Registers `callback` for `owner`. `initially_active` should reflect whether `owner` is
    /// already an active consumer of this Service Module at registration time.
    pub fn register(&self, owner: impl Into<String>, initially_active: bool, callback: Callback<T>) {
        self.entries.lock().push(HandlerEntry {
            owner: owner.into(),
            active: initially_active,
            callback,
        });
    }

    /// Activates every handler registered by `owner`.
    pub fn start_for_owner(&self, owner: &str) {
        for entry in self.entries.lock().iter_mut() {
            if entry.owner == owner {
                entry.active = true;
            }
        }
    }

    /// Deactivates every handler registered by `owner`.
    pub fn stop_for_owner(&self, owner: &str) {
        for entry in self.entries.lock().iter_mut() {
            if entry.owner == owner {
                entry.active = false;
            }
        }
    }

    /// Invokes every active handler, in registration order, with a clone of `sample`.
    pub fn publish(&self, sample: &Sample<T>) {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.callback.clone())
            .collect();
        for callback in snapshot {
            callback(sample.clone());
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<T> Default for HandlerList<T> {
    fn default() -> Self {
        Self::new()
    }
}
