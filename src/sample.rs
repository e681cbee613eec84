use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// A shared, immutable snapshot of the latest value published on a data element.
///
/// Publishing never mutates an existing `Sample`; it replaces the cell's handle with a fresh one.
/// A reader that cloned a `Sample` keeps a valid view of the value it read even if the producer
/// publishes again immediately afterwards.
pub type Sample<T> = Arc<T>;

/// A uniquely-owned, not-yet-published allocation returned by `Allocate_*`.
pub type DataPtr<T> = Box<T>;

/// A shared, immutable allocation returned by `GetAllocated_*`.
pub type ConstDataPtr<T> = Sample<T>;

/// The cache slot a Service Module holds for one data element.
///
/// Empty until the first publish. Guarded by a mutex so wire-backed backends (whose publishes can
/// arrive on a callback thread different from the reader's) stay correct; the lock is held only
/// for the duration of a pointer swap or clone, never across a handler invocation.
pub struct SampleCell<T> {
    current: Mutex<Option<Sample<T>>>,
}

impl<T> SampleCell<T> {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Allocates a default-constructed value for the caller to fill in before `set_allocated`.
    pub fn allocate(&self) -> DataPtr<T>
    where
        T: Default,
    {
        Box::new(T::default())
    }

    /// Publishes an owned allocation, taking over the cell's shared slot.
    pub fn set_allocated(&self, value: DataPtr<T>) {
        *self.current.lock() = Some(Arc::from(value));
    }

    /// Publishes by cloning `value` into a fresh shared allocation.
    pub fn set(&self, value: &T)
    where
        T: Clone,
    {
        *self.current.lock() = Some(Arc::new(value.clone()));
    }

    /// Returns the current snapshot, or `NoSampleAvailable` before the first publish.
    pub fn get_allocated(&self) -> Result<ConstDataPtr<T>> {
        self.current
            .lock()
            .clone()
            .ok_or_else(Error::no_sample_available)
    }

    /// Returns the current value, or a default-constructed one before the first publish.
    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        self.current
            .lock()
            .as_ref()
            .map(|arc| (**arc).clone())
            .unwrap_or_default()
    }

    pub fn has_sample(&self) -> bool {
        self.current.lock().is_some()
    }
}

impl<T> Default for SampleCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_reports_no_sample_available() {
        let cell: SampleCell<u32> = SampleCell::new();
        assert!(cell.get_allocated().is_err());
        assert_eq!(cell.get(), 0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let cell = SampleCell::new();
        cell.set(&"hello".to_string());
        assert_eq!(cell.get(), "hello");
        assert_eq!(*cell.get_allocated().unwrap(), "hello".to_string());
    }

    #[test]
    fn allocate_set_allocated_round_trips() {
        let cell: SampleCell<Vec<u8>> = SampleCell::new();
        let mut ptr = cell.allocate();
        ptr.push(1);
        ptr.push(2);
        cell.set_allocated(ptr);
        assert_eq!(*cell.get_allocated().unwrap(), vec![1, 2]);
    }

    #[test]
    fn later_publish_does_not_disturb_held_snapshot() {
        let cell = SampleCell::new();
        cell.set(&1u32);
        let held = cell.get_allocated().unwrap();
        cell.set(&2u32);
        assert_eq!(*held, 1);
        assert_eq!(cell.get(), 2);
    }
}
