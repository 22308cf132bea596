// pharos_core/src/slot.rs

//! Single-slot sample exchange between sensor reader threads.

use std::sync::Mutex;

/// A mutex-guarded cell holding the most recent sample of a stream.
///
/// Writers replace the slot wholesale and readers clone the latest
/// value out; nothing ever partially mutates the stored sample, so a
/// plain lock is enough.
#[derive(Debug, Default)]
pub struct SampleSlot<T> {
    inner: Mutex<Option<T>>,
}

impl<T: Clone> SampleSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Replaces the stored sample.
    pub fn store(&self, value: T) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(value);
    }

    /// Clones out the most recent sample, if any has arrived yet.
    pub fn latest(&self) -> Option<T> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}
