use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::heap::Heap;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use std::sync::Arc;

/// A [`Heap`] shared between threads.
///
/// The handle table and typed accessors are single-threaded; this serializes every use behind one
/// lock. Cloning shares the same heap.
#[derive(Clone)]
pub struct SharedHeap {
  inner: Arc<Mutex<Heap>>,
}

impl SharedHeap {
  pub fn new(config: HeapConfig) -> Result<SharedHeap, HeapError> {
    Ok(SharedHeap::from_heap(Heap::new(config)?))
  }

  pub fn from_heap(heap: Heap) -> SharedHeap {
    SharedHeap {
      inner: Arc::new(Mutex::new(heap)),
    }
  }

  /// Locks the heap for the lifetime of the guard.
  pub fn lock(&self) -> MutexGuard<'_, Heap> {
    self.inner.lock()
  }

  /// Runs `f` with exclusive access to the heap.
  pub fn with<T>(&self, f: impl FnOnce(&mut Heap) -> T) -> T {
    f(&mut self.inner.lock())
  }
}
