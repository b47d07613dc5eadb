use crate::arena::Arena;
use crate::arena::ArenaPtr;

/// The memory interface an interpreter draws all of its allocations from.
///
/// Failures are reported as `None`; nothing here aborts.
pub trait JsAllocator {
  fn allocate(&self, size: usize) -> Option<ArenaPtr>;

  /// Releases a block. Bump allocators ignore this.
  fn free(&self, ptr: ArenaPtr);

  /// Moves `ptr`'s contents into a fresh block of `new_size` bytes.
  ///
  /// `None` behaves like [`allocate`](JsAllocator::allocate). A zero `new_size` returns `None`.
  /// At most `min(ptr.len(), new_size)` bytes are copied; anything past the old length is zero.
  fn reallocate(&mut self, ptr: Option<ArenaPtr>, new_size: usize) -> Option<ArenaPtr>;

  /// Slack available past a block's requested length. Always 0 for the arena.
  fn usable_size(&self, ptr: ArenaPtr) -> usize;
}

impl JsAllocator for Arena {
  fn allocate(&self, size: usize) -> Option<ArenaPtr> {
    Arena::allocate(self, size).ok()
  }

  fn free(&self, _ptr: ArenaPtr) {}

  fn reallocate(&mut self, ptr: Option<ArenaPtr>, new_size: usize) -> Option<ArenaPtr> {
    if new_size == 0 {
      return None;
    }
    let fresh = Arena::allocate(self, new_size).ok()?;
    let Some(old) = ptr else {
      return Some(fresh);
    };
    self.bytes_mut(fresh)?.fill(0);
    // A stale `old` leaves the fresh block zeroed rather than failing the whole call.
    let copied = self.copy_within(old, fresh, new_size).unwrap_or(0);
    tracing::trace!(target: "heap_js::arena", ?old, ?fresh, copied, "reallocated");
    Some(fresh)
  }

  fn usable_size(&self, _ptr: ArenaPtr) -> usize {
    0
  }
}
