use crate::error::AllocError;
use core::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Every block starts on, and is padded to, this boundary.
pub const ALIGNMENT: usize = 16;

/// An address inside an [`Arena`].
///
/// Carries the block's requested length and the arena epoch it was reserved in, so the arena can
/// reject pointers that outlived a [`reset`](Arena::reset) and reallocation knows how much to copy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaPtr {
  offset: usize,
  len: usize,
  epoch: u32,
}

impl ArenaPtr {
  #[inline]
  pub fn offset(self) -> usize {
    self.offset
  }

  /// The size originally requested, before alignment padding.
  #[inline]
  pub fn len(self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(self) -> bool {
    self.len == 0
  }

  #[inline]
  pub fn epoch(self) -> u32 {
    self.epoch
  }

  /// The byte range this block occupies, including padding.
  pub fn reserved_range(self) -> core::ops::Range<usize> {
    self.offset..self.offset + align_up(self.len).unwrap_or(self.len)
  }
}

impl fmt::Debug for ArenaPtr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ArenaPtr({:#x}+{}@{})", self.offset, self.len, self.epoch)
  }
}

#[inline]
pub(crate) fn align_up(size: usize) -> Option<usize> {
  Some(size.checked_add(ALIGNMENT - 1)? & !(ALIGNMENT - 1))
}

/// A fixed-size bump allocator.
///
/// Reservation is lock-free: [`allocate`](Arena::allocate) takes `&self` and advances a single
/// atomic offset, so any number of threads may reserve blocks concurrently. Reading and writing
/// block contents goes through [`bytes`](Arena::bytes) / [`bytes_mut`](Arena::bytes_mut), and
/// rewinding requires `&mut self`, which rules out a reset racing with live reservations.
///
/// Nothing is ever freed individually. A failed reservation still advances the offset; that space
/// stays lost until the next reset.
pub struct Arena {
  buffer: Vec<u8>,
  capacity: usize,
  offset: AtomicUsize,
  epoch: u32,
  initialized: bool,
}

impl Arena {
  /// Reserves a zeroed block of `capacity` bytes.
  ///
  /// Fails without leaving any partial state if the reservation is refused.
  pub fn new(capacity: usize) -> Result<Arena, AllocError> {
    if capacity == 0 {
      return Err(AllocError::ReservationFailed { capacity });
    }
    let mut buffer = Vec::new();
    buffer
      .try_reserve_exact(capacity)
      .map_err(|_| AllocError::ReservationFailed { capacity })?;
    buffer.resize(capacity, 0);

    tracing::info!(capacity, "arena initialized");
    Ok(Arena {
      buffer,
      capacity,
      offset: AtomicUsize::new(0),
      epoch: 0,
      initialized: true,
    })
  }

  /// Reserves `size` bytes, rounded up to [`ALIGNMENT`].
  pub fn allocate(&self, size: usize) -> Result<ArenaPtr, AllocError> {
    if !self.initialized {
      return Err(AllocError::Uninitialized);
    }
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }
    let aligned = match align_up(size) {
      // Requests that can never fit are rejected before touching the offset, which keeps the
      // counter far away from wrapping.
      Some(aligned) if aligned <= self.capacity => aligned,
      _ => {
        return Err(AllocError::Exhausted {
          requested: size,
          offset: self.offset.load(Ordering::Relaxed),
          capacity: self.capacity,
        })
      }
    };

    let start = self.offset.fetch_add(aligned, Ordering::Relaxed);
    let end = start.saturating_add(aligned);
    if end > self.capacity {
      tracing::warn!(
        requested = size,
        offset = start,
        capacity = self.capacity,
        "arena exhausted"
      );
      return Err(AllocError::Exhausted {
        requested: size,
        offset: start,
        capacity: self.capacity,
      });
    }

    Ok(ArenaPtr {
      offset: start,
      len: size,
      epoch: self.epoch,
    })
  }

  /// Rewinds the arena in O(1).
  ///
  /// Every [`ArenaPtr`] handed out before the reset is rejected by byte access afterwards.
  pub fn reset(&mut self) {
    let used = self.used().min(self.capacity);
    *self.offset.get_mut() = 0;
    self.epoch = self.epoch.wrapping_add(1);
    tracing::info!(freed = used, epoch = self.epoch, "arena reset");
  }

  /// Releases the backing buffer. Later allocations fail with [`AllocError::Uninitialized`].
  pub fn teardown(&mut self) {
    if !self.initialized {
      return;
    }
    self.buffer = Vec::new();
    self.capacity = 0;
    *self.offset.get_mut() = 0;
    self.epoch = self.epoch.wrapping_add(1);
    self.initialized = false;
    tracing::info!("arena torn down");
  }

  fn check(&self, ptr: ArenaPtr) -> Option<core::ops::Range<usize>> {
    if !self.initialized || ptr.epoch != self.epoch {
      return None;
    }
    let end = ptr.offset.checked_add(ptr.len)?;
    (end <= self.buffer.len()).then_some(ptr.offset..end)
  }

  /// The block's contents, or `None` if `ptr` predates the last reset or lies outside the arena.
  pub fn bytes(&self, ptr: ArenaPtr) -> Option<&[u8]> {
    let range = self.check(ptr)?;
    Some(&self.buffer[range])
  }

  pub fn bytes_mut(&mut self, ptr: ArenaPtr) -> Option<&mut [u8]> {
    let range = self.check(ptr)?;
    Some(&mut self.buffer[range])
  }

  /// Copies the first `len` bytes of `from` to the start of `to`.
  ///
  /// `len` is clamped to both block lengths, and the number of bytes copied is returned.
  pub fn copy_within(&mut self, from: ArenaPtr, to: ArenaPtr, len: usize) -> Option<usize> {
    let src = self.check(from)?;
    let dst = self.check(to)?;
    let len = len.min(src.len()).min(dst.len());
    self
      .buffer
      .copy_within(src.start..src.start + len, dst.start);
    Some(len)
  }

  /// Bytes consumed by the bump offset. May exceed [`capacity`](Arena::capacity) after failed
  /// reservations.
  pub fn used(&self) -> usize {
    self.offset.load(Ordering::Relaxed)
  }

  pub fn available(&self) -> usize {
    self.capacity.saturating_sub(self.used())
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// How many times the arena has been reset (or torn down).
  pub fn epoch(&self) -> u32 {
    self.epoch
  }

  pub fn is_initialized(&self) -> bool {
    self.initialized
  }
}

impl fmt::Debug for Arena {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Arena")
      .field("capacity", &self.capacity)
      .field("used", &self.used())
      .field("epoch", &self.epoch)
      .field("initialized", &self.initialized)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sizes_round_up_to_alignment() {
    assert_eq!(align_up(1), Some(16));
    assert_eq!(align_up(16), Some(16));
    assert_eq!(align_up(17), Some(32));
    assert_eq!(align_up(usize::MAX), None);
  }

  #[test]
  fn oversized_request_does_not_move_offset() {
    let arena = Arena::new(64).unwrap();
    assert!(matches!(
      arena.allocate(65),
      Err(AllocError::Exhausted { requested: 65, .. })
    ));
    assert_eq!(arena.used(), 0);
  }
}
