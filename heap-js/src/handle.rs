use core::fmt;

/// Names a heap record independently of where the record currently sits in the arena.
///
/// The low 32 bits pick a [`HandleTable`](crate::HandleTable) entry and the high 32 bits record
/// that entry's generation at issue time. Invalidating a record, or resetting the heap, advances
/// the generation before the entry can be handed out again, so a handle kept past either never
/// names a newer record. Entry 0 is never issued; its handle is [`NULL_HANDLE`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(pub(crate) u64);

/// "No object". Never issued by a handle table and never resolves.
pub const NULL_HANDLE: Handle = Handle(0);

impl Handle {
  pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
    Handle((u64::from(generation) << 32) | u64::from(index))
  }

  /// Rebuilds a handle from [`to_raw`](Handle::to_raw), e.g. after a trip through host code.
  #[inline]
  pub fn from_raw(raw: u64) -> Self {
    Self(raw)
  }

  #[inline]
  pub fn to_raw(self) -> u64 {
    self.0
  }

  #[inline]
  pub fn index(self) -> u32 {
    self.0 as u32
  }

  #[inline]
  pub fn generation(self) -> u32 {
    (self.0 >> 32) as u32
  }

  #[inline]
  pub fn is_null(self) -> bool {
    self.index() == 0
  }
}

impl fmt::Debug for Handle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_null() {
      return f.write_str("NULL_HANDLE");
    }
    f.debug_struct("Handle")
      .field("index", &self.index())
      .field("generation", &self.generation())
      .finish()
  }
}
