use crate::record::RecordKind;

/// Failures reported by the [`Arena`](crate::Arena).
///
/// None of these are fatal: the arena stays usable (or, for `Uninitialized`, stays torn down) and
/// callers decide what to surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  /// A zero-byte request. The arena never hands out empty blocks.
  #[error("zero-size allocation")]
  ZeroSize,

  /// The bump offset moved past capacity. The space between `offset` and `capacity` is lost until
  /// the next reset.
  #[error("arena exhausted: requested {requested} bytes at offset {offset} of {capacity}")]
  Exhausted {
    requested: usize,
    offset: usize,
    capacity: usize,
  },

  /// The arena was torn down (or never initialized).
  #[error("arena is not initialized")]
  Uninitialized,

  /// The backing buffer could not be reserved.
  #[error("failed to reserve {capacity} bytes for arena")]
  ReservationFailed { capacity: usize },
}

/// Errors produced by the heap, its handle table and the typed access layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
  /// The arena could not satisfy an allocation.
  #[error("out of memory: {0}")]
  OutOfMemory(#[from] AllocError),

  /// Every handle index is in use.
  #[error("handle table full")]
  HandleTableFull,

  /// A handle was `NULL_HANDLE`, invalidated, from before a reset, or otherwise malformed.
  #[error("invalid handle")]
  InvalidHandle,

  /// A field of one record kind was accessed through a handle naming another kind.
  #[error("record kind mismatch: expected {expected:?}, found {found:?}")]
  KindMismatch {
    expected: RecordKind,
    found: RecordKind,
  },

  /// A slot or element index past the end of its storage.
  #[error("index {index} out of bounds for length {len}")]
  IndexOutOfBounds { index: u32, len: u32 },

  /// A prototype chain walk hit [`MAX_PROTO_CHAIN_DEPTH`](crate::MAX_PROTO_CHAIN_DEPTH).
  #[error("prototype chain too deep")]
  PrototypeChainTooDeep,

  /// The record is pinned and may not be moved.
  #[error("record is pinned")]
  Pinned,

  /// A [`RootId`](crate::RootId) that was never issued or has been removed.
  #[error("unknown root")]
  InvalidRoot,

  /// A shape hash bucket chain is longer than the number of live records, so it must loop.
  #[error("shape hash chain is corrupt")]
  ShapeChainCorrupt,
}
