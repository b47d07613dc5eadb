use serde::Serialize;

/// Live records per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
  pub objects: usize,
  pub shapes: usize,
  pub property_arrays: usize,
  pub element_arrays: usize,
}

/// A point-in-time snapshot of heap usage, as returned by [`Heap::stats`](crate::Heap::stats).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeapStats {
  pub arena_capacity: usize,
  /// Bump offset. Can exceed `arena_capacity` after failed reservations.
  pub arena_used: usize,
  pub arena_available: usize,
  pub arena_epoch: u32,
  pub live_handles: usize,
  pub free_handles: usize,
  pub handle_capacity: usize,
  pub hashed_shapes: usize,
  /// Occupied root slots.
  pub roots: usize,
  /// Live records that are pinned.
  pub pinned: usize,
  pub records: RecordCounts,
}
