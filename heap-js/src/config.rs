use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_ARENA_CAPACITY: usize = 512 * 1024 * 1024;
pub const DEFAULT_INITIAL_HANDLES: usize = 8192;
pub const DEFAULT_SHAPE_HASH_BITS: u8 = 8;

/// Heap construction parameters.
///
/// Deserializable from JSON; missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeapConfig {
  /// Size of the single arena block, in bytes.
  pub arena_capacity: usize,
  /// Handle table entries to preallocate.
  pub initial_handles: usize,
  /// Upper bound on distinct handle indices. `None` means the whole 32-bit index space.
  pub max_handles: Option<u32>,
  /// Shape interning uses `2^shape_hash_bits` buckets. Clamped to `1..=16`.
  pub shape_hash_bits: u8,
}

impl HeapConfig {
  pub fn new(arena_capacity: usize) -> Self {
    HeapConfig {
      arena_capacity,
      ..Default::default()
    }
  }

  pub fn with_initial_handles(mut self, initial_handles: usize) -> Self {
    self.initial_handles = initial_handles;
    self
  }

  pub fn with_max_handles(mut self, max_handles: u32) -> Self {
    self.max_handles = Some(max_handles);
    self
  }

  pub fn with_shape_hash_bits(mut self, bits: u8) -> Self {
    self.shape_hash_bits = bits;
    self
  }

  pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    HeapConfig {
      arena_capacity: DEFAULT_ARENA_CAPACITY,
      initial_handles: DEFAULT_INITIAL_HANDLES,
      max_handles: None,
      shape_hash_bits: DEFAULT_SHAPE_HASH_BITS,
    }
  }
}
