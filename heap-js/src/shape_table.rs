//! Interning of property-less shapes by prototype.
//!
//! Bucket heads live in a map keyed by the top bits of the shape hash. The chain through each
//! bucket is stored in the shape records themselves (`SHAPE_HASH_NEXT`) and is only ever followed
//! with fused reads, one hop at a time.

use crate::error::HeapError;
use crate::handle::Handle;
use crate::handle::NULL_HANDLE;
use crate::heap::Heap;
use crate::record::SHAPE_HASH;
use crate::record::SHAPE_HASH_NEXT;
use crate::record::SHAPE_IS_HASHED;
use crate::record::SHAPE_PROP_COUNT;
use crate::record::SHAPE_PROTO;
use ahash::AHashMap;

/// Property capacity given to interned shapes, so objects created from them start with room for a
/// couple of properties.
pub const INITIAL_PROP_SIZE: u32 = 2;

#[inline]
fn shape_hash(h: u32, val: u32) -> u32 {
  h.wrapping_add(val).wrapping_mul(0x9e37_0001)
}

/// Hash of a shape with prototype `proto` and no properties.
pub fn shape_initial_hash(proto: Handle) -> u32 {
  let h = shape_hash(1, proto.index());
  shape_hash(h, proto.generation())
}

#[derive(Debug)]
pub(crate) struct ShapeTable {
  bits: u32,
  heads: AHashMap<u32, Handle>,
  hashed: usize,
}

impl ShapeTable {
  pub(crate) fn new(bits: u8) -> Self {
    ShapeTable {
      bits: bits.clamp(1, 16) as u32,
      heads: AHashMap::new(),
      hashed: 0,
    }
  }

  fn bucket(&self, hash: u32) -> u32 {
    hash >> (32 - self.bits)
  }

  fn head(&self, bucket: u32) -> Handle {
    self.heads.get(&bucket).copied().unwrap_or(NULL_HANDLE)
  }

  fn set_head(&mut self, bucket: u32, shape: Handle) {
    if shape.is_null() {
      self.heads.remove(&bucket);
    } else {
      self.heads.insert(bucket, shape);
    }
  }

  /// Shapes currently linked into a bucket.
  pub(crate) fn len(&self) -> usize {
    self.hashed
  }

  pub(crate) fn clear(&mut self) {
    self.heads.clear();
    self.hashed = 0;
  }
}

impl Heap {
  // A chain can't be longer than the number of live records without revisiting one.
  fn shape_chain_limit(&self) -> usize {
    self.handles.len() + 1
  }

  /// Finds the hashed, property-less shape for `proto`, if one exists.
  pub fn find_shape(&self, proto: Handle) -> Result<Option<Handle>, HeapError> {
    let hash = shape_initial_hash(proto);
    let mut current = self.shapes.head(self.shapes.bucket(hash));
    let mut steps = 0usize;
    while !current.is_null() {
      if steps >= self.shape_chain_limit() {
        return Err(HeapError::ShapeChainCorrupt);
      }
      steps += 1;

      if self.get(current, SHAPE_HASH) == hash
        && self.get(current, SHAPE_PROTO) == proto
        && self.get(current, SHAPE_PROP_COUNT) == 0
      {
        return Ok(Some(current));
      }
      current = self.get(current, SHAPE_HASH_NEXT);
    }
    Ok(None)
  }

  /// Returns the shared property-less shape for `proto`, creating and hashing it on first use.
  pub fn intern_shape(&mut self, proto: Handle) -> Result<Handle, HeapError> {
    if let Some(shape) = self.find_shape(proto)? {
      tracing::trace!(target: "heap_js::shapes", cache_hit = true, ?proto, ?shape);
      return Ok(shape);
    }
    let shape = self.alloc_shape(proto, INITIAL_PROP_SIZE)?;
    self.hash_shape(shape)?;
    tracing::trace!(target: "heap_js::shapes", cache_hit = false, ?proto, ?shape);
    Ok(shape)
  }

  /// Links `shape` at the head of its hash bucket. Already-hashed shapes are left alone.
  pub fn hash_shape(&mut self, shape: Handle) -> Result<(), HeapError> {
    if self.try_get(shape, SHAPE_IS_HASHED)? {
      return Ok(());
    }
    let bucket = self.shapes.bucket(self.try_get(shape, SHAPE_HASH)?);
    let head = self.shapes.head(bucket);
    self.set(shape, SHAPE_HASH_NEXT, head)?;
    self.set(shape, SHAPE_IS_HASHED, true)?;
    self.shapes.set_head(bucket, shape);
    self.shapes.hashed += 1;
    Ok(())
  }

  /// Unlinks `shape` from its bucket. Returns false if it was not hashed.
  pub fn unhash_shape(&mut self, shape: Handle) -> Result<bool, HeapError> {
    if !self.try_get(shape, SHAPE_IS_HASHED)? {
      return Ok(false);
    }
    let bucket = self.shapes.bucket(self.try_get(shape, SHAPE_HASH)?);
    let next = self.try_get(shape, SHAPE_HASH_NEXT)?;

    let mut prev = NULL_HANDLE;
    let mut current = self.shapes.head(bucket);
    let mut steps = 0usize;
    while current != shape {
      if current.is_null() || steps >= self.shape_chain_limit() {
        return Err(HeapError::ShapeChainCorrupt);
      }
      steps += 1;
      prev = current;
      current = self.get(current, SHAPE_HASH_NEXT);
    }

    if prev.is_null() {
      self.shapes.set_head(bucket, next);
    } else {
      self.set(prev, SHAPE_HASH_NEXT, next)?;
    }
    self.set(shape, SHAPE_HASH_NEXT, NULL_HANDLE)?;
    self.set(shape, SHAPE_IS_HASHED, false)?;
    self.shapes.hashed -= 1;
    Ok(true)
  }
}
