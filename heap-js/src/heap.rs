use crate::allocator::JsAllocator;
use crate::arena::Arena;
use crate::arena::ArenaPtr;
use crate::config::HeapConfig;
use crate::diagnostics;
use crate::error::AllocError;
use crate::error::HeapError;
use crate::handle::Handle;
use crate::handle::NULL_HANDLE;
use crate::handle_table::HandleTable;
use crate::property::PropertySlot;
use crate::record::Field;
use crate::record::FieldValue;
use crate::record::ObjectRecord;
use crate::record::Record;
use crate::record::RecordKind;
use crate::record::ShapeRecord;
use crate::record::OBJECT_ARRAY_COUNT;
use crate::record::OBJECT_ARRAY_VALUES;
use crate::record::OBJECT_CLASS_ID;
use crate::record::OBJECT_EXTENSIBLE;
use crate::record::OBJECT_FAST_ARRAY;
use crate::record::OBJECT_PROPS;
use crate::record::OBJECT_SHAPE;
use crate::record::SHAPE_HASH;
use crate::record::SHAPE_IS_HASHED;
use crate::record::SHAPE_PROP_SIZE;
use crate::record::SHAPE_PROTO;
use crate::roots::RootSet;
use crate::shape_table::shape_initial_hash;
use crate::shape_table::ShapeTable;
use crate::stats::HeapStats;
use crate::stats::RecordCounts;
use crate::value::Value;

/// Elements reserved the first time a dense array is pushed to.
const INITIAL_ELEMENT_CAPACITY: u32 = 4;

/// What the heap's handle table stores: where a record lives and what it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordRef {
  pub ptr: ArenaPtr,
  pub kind: RecordKind,
  /// Set by [`Heap::pin`]. Evacuation refuses pinned records.
  pub pinned: bool,
}

/// One interpreter session's memory: an arena, the handle table naming records inside it, and the
/// shape interning buckets.
///
/// Records are only ever reached through [`Handle`]s. Field access is fused with resolution (see
/// [`Heap::get`] / [`Heap::set`]), and the raw-bytes escape hatch
/// ([`Heap::handle_deref`]) lends the record to a closure instead of returning it, so no resolved
/// address can outlive an operation that allocates or relocates.
pub struct Heap {
  config: HeapConfig,
  arena: Arena,
  pub(crate) handles: HandleTable<RecordRef>,
  pub(crate) shapes: ShapeTable,
  pub(crate) roots: RootSet,
}

impl Heap {
  /// Initializes the arena, then the handle table.
  pub fn new(config: HeapConfig) -> Result<Heap, HeapError> {
    let arena = Arena::new(config.arena_capacity)?;
    let handles = HandleTable::with_capacity(config.initial_handles, config.max_handles);
    let shapes = ShapeTable::new(config.shape_hash_bits);
    Ok(Heap {
      config,
      arena,
      handles,
      shapes,
      roots: RootSet::default(),
    })
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn arena(&self) -> &Arena {
    &self.arena
  }

  /// The kind of record `handle` names, if it is live.
  pub fn kind(&self, handle: Handle) -> Option<RecordKind> {
    Some(self.handles.resolve(handle)?.kind)
  }

  pub fn is_live(&self, handle: Handle) -> bool {
    self.handles.is_live(handle)
  }

  fn alloc_record(&mut self, kind: RecordKind, size: usize) -> Result<Handle, HeapError> {
    let ptr = self.arena.allocate(size)?;
    // After a reset the arena hands back dirty memory.
    if let Some(bytes) = self.arena.bytes_mut(ptr) {
      bytes.fill(0);
    }
    let handle = self.handles.register(RecordRef {
      ptr,
      kind,
      pinned: false,
    })?;
    tracing::trace!(target: "heap_js::alloc", ?kind, size, ?handle, "allocated record");
    Ok(handle)
  }

  /// Allocates an object with the given shape.
  ///
  /// The object starts extensible. If the shape reserves property space, a property slot array of
  /// that capacity is allocated and attached. On failure no new handle stays live.
  pub fn alloc_object(&mut self, shape: Handle, class_id: u16) -> Result<Handle, HeapError> {
    let prop_size = if shape.is_null() {
      0
    } else {
      self.try_get(shape, SHAPE_PROP_SIZE)?
    };

    let obj = self.alloc_record(RecordKind::Object, ObjectRecord::SIZE)?;
    let props = if prop_size > 0 {
      match self.alloc_property_array(prop_size) {
        Ok(props) => props,
        Err(err) => {
          self.handles.invalidate(obj);
          return Err(err);
        }
      }
    } else {
      NULL_HANDLE
    };
    self.set(obj, OBJECT_SHAPE, shape)?;
    self.set(obj, OBJECT_PROPS, props)?;
    self.set(obj, OBJECT_CLASS_ID, class_id)?;
    self.set(obj, OBJECT_EXTENSIBLE, true)?;
    Ok(obj)
  }

  /// Allocates an unhashed shape. Use [`Heap::intern_shape`] to share shapes by prototype.
  pub fn alloc_shape(&mut self, proto: Handle, prop_size: u32) -> Result<Handle, HeapError> {
    let shape = self.alloc_record(RecordKind::Shape, ShapeRecord::SIZE)?;
    self.set(shape, SHAPE_PROTO, proto)?;
    self.set(shape, SHAPE_HASH, shape_initial_hash(proto))?;
    self.set(shape, SHAPE_PROP_SIZE, prop_size)?;
    Ok(shape)
  }

  pub fn alloc_property_array(&mut self, capacity: u32) -> Result<Handle, HeapError> {
    self.alloc_record(
      RecordKind::PropertyArray,
      capacity as usize * PropertySlot::SIZE,
    )
  }

  pub fn alloc_element_array(&mut self, capacity: u32) -> Result<Handle, HeapError> {
    self.alloc_record(RecordKind::ElementArray, capacity as usize * Value::SIZE)
  }

  /// Lends the raw bytes of `handle`'s record to `f`.
  ///
  /// For callers that have not moved to the typed accessors yet. `None` if the handle does not
  /// resolve.
  pub fn handle_deref<T>(&self, handle: Handle, f: impl FnOnce(&[u8]) -> T) -> Option<T> {
    let rec = self.handles.resolve(handle)?;
    Some(f(self.arena.bytes(rec.ptr)?))
  }

  pub fn handle_deref_mut<T>(
    &mut self,
    handle: Handle,
    f: impl FnOnce(&mut [u8]) -> T,
  ) -> Option<T> {
    let rec = self.handles.resolve(handle)?;
    Some(f(self.arena.bytes_mut(rec.ptr)?))
  }

  #[cfg_attr(debug_assertions, track_caller)]
  fn resolve_kind(&self, handle: Handle, expected: RecordKind) -> Result<ArenaPtr, HeapError> {
    let Some(rec) = self.handles.resolve(handle) else {
      diagnostics::unresolved(handle, expected);
      return Err(HeapError::InvalidHandle);
    };
    if rec.kind != expected {
      diagnostics::kind_mismatch(handle, expected, rec.kind);
      return Err(HeapError::KindMismatch {
        expected,
        found: rec.kind,
      });
    }
    Ok(rec.ptr)
  }

  #[cfg_attr(debug_assertions, track_caller)]
  fn record(&self, handle: Handle, expected: RecordKind) -> Result<&[u8], HeapError> {
    let ptr = self.resolve_kind(handle, expected)?;
    self.arena.bytes(ptr).ok_or(HeapError::InvalidHandle)
  }

  #[cfg_attr(debug_assertions, track_caller)]
  fn record_mut(&mut self, handle: Handle, expected: RecordKind) -> Result<&mut [u8], HeapError> {
    let ptr = self.resolve_kind(handle, expected)?;
    self.arena.bytes_mut(ptr).ok_or(HeapError::InvalidHandle)
  }

  /// Reads `field` of the record named by `handle`, or the field type's
  /// [`SENTINEL`](FieldValue::SENTINEL) if the handle is null, stale, or names another kind.
  #[cfg_attr(debug_assertions, track_caller)]
  #[inline]
  pub fn get<R: Record, T: FieldValue>(&self, handle: Handle, field: Field<R, T>) -> T {
    match self.record(handle, R::KIND) {
      Ok(bytes) => field.read(bytes),
      Err(_) => T::SENTINEL,
    }
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn try_get<R: Record, T: FieldValue>(
    &self,
    handle: Handle,
    field: Field<R, T>,
  ) -> Result<T, HeapError> {
    Ok(field.read(self.record(handle, R::KIND)?))
  }

  #[cfg_attr(debug_assertions, track_caller)]
  #[inline]
  pub fn set<R: Record, T: FieldValue>(
    &mut self,
    handle: Handle,
    field: Field<R, T>,
    value: T,
  ) -> Result<(), HeapError> {
    field.write(self.record_mut(handle, R::KIND)?, value);
    Ok(())
  }

  /// The prototype of `obj`, read through its shape. `NULL_HANDLE` if either does not resolve.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn object_prototype(&self, obj: Handle) -> Handle {
    let shape = self.get(obj, OBJECT_SHAPE);
    if shape.is_null() {
      return NULL_HANDLE;
    }
    self.get(shape, SHAPE_PROTO)
  }

  // Property slots.

  /// Number of slots in a property slot array. 0 if `storage` does not resolve.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn slot_capacity(&self, storage: Handle) -> u32 {
    match self.record(storage, RecordKind::PropertyArray) {
      Ok(bytes) => (bytes.len() / PropertySlot::SIZE) as u32,
      Err(_) => 0,
    }
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn try_slot(&self, storage: Handle, index: u32) -> Result<PropertySlot, HeapError> {
    let bytes = self.record(storage, RecordKind::PropertyArray)?;
    let at = slot_range(bytes.len(), index)?;
    Ok(PropertySlot::decode(&bytes[at]))
  }

  /// The slot at `index`, or [`PropertySlot::EMPTY`] if it cannot be reached.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn slot(&self, storage: Handle, index: u32) -> PropertySlot {
    self.try_slot(storage, index).unwrap_or(PropertySlot::EMPTY)
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn set_slot(
    &mut self,
    storage: Handle,
    index: u32,
    slot: impl Into<PropertySlot>,
  ) -> Result<(), HeapError> {
    let slot: PropertySlot = slot.into();
    let bytes = self.record_mut(storage, RecordKind::PropertyArray)?;
    let at = slot_range(bytes.len(), index)?;
    slot.encode(&mut bytes[at]);
    Ok(())
  }

  /// The data value in a slot. `Undefined` for accessor and variable-reference slots too.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn slot_value(&self, storage: Handle, index: u32) -> Value {
    self.slot(storage, index).value().unwrap_or_default()
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn set_slot_value(
    &mut self,
    storage: Handle,
    index: u32,
    value: Value,
  ) -> Result<(), HeapError> {
    self.set_slot(storage, index, PropertySlot::Value(value))
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn slot_getter(&self, storage: Handle, index: u32) -> Handle {
    self.slot(storage, index).getter()
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn slot_setter(&self, storage: Handle, index: u32) -> Handle {
    self.slot(storage, index).setter()
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn slot_var_ref(&self, storage: Handle, index: u32) -> Handle {
    self.slot(storage, index).var_ref()
  }

  /// Replaces the getter of an accessor slot, turning the slot into an accessor if it was not one.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn set_slot_getter(
    &mut self,
    storage: Handle,
    index: u32,
    getter: Handle,
  ) -> Result<(), HeapError> {
    let setter = self.try_slot(storage, index)?.setter();
    self.set_slot(storage, index, PropertySlot::Accessor { getter, setter })
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn set_slot_setter(
    &mut self,
    storage: Handle,
    index: u32,
    setter: Handle,
  ) -> Result<(), HeapError> {
    let getter = self.try_slot(storage, index)?.getter();
    self.set_slot(storage, index, PropertySlot::Accessor { getter, setter })
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn set_slot_var_ref(
    &mut self,
    storage: Handle,
    index: u32,
    var_ref: Handle,
  ) -> Result<(), HeapError> {
    self.set_slot(storage, index, PropertySlot::VarRef(var_ref))
  }

  /// Grows a property slot array in place as far as its handle is concerned: contents move to a
  /// new block and `storage` is retargeted. New slots are empty. Shrinking is a no-op.
  pub fn grow_property_array(&mut self, storage: Handle, capacity: u32) -> Result<(), HeapError> {
    if capacity <= self.slot_capacity(storage) {
      // Still validate the handle so a dead one is reported rather than ignored.
      self.resolve_kind(storage, RecordKind::PropertyArray)?;
      return Ok(());
    }
    self.grow_record(
      storage,
      RecordKind::PropertyArray,
      capacity as usize * PropertySlot::SIZE,
    )
  }

  // Dense elements.

  /// Elements the object's dense storage can hold without growing.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn element_capacity(&self, obj: Handle) -> u32 {
    let values = self.get(obj, OBJECT_ARRAY_VALUES);
    if values.is_null() {
      return 0;
    }
    match self.record(values, RecordKind::ElementArray) {
      Ok(bytes) => (bytes.len() / Value::SIZE) as u32,
      Err(_) => 0,
    }
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn try_element(&self, obj: Handle, index: u32) -> Result<Value, HeapError> {
    let len = self.try_get(obj, OBJECT_ARRAY_COUNT)?;
    if index >= len {
      return Err(HeapError::IndexOutOfBounds { index, len });
    }
    let values = self.try_get(obj, OBJECT_ARRAY_VALUES)?;
    let bytes = self.record(values, RecordKind::ElementArray)?;
    let at = element_range(bytes.len(), index)?;
    Ok(Value::decode(&bytes[at]))
  }

  /// Element `index` of a dense array, or `Undefined` past its end or on any resolution failure.
  #[cfg_attr(debug_assertions, track_caller)]
  pub fn element(&self, obj: Handle, index: u32) -> Value {
    self.try_element(obj, index).unwrap_or_default()
  }

  #[cfg_attr(debug_assertions, track_caller)]
  pub fn set_element(&mut self, obj: Handle, index: u32, value: Value) -> Result<(), HeapError> {
    let len = self.try_get(obj, OBJECT_ARRAY_COUNT)?;
    if index >= len {
      return Err(HeapError::IndexOutOfBounds { index, len });
    }
    let values = self.try_get(obj, OBJECT_ARRAY_VALUES)?;
    let bytes = self.record_mut(values, RecordKind::ElementArray)?;
    let at = element_range(bytes.len(), index)?;
    value.encode(&mut bytes[at]);
    Ok(())
  }

  /// Appends to the object's dense storage, growing it when full, and returns the new element's
  /// index. The object becomes a fast array.
  pub fn push_element(&mut self, obj: Handle, value: Value) -> Result<u32, HeapError> {
    let len = self.try_get(obj, OBJECT_ARRAY_COUNT)?;
    let mut values = self.try_get(obj, OBJECT_ARRAY_VALUES)?;
    if values.is_null() {
      values = self.alloc_element_array(INITIAL_ELEMENT_CAPACITY)?;
      self.set(obj, OBJECT_ARRAY_VALUES, values)?;
      self.set(obj, OBJECT_FAST_ARRAY, true)?;
    }
    let capacity = self.element_capacity(obj);
    if len >= capacity {
      let grown = capacity.saturating_mul(2).max(INITIAL_ELEMENT_CAPACITY);
      self.grow_record(
        values,
        RecordKind::ElementArray,
        grown as usize * Value::SIZE,
      )?;
    }
    // `values` names the same storage even if it just moved.
    let bytes = self.record_mut(values, RecordKind::ElementArray)?;
    let at = element_range(bytes.len(), len)?;
    value.encode(&mut bytes[at]);
    self.set(obj, OBJECT_ARRAY_COUNT, len + 1)?;
    Ok(len)
  }

  fn grow_record(
    &mut self,
    handle: Handle,
    kind: RecordKind,
    new_size: usize,
  ) -> Result<(), HeapError> {
    let old = self.resolve_kind(handle, kind)?;
    let fresh = self
      .arena
      .reallocate(Some(old), new_size)
      .ok_or(AllocError::Exhausted {
        requested: new_size,
        offset: self.arena.used(),
        capacity: self.arena.capacity(),
      })?;
    let rec = self.handles.resolve(handle).ok_or(HeapError::InvalidHandle)?;
    self.handles.relocate(handle, RecordRef { ptr: fresh, ..rec })?;
    tracing::debug!(target: "heap_js::relocate", ?handle, ?old, ?fresh, "grew record");
    Ok(())
  }

  /// Moves a live record to a fresh arena block and retargets its handle.
  ///
  /// Every holder of `handle` sees the record at its new location; field values are unchanged.
  /// Pinned records are refused with [`HeapError::Pinned`].
  pub fn relocate(&mut self, handle: Handle) -> Result<(), HeapError> {
    let rec = self.handles.resolve(handle).ok_or(HeapError::InvalidHandle)?;
    if rec.pinned {
      return Err(HeapError::Pinned);
    }
    let fresh = self.arena.allocate(rec.ptr.len())?;
    self
      .arena
      .copy_within(rec.ptr, fresh, rec.ptr.len())
      .ok_or(HeapError::InvalidHandle)?;
    self.handles.relocate(
      handle,
      RecordRef {
        ptr: fresh,
        ..rec
      },
    )?;
    tracing::debug!(target: "heap_js::relocate", ?handle, old = ?rec.ptr, ?fresh, "relocated record");
    Ok(())
  }

  /// Invalidates a single handle. Hashed shapes are unlinked from their bucket first.
  ///
  /// The record's arena space is not reclaimed. Returns false if the handle was already dead.
  pub fn invalidate(&mut self, handle: Handle) -> bool {
    if self.kind(handle) == Some(RecordKind::Shape) && self.get(handle, SHAPE_IS_HASHED) {
      if let Err(err) = self.unhash_shape(handle) {
        // The bucket keeps a dead link; shapes chained behind it are no longer found.
        tracing::warn!(target: "heap_js::shapes", ?handle, %err, "could not unhash invalidated shape");
      }
    }
    self.handles.invalidate(handle)
  }

  /// Keeps `handle`'s record at its current address: [`Heap::relocate`] refuses it until
  /// [`Heap::unpin`]. Growing a pinned slot or element array still moves it.
  pub fn pin(&mut self, handle: Handle) -> Result<(), HeapError> {
    self.set_pinned(handle, true)
  }

  pub fn unpin(&mut self, handle: Handle) -> Result<(), HeapError> {
    self.set_pinned(handle, false)
  }

  pub fn is_pinned(&self, handle: Handle) -> bool {
    self.handles.resolve(handle).is_some_and(|rec| rec.pinned)
  }

  fn set_pinned(&mut self, handle: Handle, pinned: bool) -> Result<(), HeapError> {
    let rec = self.handles.resolve(handle).ok_or(HeapError::InvalidHandle)?;
    self.handles.relocate(handle, RecordRef { pinned, ..rec })
  }

  /// Ends the session: invalidates every handle, drops every root, forgets interned shapes and
  /// rewinds the arena.
  ///
  /// Handles issued before the reset never resolve again.
  pub fn reset(&mut self) {
    let live = self.handles.len();
    self.handles.invalidate_all();
    self.roots.clear();
    self.shapes.clear();
    self.arena.reset();
    tracing::info!(invalidated = live, "heap reset");
  }

  /// Invalidates everything and releases the arena. Allocation fails afterwards.
  pub fn teardown(&mut self) {
    self.handles.invalidate_all();
    self.roots.clear();
    self.shapes.clear();
    self.arena.teardown();
  }

  pub fn stats(&self) -> HeapStats {
    let mut records = RecordCounts::default();
    let mut pinned = 0;
    for (_, rec) in self.handles.iter() {
      if rec.pinned {
        pinned += 1;
      }
      match rec.kind {
        RecordKind::Object => records.objects += 1,
        RecordKind::Shape => records.shapes += 1,
        RecordKind::PropertyArray => records.property_arrays += 1,
        RecordKind::ElementArray => records.element_arrays += 1,
      }
    }
    HeapStats {
      arena_capacity: self.arena.capacity(),
      arena_used: self.arena.used(),
      arena_available: self.arena.available(),
      arena_epoch: self.arena.epoch(),
      live_handles: self.handles.len(),
      free_handles: self.handles.free_count(),
      handle_capacity: self.handles.capacity(),
      hashed_shapes: self.shapes.len(),
      roots: self.roots.len(),
      pinned,
      records,
    }
  }
}

fn slot_range(len: usize, index: u32) -> Result<core::ops::Range<usize>, HeapError> {
  stride_range(len, index, PropertySlot::SIZE)
}

fn element_range(len: usize, index: u32) -> Result<core::ops::Range<usize>, HeapError> {
  stride_range(len, index, Value::SIZE)
}

fn stride_range(
  len: usize,
  index: u32,
  stride: usize,
) -> Result<core::ops::Range<usize>, HeapError> {
  let count = len / stride;
  if index as usize >= count {
    return Err(HeapError::IndexOutOfBounds {
      index,
      len: count as u32,
    });
  }
  let start = index as usize * stride;
  Ok(start..start + stride)
}
