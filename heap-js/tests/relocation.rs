use heap_js::{
  Heap, HeapConfig, HeapError, Value, NULL_HANDLE, OBJECT_CLASS_ID, OBJECT_PROPS, OBJECT_SHAPE,
  OBJECT_WEAKREF_COUNT, SHAPE_PROP_COUNT,
};

#[test]
fn relocated_record_keeps_handle_and_fields() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let shape = heap.alloc_shape(NULL_HANDLE, 2)?;
  heap.set(shape, SHAPE_PROP_COUNT, 1)?;
  let obj = heap.alloc_object(shape, 12)?;
  heap.set(obj, OBJECT_WEAKREF_COUNT, 2)?;
  let props = heap.get(obj, OBJECT_PROPS);
  heap.set_slot_value(props, 0, Value::Float(1.25))?;

  // Another holder of the same handle, e.g. host code.
  let held = obj;
  let before = heap.arena().used();
  heap.relocate(obj)?;
  heap.relocate(shape)?;
  heap.relocate(props)?;
  assert!(heap.arena().used() > before);

  assert_eq!(heap.get(held, OBJECT_CLASS_ID), 12);
  assert_eq!(heap.get(held, OBJECT_WEAKREF_COUNT), 2);
  assert_eq!(heap.get(held, OBJECT_SHAPE), shape);
  assert_eq!(heap.get(shape, SHAPE_PROP_COUNT), 1);
  assert_eq!(heap.slot_value(props, 0), Value::Float(1.25));

  // Writes land in the new location.
  heap.set(held, OBJECT_CLASS_ID, 13)?;
  assert_eq!(heap.get(obj, OBJECT_CLASS_ID), 13);
  Ok(())
}

#[test]
fn relocating_dead_handle_fails() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let obj = heap.alloc_object(NULL_HANDLE, 0)?;
  heap.invalidate(obj);

  assert_eq!(heap.relocate(obj), Err(HeapError::InvalidHandle));
  assert_eq!(heap.relocate(NULL_HANDLE), Err(HeapError::InvalidHandle));
  Ok(())
}

#[test]
fn relocation_reports_exhaustion() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(96))?;
  let obj = heap.alloc_object(NULL_HANDLE, 5)?;
  heap.relocate(obj)?;

  assert!(matches!(heap.relocate(obj), Err(HeapError::OutOfMemory(_))));
  // The failed move left the record where it was.
  assert_eq!(heap.get(obj, OBJECT_CLASS_ID), 5);
  Ok(())
}

#[test]
fn pinned_records_refuse_relocation() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let obj = heap.alloc_object(NULL_HANDLE, 5)?;

  heap.pin(obj)?;
  assert!(heap.is_pinned(obj));
  assert_eq!(heap.stats().pinned, 1);
  let used = heap.arena().used();
  assert_eq!(heap.relocate(obj), Err(HeapError::Pinned));
  assert_eq!(heap.arena().used(), used);
  assert_eq!(heap.get(obj, OBJECT_CLASS_ID), 5);

  heap.unpin(obj)?;
  assert!(!heap.is_pinned(obj));
  heap.relocate(obj)?;
  assert_eq!(heap.get(obj, OBJECT_CLASS_ID), 5);

  assert!(!heap.is_pinned(NULL_HANDLE));
  assert_eq!(heap.pin(NULL_HANDLE), Err(HeapError::InvalidHandle));
  Ok(())
}

#[test]
fn growing_a_pinned_array_keeps_the_pin() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let props = heap.alloc_property_array(1)?;
  heap.set_slot_value(props, 0, Value::Int(3))?;
  heap.pin(props)?;

  heap.grow_property_array(props, 4)?;

  assert!(heap.is_pinned(props));
  assert_eq!(heap.slot_capacity(props), 4);
  assert_eq!(heap.slot_value(props, 0), Value::Int(3));
  Ok(())
}
