use heap_js::{Heap, HeapConfig, HeapError, PropertySlot, Value, NULL_HANDLE};

#[test]
fn slots_start_empty() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let props = heap.alloc_property_array(4)?;

  assert_eq!(heap.slot_capacity(props), 4);
  for i in 0..4 {
    assert_eq!(heap.slot(props, i), PropertySlot::EMPTY);
  }
  Ok(())
}

#[test]
fn value_slots_round_trip() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let target = heap.alloc_object(NULL_HANDLE, 0)?;
  let props = heap.alloc_property_array(6)?;

  let values = [
    Value::Null,
    Value::Bool(true),
    Value::Int(-17),
    Value::Float(2.5),
    Value::Object(target),
    Value::Undefined,
  ];
  for (i, v) in values.iter().enumerate() {
    heap.set_slot_value(props, i as u32, *v)?;
  }
  for (i, v) in values.iter().enumerate() {
    assert_eq!(heap.slot_value(props, i as u32), *v, "slot {i}");
  }
  Ok(())
}

#[test]
fn accessor_and_var_ref_slots() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let getter = heap.alloc_object(NULL_HANDLE, 1)?;
  let setter = heap.alloc_object(NULL_HANDLE, 2)?;
  let var_ref = heap.alloc_object(NULL_HANDLE, 3)?;
  let props = heap.alloc_property_array(3)?;

  heap.set_slot(props, 0, PropertySlot::Accessor { getter, setter })?;
  assert_eq!(heap.slot_getter(props, 0), getter);
  assert_eq!(heap.slot_setter(props, 0), setter);
  assert_eq!(heap.slot_value(props, 0), Value::Undefined);

  // Setting one side of a data slot turns it into an accessor with the other side empty.
  heap.set_slot_value(props, 1, Value::Int(5))?;
  heap.set_slot_setter(props, 1, setter)?;
  assert_eq!(heap.slot_getter(props, 1), NULL_HANDLE);
  assert_eq!(heap.slot_setter(props, 1), setter);
  heap.set_slot_getter(props, 1, getter)?;
  assert_eq!(
    heap.slot(props, 1),
    PropertySlot::Accessor { getter, setter }
  );

  heap.set_slot_var_ref(props, 2, var_ref)?;
  assert_eq!(heap.slot_var_ref(props, 2), var_ref);
  assert_eq!(heap.slot_getter(props, 2), NULL_HANDLE);
  Ok(())
}

#[test]
fn out_of_range_and_dead_storage() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let props = heap.alloc_property_array(2)?;
  heap.set_slot_value(props, 1, Value::Int(1))?;

  assert_eq!(heap.slot(props, 2), PropertySlot::EMPTY);
  assert_eq!(
    heap.set_slot_value(props, 2, Value::Null),
    Err(HeapError::IndexOutOfBounds { index: 2, len: 2 })
  );

  assert_eq!(heap.slot_capacity(NULL_HANDLE), 0);
  assert_eq!(heap.slot_value(NULL_HANDLE, 0), Value::Undefined);
  assert_eq!(heap.slot_getter(NULL_HANDLE, 0), NULL_HANDLE);

  // An object handle is not property storage.
  let obj = heap.alloc_object(NULL_HANDLE, 0)?;
  assert!(matches!(
    heap.try_slot(obj, 0),
    Err(HeapError::KindMismatch { .. })
  ));
  Ok(())
}

#[test]
fn growing_keeps_storage_handle_and_contents() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(64 * 1024))?;
  let props = heap.alloc_property_array(2)?;
  heap.set_slot_value(props, 0, Value::Int(10))?;
  heap.set_slot_value(props, 1, Value::Float(0.5))?;

  heap.grow_property_array(props, 8)?;
  assert_eq!(heap.slot_capacity(props), 8);
  assert_eq!(heap.slot_value(props, 0), Value::Int(10));
  assert_eq!(heap.slot_value(props, 1), Value::Float(0.5));
  assert_eq!(heap.slot(props, 7), PropertySlot::EMPTY);
  heap.set_slot_value(props, 7, Value::Bool(false))?;

  // Shrinking requests are ignored.
  heap.grow_property_array(props, 1)?;
  assert_eq!(heap.slot_capacity(props), 8);
  Ok(())
}
