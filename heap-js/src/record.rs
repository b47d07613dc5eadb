//! Record layouts and typed field descriptors.
//!
//! Records live in arena memory as plain little-endian bytes. A [`Field`] names one field of one
//! record kind; the heap's fused accessors take a handle and a `Field` and never hand out the
//! record's address.

use crate::handle::Handle;
use crate::handle::NULL_HANDLE;
use core::fmt;
use core::marker::PhantomData;

/// What a handle-table entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
  Object,
  Shape,
  PropertyArray,
  ElementArray,
}

/// A fixed-layout record kind.
pub trait Record {
  const KIND: RecordKind;
  const SIZE: usize;
}

/// Layout marker for object records.
#[derive(Clone, Copy, Debug)]
pub enum ObjectRecord {}

/// Layout marker for shape records.
#[derive(Clone, Copy, Debug)]
pub enum ShapeRecord {}

impl Record for ObjectRecord {
  const KIND: RecordKind = RecordKind::Object;
  const SIZE: usize = 40;
}

impl Record for ShapeRecord {
  const KIND: RecordKind = RecordKind::Shape;
  const SIZE: usize = 40;
}

/// A type that can be stored in a record field.
pub trait FieldValue: Copy + fmt::Debug {
  const WIDTH: usize;
  /// What a fused getter returns when the handle does not resolve.
  const SENTINEL: Self;

  fn read(bytes: &[u8]) -> Self;
  fn write(self, out: &mut [u8]);
}

macro_rules! int_field_value {
  ($($ty:ty),*) => {
    $(
      impl FieldValue for $ty {
        const WIDTH: usize = core::mem::size_of::<$ty>();
        const SENTINEL: Self = 0;

        #[inline]
        fn read(bytes: &[u8]) -> Self {
          let mut raw = [0u8; core::mem::size_of::<$ty>()];
          raw.copy_from_slice(&bytes[..Self::WIDTH]);
          <$ty>::from_le_bytes(raw)
        }

        #[inline]
        fn write(self, out: &mut [u8]) {
          out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
        }
      }
    )*
  };
}

int_field_value!(u8, u16, u32, u64);

impl FieldValue for bool {
  const WIDTH: usize = 1;
  const SENTINEL: Self = false;

  #[inline]
  fn read(bytes: &[u8]) -> Self {
    bytes[0] != 0
  }

  #[inline]
  fn write(self, out: &mut [u8]) {
    out[0] = self as u8;
  }
}

impl FieldValue for Handle {
  const WIDTH: usize = 8;
  const SENTINEL: Self = NULL_HANDLE;

  #[inline]
  fn read(bytes: &[u8]) -> Self {
    Handle::from_raw(u64::read(bytes))
  }

  #[inline]
  fn write(self, out: &mut [u8]) {
    self.to_raw().write(out);
  }
}

/// A typed field of record kind `R` holding a `T`.
pub struct Field<R, T> {
  offset: usize,
  name: &'static str,
  _marker: PhantomData<fn() -> (R, T)>,
}

impl<R: Record, T: FieldValue> Field<R, T> {
  pub const fn new(offset: usize, name: &'static str) -> Self {
    assert!(offset + T::WIDTH <= R::SIZE);
    Field {
      offset,
      name,
      _marker: PhantomData,
    }
  }

  #[inline]
  pub fn offset(&self) -> usize {
    self.offset
  }

  #[inline]
  pub fn name(&self) -> &'static str {
    self.name
  }

  #[inline]
  pub(crate) fn read(&self, record: &[u8]) -> T {
    T::read(&record[self.offset..self.offset + T::WIDTH])
  }

  #[inline]
  pub(crate) fn write(&self, record: &mut [u8], value: T) {
    value.write(&mut record[self.offset..self.offset + T::WIDTH]);
  }
}

impl<R, T> Clone for Field<R, T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<R, T> Copy for Field<R, T> {}

impl<R: Record, T> fmt::Debug for Field<R, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}.{}", R::KIND, self.name)
  }
}

pub const OBJECT_CLASS_ID: Field<ObjectRecord, u16> = Field::new(0, "class_id");
pub const OBJECT_EXTENSIBLE: Field<ObjectRecord, bool> = Field::new(2, "extensible");
pub const OBJECT_FAST_ARRAY: Field<ObjectRecord, bool> = Field::new(3, "fast_array");
pub const OBJECT_IS_EXOTIC: Field<ObjectRecord, bool> = Field::new(4, "is_exotic");
pub const OBJECT_IS_CONSTRUCTOR: Field<ObjectRecord, bool> = Field::new(5, "is_constructor");
pub const OBJECT_IMMUTABLE_PROTO: Field<ObjectRecord, bool> = Field::new(6, "immutable_proto");
pub const OBJECT_SHAPE: Field<ObjectRecord, Handle> = Field::new(8, "shape");
pub const OBJECT_PROPS: Field<ObjectRecord, Handle> = Field::new(16, "props");
pub const OBJECT_WEAKREF_COUNT: Field<ObjectRecord, u32> = Field::new(24, "weakref_count");
pub const OBJECT_ARRAY_COUNT: Field<ObjectRecord, u32> = Field::new(28, "array_count");
pub const OBJECT_ARRAY_VALUES: Field<ObjectRecord, Handle> = Field::new(32, "array_values");

pub const SHAPE_PROTO: Field<ShapeRecord, Handle> = Field::new(0, "proto");
pub const SHAPE_HASH_NEXT: Field<ShapeRecord, Handle> = Field::new(8, "hash_next");
pub const SHAPE_HASH: Field<ShapeRecord, u32> = Field::new(16, "hash");
pub const SHAPE_PROP_COUNT: Field<ShapeRecord, u32> = Field::new(20, "prop_count");
pub const SHAPE_DELETED_PROP_COUNT: Field<ShapeRecord, u32> = Field::new(24, "deleted_prop_count");
pub const SHAPE_PROP_SIZE: Field<ShapeRecord, u32> = Field::new(28, "prop_size");
pub const SHAPE_IS_HASHED: Field<ShapeRecord, bool> = Field::new(32, "is_hashed");
