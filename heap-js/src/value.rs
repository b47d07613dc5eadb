use crate::handle::Handle;

/// A script value as stored in property slots and element arrays.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Value {
  #[default]
  Undefined,
  Null,
  Bool(bool),
  Int(i32),
  Float(f64),
  Object(Handle),
}

impl Value {
  /// Encoded width: a tag byte, padding, then an 8-byte payload.
  pub const SIZE: usize = 16;

  const TAG_UNDEFINED: u8 = 0;
  const TAG_NULL: u8 = 1;
  const TAG_BOOL: u8 = 2;
  const TAG_INT: u8 = 3;
  const TAG_FLOAT: u8 = 4;
  const TAG_OBJECT: u8 = 5;

  pub fn as_object(self) -> Option<Handle> {
    match self {
      Value::Object(h) => Some(h),
      _ => None,
    }
  }

  pub(crate) fn encode(self, out: &mut [u8]) {
    debug_assert!(out.len() >= Self::SIZE);
    let (tag, payload) = match self {
      Value::Undefined => (Self::TAG_UNDEFINED, 0),
      Value::Null => (Self::TAG_NULL, 0),
      Value::Bool(b) => (Self::TAG_BOOL, b as u64),
      Value::Int(i) => (Self::TAG_INT, i as u32 as u64),
      Value::Float(f) => (Self::TAG_FLOAT, f.to_bits()),
      Value::Object(h) => (Self::TAG_OBJECT, h.to_raw()),
    };
    out[..8].fill(0);
    out[0] = tag;
    out[8..16].copy_from_slice(&payload.to_le_bytes());
  }

  /// Unknown tags decode as `Undefined`, which is also what zeroed storage decodes to.
  pub(crate) fn decode(bytes: &[u8]) -> Value {
    let mut payload = [0u8; 8];
    payload.copy_from_slice(&bytes[8..16]);
    let payload = u64::from_le_bytes(payload);
    match bytes[0] {
      Self::TAG_NULL => Value::Null,
      Self::TAG_BOOL => Value::Bool(payload != 0),
      Self::TAG_INT => Value::Int(payload as u32 as i32),
      Self::TAG_FLOAT => Value::Float(f64::from_bits(payload)),
      Self::TAG_OBJECT => Value::Object(Handle::from_raw(payload)),
      _ => Value::Undefined,
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Int(i)
  }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self {
    Value::Float(f)
  }
}

impl From<Handle> for Value {
  fn from(h: Handle) -> Self {
    Value::Object(h)
  }
}
