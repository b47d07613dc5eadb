use crate::handle::Handle;
use crate::handle::NULL_HANDLE;
use crate::value::Value;

/// One entry of a property slot array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertySlot {
  /// A data property.
  Value(Value),
  /// An accessor pair. Either side may be `NULL_HANDLE`.
  Accessor { getter: Handle, setter: Handle },
  /// A binding shared with a closure's variable reference record.
  VarRef(Handle),
}

impl PropertySlot {
  /// Returned for unresolvable storage handles and out-of-range indices. Also what zeroed storage
  /// decodes to.
  pub const EMPTY: PropertySlot = PropertySlot::Value(Value::Undefined);

  pub(crate) const SIZE: usize = 24;

  const TAG_VALUE: u8 = 0;
  const TAG_ACCESSOR: u8 = 1;
  const TAG_VAR_REF: u8 = 2;

  pub fn value(self) -> Option<Value> {
    match self {
      PropertySlot::Value(v) => Some(v),
      _ => None,
    }
  }

  pub fn getter(self) -> Handle {
    match self {
      PropertySlot::Accessor { getter, .. } => getter,
      _ => NULL_HANDLE,
    }
  }

  pub fn setter(self) -> Handle {
    match self {
      PropertySlot::Accessor { setter, .. } => setter,
      _ => NULL_HANDLE,
    }
  }

  pub fn var_ref(self) -> Handle {
    match self {
      PropertySlot::VarRef(h) => h,
      _ => NULL_HANDLE,
    }
  }

  pub(crate) fn encode(self, out: &mut [u8]) {
    out[..Self::SIZE].fill(0);
    match self {
      PropertySlot::Value(v) => {
        out[0] = Self::TAG_VALUE;
        v.encode(&mut out[8..24]);
      }
      PropertySlot::Accessor { getter, setter } => {
        out[0] = Self::TAG_ACCESSOR;
        out[8..16].copy_from_slice(&getter.to_raw().to_le_bytes());
        out[16..24].copy_from_slice(&setter.to_raw().to_le_bytes());
      }
      PropertySlot::VarRef(h) => {
        out[0] = Self::TAG_VAR_REF;
        out[8..16].copy_from_slice(&h.to_raw().to_le_bytes());
      }
    }
  }

  pub(crate) fn decode(bytes: &[u8]) -> PropertySlot {
    let handle_at = |at: usize| {
      let mut raw = [0u8; 8];
      raw.copy_from_slice(&bytes[at..at + 8]);
      Handle::from_raw(u64::from_le_bytes(raw))
    };
    match bytes[0] {
      Self::TAG_ACCESSOR => PropertySlot::Accessor {
        getter: handle_at(8),
        setter: handle_at(16),
      },
      Self::TAG_VAR_REF => PropertySlot::VarRef(handle_at(8)),
      _ => PropertySlot::Value(Value::decode(&bytes[8..24])),
    }
  }
}

impl Default for PropertySlot {
  fn default() -> Self {
    PropertySlot::EMPTY
  }
}

impl From<Value> for PropertySlot {
  fn from(v: Value) -> Self {
    PropertySlot::Value(v)
  }
}
