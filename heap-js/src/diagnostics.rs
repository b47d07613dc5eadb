//! Debug-build reporting for failed fused accesses.
//!
//! Events go to the `heap_js::deref` target and carry the caller's source location. Release builds
//! compile these to nothing; the accessors still return their sentinels either way.

use crate::handle::Handle;
use crate::record::RecordKind;

#[cfg(debug_assertions)]
#[track_caller]
pub(crate) fn unresolved(handle: Handle, expected: RecordKind) {
  let location = core::panic::Location::caller();
  tracing::debug!(
    target: "heap_js::deref",
    ?handle,
    null = handle.is_null(),
    ?expected,
    %location,
    "handle did not resolve"
  );
}

#[cfg(debug_assertions)]
#[track_caller]
pub(crate) fn kind_mismatch(handle: Handle, expected: RecordKind, found: RecordKind) {
  let location = core::panic::Location::caller();
  tracing::warn!(
    target: "heap_js::deref",
    ?handle,
    ?expected,
    ?found,
    %location,
    "record kind mismatch"
  );
}

#[cfg(not(debug_assertions))]
#[inline(always)]
pub(crate) fn unresolved(_handle: Handle, _expected: RecordKind) {}

#[cfg(not(debug_assertions))]
#[inline(always)]
pub(crate) fn kind_mismatch(_handle: Handle, _expected: RecordKind, _found: RecordKind) {}
