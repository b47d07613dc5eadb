#![cfg(debug_assertions)]

use heap_js::{
  Heap, HeapConfig, HeapError, NULL_HANDLE, OBJECT_CLASS_ID, SHAPE_IS_HASHED, SHAPE_PROTO,
};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
  buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  fn contents(&self) -> String {
    String::from_utf8(self.buffer.lock().unwrap().clone()).unwrap()
  }
}

struct SharedWriterGuard<'a> {
  buffer: &'a Arc<Mutex<Vec<u8>>>,
}

impl<'a> io::Write for SharedWriterGuard<'a> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.buffer.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> MakeWriter<'a> for SharedWriter {
  type Writer = SharedWriterGuard<'a>;

  fn make_writer(&'a self) -> Self::Writer {
    SharedWriterGuard {
      buffer: &self.buffer,
    }
  }
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
  let writer = SharedWriter::default();
  let subscriber = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_ansi(false)
    .with_writer(writer.clone())
    .finish();
  let result = tracing::subscriber::with_default(subscriber, f);
  (result, writer.contents())
}

#[test]
fn null_dereference_logs_call_site() -> Result<(), HeapError> {
  let heap = Heap::new(HeapConfig::new(4096))?;

  let ((line, class_id), output) =
    capture(|| (line!(), heap.get(NULL_HANDLE, OBJECT_CLASS_ID)));

  assert_eq!(class_id, 0);
  assert!(
    output.contains("handle did not resolve"),
    "missing event, got: {output}"
  );
  assert!(output.contains("null=true"), "got: {output}");
  assert!(
    output.contains(&format!("diagnostics.rs:{line}:")),
    "expected caller location on line {line}, got: {output}"
  );
  Ok(())
}

#[test]
fn kind_mismatch_logs_both_kinds() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(4096))?;
  let obj = heap.alloc_object(NULL_HANDLE, 0)?;

  let (proto, output) = capture(|| heap.get(obj, SHAPE_PROTO));

  assert_eq!(proto, NULL_HANDLE);
  assert!(output.contains("record kind mismatch"), "got: {output}");
  assert!(output.contains("expected=Shape"), "got: {output}");
  assert!(output.contains("found=Object"), "got: {output}");
  assert!(output.contains("heap_js::deref"), "got: {output}");
  Ok(())
}

#[test]
fn successful_access_is_silent() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(4096))?;
  let obj = heap.alloc_object(NULL_HANDLE, 4)?;

  let (class_id, output) = capture(|| heap.get(obj, OBJECT_CLASS_ID));

  assert_eq!(class_id, 4);
  assert!(!output.contains("heap_js::deref"), "got: {output}");
  Ok(())
}

#[test]
fn invalidating_an_unlinkable_shape_warns() -> Result<(), HeapError> {
  let mut heap = Heap::new(HeapConfig::new(4096))?;
  // Flagged as hashed without ever being linked into a bucket.
  let shape = heap.alloc_shape(NULL_HANDLE, 0)?;
  heap.set(shape, SHAPE_IS_HASHED, true)?;

  let (invalidated, output) = capture(|| heap.invalidate(shape));

  assert!(invalidated);
  assert!(!heap.is_live(shape));
  assert!(
    output.contains("could not unhash invalidated shape"),
    "got: {output}"
  );
  assert!(output.contains("heap_js::shapes"), "got: {output}");
  Ok(())
}
