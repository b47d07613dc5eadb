use heap_js::{AllocError, Arena, ArenaPtr, JsAllocator, ALIGNMENT};
use std::collections::HashSet;

#[test]
fn allocations_within_capacity_succeed() -> Result<(), AllocError> {
  let arena = Arena::new(1024)?;
  let a = arena.allocate(100)?;
  let b = arena.allocate(1)?;

  assert_eq!(a.offset(), 0);
  assert_eq!(a.len(), 100);
  assert_eq!(b.offset(), 112);
  assert_eq!(b.offset() % ALIGNMENT, 0);
  assert_eq!(arena.used(), 128);
  assert_eq!(arena.available(), 1024 - 128);
  Ok(())
}

#[test]
fn exact_fit_then_exhaustion() -> Result<(), AllocError> {
  let arena = Arena::new(64)?;
  arena.allocate(48)?;
  arena.allocate(16)?;
  assert_eq!(arena.available(), 0);

  assert!(matches!(
    arena.allocate(1),
    Err(AllocError::Exhausted {
      requested: 1,
      offset: 64,
      capacity: 64
    })
  ));
  // The failed reservation is not handed back.
  assert_eq!(arena.used(), 80);
  assert_eq!(arena.available(), 0);
  Ok(())
}

#[test]
fn request_beyond_remaining_capacity_fails() -> Result<(), AllocError> {
  let arena = Arena::new(256)?;
  arena.allocate(200)?;
  let remaining = arena.available();
  assert!(arena.allocate(remaining + 1).is_err());
  Ok(())
}

#[test]
fn zero_size_is_rejected() -> Result<(), AllocError> {
  let arena = Arena::new(64)?;
  assert_eq!(arena.allocate(0), Err(AllocError::ZeroSize));
  assert_eq!(arena.used(), 0);
  Ok(())
}

#[test]
fn zero_capacity_fails_closed() {
  assert!(matches!(
    Arena::new(0),
    Err(AllocError::ReservationFailed { capacity: 0 })
  ));
}

#[test]
fn reset_rewinds_and_rejects_old_pointers() -> Result<(), AllocError> {
  let mut arena = Arena::new(128)?;
  let old = arena.allocate(32)?;
  arena.bytes_mut(old).unwrap().fill(7);

  arena.reset();
  assert_eq!(arena.used(), 0);
  assert_eq!(arena.epoch(), 1);
  assert!(arena.bytes(old).is_none());

  let fresh = arena.allocate(32)?;
  assert_eq!(fresh.offset(), old.offset());
  assert!(arena.bytes(fresh).is_some());
  Ok(())
}

#[test]
fn teardown_makes_arena_unusable() -> Result<(), AllocError> {
  let mut arena = Arena::new(128)?;
  let ptr = arena.allocate(16)?;
  arena.teardown();

  assert!(!arena.is_initialized());
  assert_eq!(arena.allocate(16), Err(AllocError::Uninitialized));
  assert!(arena.bytes(ptr).is_none());
  Ok(())
}

#[test]
fn concurrent_reservations_do_not_overlap() -> Result<(), AllocError> {
  const THREADS: usize = 8;
  const PER_THREAD: usize = 500;
  const SIZE: usize = 24;

  let arena = Arena::new(THREADS * PER_THREAD * 32)?;
  let shared = &arena;
  let ptrs: Vec<ArenaPtr> = std::thread::scope(|s| {
    let workers: Vec<_> = (0..THREADS)
      .map(|_| {
        s.spawn(move || {
          (0..PER_THREAD)
            .map(|_| shared.allocate(SIZE))
            .collect::<Result<Vec<_>, _>>()
        })
      })
      .collect();
    workers
      .into_iter()
      .map(|w| w.join().unwrap())
      .collect::<Result<Vec<_>, _>>()
      .map(|v| v.into_iter().flatten().collect())
  })?;

  assert_eq!(ptrs.len(), THREADS * PER_THREAD);
  let starts: HashSet<usize> = ptrs.iter().map(|p| p.offset()).collect();
  assert_eq!(starts.len(), ptrs.len(), "two reservations share a start");

  let mut ranges: Vec<_> = ptrs.iter().map(|p| p.reserved_range()).collect();
  ranges.sort_by_key(|r| r.start);
  for pair in ranges.windows(2) {
    assert!(
      pair[0].end <= pair[1].start,
      "{:?} overlaps {:?}",
      pair[0],
      pair[1]
    );
  }
  assert_eq!(arena.used(), THREADS * PER_THREAD * 32);
  Ok(())
}

#[test]
fn reallocate_copies_at_most_old_length() -> Result<(), AllocError> {
  let mut arena = Arena::new(1024)?;
  let old = arena.allocate(4)?;
  arena.bytes_mut(old).unwrap().copy_from_slice(b"abcd");
  // Dirty the next block so an over-read would show up in the copy.
  let neighbour = arena.allocate(16)?;
  arena.bytes_mut(neighbour).unwrap().fill(0xff);

  let grown = arena.reallocate(Some(old), 40).unwrap();
  assert_eq!(grown.len(), 40);
  let bytes = arena.bytes(grown).unwrap();
  assert_eq!(&bytes[..4], b"abcd");
  assert!(bytes[4..].iter().all(|&b| b == 0));
  Ok(())
}

#[test]
fn allocator_interface_edges() -> Result<(), AllocError> {
  let mut arena = Arena::new(256)?;

  let fresh = arena.reallocate(None, 10).unwrap();
  assert_eq!(fresh.len(), 10);
  assert!(arena.reallocate(Some(fresh), 0).is_none());

  assert_eq!(arena.usable_size(fresh), 0);
  let used = arena.used();
  arena.free(fresh);
  assert_eq!(arena.used(), used);

  assert!(JsAllocator::allocate(&arena, 0).is_none());
  assert!(JsAllocator::allocate(&arena, 1024).is_none());
  Ok(())
}
