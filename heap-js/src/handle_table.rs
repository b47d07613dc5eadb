use crate::error::HeapError;
use crate::handle::Handle;

#[derive(Clone, Copy, Debug)]
struct Entry<A> {
  generation: u32,
  address: Option<A>,
}

impl<A> Entry<A> {
  fn vacant() -> Self {
    Entry {
      generation: 0,
      address: None,
    }
  }
}

/// Maps [`Handle`]s to the current address of their record.
///
/// The table knows nothing about what an address is; the heap stores arena pointers tagged with a
/// record kind, tests often store plain integers. Relocating a record only rewrites its entry, so
/// every holder of the handle observes the move.
#[derive(Clone, Debug)]
pub struct HandleTable<A> {
  // Entry 0 is a permanent placeholder so that index 0 always means `NULL_HANDLE`.
  entries: Vec<Entry<A>>,
  free_list: Vec<u32>,
  live: usize,
  max_handles: Option<u32>,
}

impl<A: Copy> HandleTable<A> {
  pub fn new() -> Self {
    Self::with_capacity(0, None)
  }

  /// Preallocates room for `initial` handles. `max_handles` caps the number of distinct indices
  /// the table will ever issue.
  pub fn with_capacity(initial: usize, max_handles: Option<u32>) -> Self {
    let mut entries = Vec::with_capacity(initial.saturating_add(1));
    entries.push(Entry::vacant());
    HandleTable {
      entries,
      free_list: Vec::new(),
      live: 0,
      max_handles,
    }
  }

  /// Issues a fresh handle for `address`.
  ///
  /// Invalidated indices are reused first; their bumped generation keeps old handles dead.
  pub fn register(&mut self, address: A) -> Result<Handle, HeapError> {
    let index = match self.free_list.pop() {
      Some(index) => index,
      None => {
        let index = self.entries.len();
        let limit = self.max_handles.unwrap_or(u32::MAX - 1) as usize;
        if index > limit || index > u32::MAX as usize {
          return Err(HeapError::HandleTableFull);
        }
        self
          .entries
          .try_reserve(1)
          .map_err(|_| HeapError::HandleTableFull)?;
        self.entries.push(Entry::vacant());
        index as u32
      }
    };

    let entry = &mut self.entries[index as usize];
    debug_assert!(entry.address.is_none(), "free list returned a live entry");
    entry.address = Some(address);
    self.live += 1;
    Ok(Handle::from_parts(index, entry.generation))
  }

  fn entry(&self, handle: Handle) -> Option<&Entry<A>> {
    if handle.is_null() {
      return None;
    }
    let entry = self.entries.get(handle.index() as usize)?;
    if entry.generation != handle.generation() {
      return None;
    }
    entry.address.is_some().then_some(entry)
  }

  /// The record's current address. `None` for `NULL_HANDLE` and for unknown, stale or invalidated
  /// handles.
  ///
  /// Callers must not hold the result across anything that can allocate or relocate.
  #[inline]
  pub fn resolve(&self, handle: Handle) -> Option<A> {
    self.entry(handle)?.address
  }

  pub fn is_live(&self, handle: Handle) -> bool {
    self.entry(handle).is_some()
  }

  /// Points `handle` at `address` without changing the handle's value.
  pub fn relocate(&mut self, handle: Handle, address: A) -> Result<(), HeapError> {
    if self.entry(handle).is_none() {
      return Err(HeapError::InvalidHandle);
    }
    self.entries[handle.index() as usize].address = Some(address);
    Ok(())
  }

  /// Clears `handle`'s entry and frees its index. Returns false if the handle was already dead.
  pub fn invalidate(&mut self, handle: Handle) -> bool {
    if self.entry(handle).is_none() {
      return false;
    }
    let index = handle.index();
    let entry = &mut self.entries[index as usize];
    entry.address = None;
    entry.generation = entry.generation.wrapping_add(1);
    self.free_list.push(index);
    self.live -= 1;
    true
  }

  /// Invalidates every live handle at once.
  pub fn invalidate_all(&mut self) {
    self.free_list.clear();
    for (index, entry) in self.entries.iter_mut().enumerate().skip(1).rev() {
      if entry.address.take().is_some() {
        entry.generation = entry.generation.wrapping_add(1);
      }
      self.free_list.push(index as u32);
    }
    self.live = 0;
  }

  /// Live handles.
  pub fn len(&self) -> usize {
    self.live
  }

  pub fn is_empty(&self) -> bool {
    self.live == 0
  }

  /// Indices issued so far, live or free.
  pub fn capacity(&self) -> usize {
    self.entries.len() - 1
  }

  pub fn free_count(&self) -> usize {
    self.free_list.len()
  }

  /// Live handles and their current addresses, in index order.
  pub fn iter(&self) -> impl Iterator<Item = (Handle, A)> + '_ {
    self
      .entries
      .iter()
      .enumerate()
      .skip(1)
      .filter_map(|(index, entry)| {
        entry
          .address
          .map(|address| (Handle::from_parts(index as u32, entry.generation), address))
      })
  }
}

impl<A: Copy> Default for HandleTable<A> {
  fn default() -> Self {
    Self::new()
  }
}
