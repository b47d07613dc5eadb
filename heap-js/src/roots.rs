use crate::error::HeapError;
use crate::handle::Handle;
use crate::heap::Heap;

/// A slot in a heap's root set, returned by [`Heap::add_root`].
///
/// Roots are how host code declares the records it holds on to. Ids are reused after
/// [`Heap::remove_root`], and [`Heap::reset`] drops every root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootId(u32);

#[derive(Debug, Default)]
pub(crate) struct RootSet {
  slots: Vec<Option<Handle>>,
  free: Vec<u32>,
  len: usize,
}

impl RootSet {
  fn insert(&mut self, handle: Handle) -> Result<RootId, HeapError> {
    let index = match self.free.pop() {
      Some(index) => index,
      None => {
        let index = u32::try_from(self.slots.len()).map_err(|_| HeapError::HandleTableFull)?;
        self
          .slots
          .try_reserve(1)
          .map_err(|_| HeapError::HandleTableFull)?;
        self.slots.push(None);
        index
      }
    };
    self.slots[index as usize] = Some(handle);
    self.len += 1;
    Ok(RootId(index))
  }

  fn slot_mut(&mut self, id: RootId) -> Option<&mut Option<Handle>> {
    self
      .slots
      .get_mut(id.0 as usize)
      .filter(|slot| slot.is_some())
  }

  pub(crate) fn len(&self) -> usize {
    self.len
  }

  pub(crate) fn clear(&mut self) {
    self.slots.clear();
    self.free.clear();
    self.len = 0;
  }
}

impl Heap {
  /// Roots `handle`, which must be live.
  pub fn add_root(&mut self, handle: Handle) -> Result<RootId, HeapError> {
    if !self.is_live(handle) {
      return Err(HeapError::InvalidHandle);
    }
    let id = self.roots.insert(handle)?;
    tracing::trace!(target: "heap_js::roots", ?id, ?handle, "added root");
    Ok(id)
  }

  /// The handle stored in root `id`. It stops resolving if its record is invalidated, but stays
  /// rooted until removed.
  pub fn get_root(&self, id: RootId) -> Option<Handle> {
    self.roots.slots.get(id.0 as usize).copied().flatten()
  }

  /// Points root `id` at another live record.
  pub fn set_root(&mut self, id: RootId, handle: Handle) -> Result<(), HeapError> {
    if !self.is_live(handle) {
      return Err(HeapError::InvalidHandle);
    }
    let slot = self.roots.slot_mut(id).ok_or(HeapError::InvalidRoot)?;
    *slot = Some(handle);
    Ok(())
  }

  /// Returns false if `id` was not an occupied root.
  pub fn remove_root(&mut self, id: RootId) -> bool {
    let Some(slot) = self.roots.slot_mut(id) else {
      return false;
    };
    *slot = None;
    self.roots.free.push(id.0);
    self.roots.len -= 1;
    true
  }

  /// Every rooted handle, in root-slot order.
  pub fn roots(&self) -> impl Iterator<Item = (RootId, Handle)> + '_ {
    self
      .roots
      .slots
      .iter()
      .enumerate()
      .filter_map(|(index, slot)| slot.map(|handle| (RootId(index as u32), handle)))
  }
}
