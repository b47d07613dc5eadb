use crate::error::HeapError;
use crate::handle::Handle;
use crate::handle::NULL_HANDLE;
use crate::heap::Heap;
use crate::record::OBJECT_SHAPE;
use crate::record::SHAPE_PROTO;
use core::ops::ControlFlow;

/// Hard upper bound on prototype links followed by one walk.
///
/// Well-formed chains are far shorter; hitting this means the chain is cyclic or corrupt.
pub const MAX_PROTO_CHAIN_DEPTH: usize = 1000;

/// How a [`Heap::walk_proto_chain`] or [`Heap::walk_proto_chain_with_shape`] ended.
///
/// `hops` counts prototype links followed from the start object, so the start object is at hop 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainWalk<B> {
  /// The body broke out at `at`.
  Broke { value: B, at: Handle, hops: usize },
  /// The chain reached `NULL_HANDLE`. `last` is the final object visited, or `NULL_HANDLE` if the
  /// start itself was null.
  Ended { last: Handle, visited: usize },
  /// `at` has no shape, so its prototype is unknown.
  NoShape { at: Handle, hops: usize },
  /// [`MAX_PROTO_CHAIN_DEPTH`] objects were visited and the chain still continued.
  DepthExceeded { last: Handle, visited: usize },
}

/// The result of [`Heap::walk_proto_chain_until`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainSearch {
  Found { handle: Handle, hops: usize },
  NotFound { last: Handle, visited: usize },
  /// Also a failed search, but one that must not be mistaken for a short chain.
  DepthExceeded { last: Handle, visited: usize },
}

impl ChainSearch {
  pub fn found(&self) -> bool {
    matches!(self, ChainSearch::Found { .. })
  }

  pub fn depth_exceeded(&self) -> bool {
    matches!(self, ChainSearch::DepthExceeded { .. })
  }

  /// The matching object, or the last object examined when nothing matched.
  pub fn handle(&self) -> Handle {
    match *self {
      ChainSearch::Found { handle, .. } => handle,
      ChainSearch::NotFound { last, .. } | ChainSearch::DepthExceeded { last, .. } => last,
    }
  }

  /// `Ok(Some(_))` on a match, `Ok(None)` at the end of a well-formed chain.
  pub fn into_result(self) -> Result<Option<Handle>, HeapError> {
    match self {
      ChainSearch::Found { handle, .. } => Ok(Some(handle)),
      ChainSearch::NotFound { .. } => Ok(None),
      ChainSearch::DepthExceeded { .. } => Err(HeapError::PrototypeChainTooDeep),
    }
  }
}

impl Heap {
  /// Runs `body` on `start` and then on each prototype in turn.
  ///
  /// The body gets the heap mutably and may allocate; the next prototype is read fresh after it
  /// returns, so a relocation inside the body is harmless.
  pub fn walk_proto_chain<B>(
    &mut self,
    start: Handle,
    mut body: impl FnMut(&mut Heap, Handle) -> ControlFlow<B>,
  ) -> ChainWalk<B> {
    let mut current = start;
    let mut last = NULL_HANDLE;
    let mut hops = 0usize;
    while !current.is_null() {
      if hops == MAX_PROTO_CHAIN_DEPTH {
        tracing::debug!(?start, ?last, "prototype chain walk exceeded depth bound");
        return ChainWalk::DepthExceeded {
          last,
          visited: hops,
        };
      }
      if let ControlFlow::Break(value) = body(self, current) {
        return ChainWalk::Broke {
          value,
          at: current,
          hops,
        };
      }
      last = current;
      current = self.object_prototype(current);
      hops += 1;
    }
    ChainWalk::Ended {
      last,
      visited: hops,
    }
  }

  /// Like [`walk_proto_chain`](Heap::walk_proto_chain), also passing each object's shape.
  ///
  /// Stops with [`ChainWalk::NoShape`] at the first object without one.
  pub fn walk_proto_chain_with_shape<B>(
    &mut self,
    start: Handle,
    mut body: impl FnMut(&mut Heap, Handle, Handle) -> ControlFlow<B>,
  ) -> ChainWalk<B> {
    let mut current = start;
    let mut last = NULL_HANDLE;
    let mut hops = 0usize;
    while !current.is_null() {
      if hops == MAX_PROTO_CHAIN_DEPTH {
        tracing::debug!(?start, ?last, "prototype chain walk exceeded depth bound");
        return ChainWalk::DepthExceeded {
          last,
          visited: hops,
        };
      }
      let shape = self.get(current, OBJECT_SHAPE);
      if shape.is_null() {
        return ChainWalk::NoShape { at: current, hops };
      }
      if let ControlFlow::Break(value) = body(self, current, shape) {
        return ChainWalk::Broke {
          value,
          at: current,
          hops,
        };
      }
      last = current;
      // Re-read through the object: the body may have swapped its shape.
      let shape = self.get(current, OBJECT_SHAPE);
      current = self.get(shape, SHAPE_PROTO);
      hops += 1;
    }
    ChainWalk::Ended {
      last,
      visited: hops,
    }
  }

  /// Searches from `start` along the prototype chain for the first object matching `pred`.
  pub fn walk_proto_chain_until(
    &mut self,
    start: Handle,
    mut pred: impl FnMut(&Heap, Handle) -> bool,
  ) -> ChainSearch {
    let walk = self.walk_proto_chain(start, |heap, obj| {
      if pred(heap, obj) {
        ControlFlow::Break(())
      } else {
        ControlFlow::Continue(())
      }
    });
    match walk {
      ChainWalk::Broke { at, hops, .. } => ChainSearch::Found { handle: at, hops },
      ChainWalk::Ended { last, visited } | ChainWalk::NoShape { at: last, hops: visited } => {
        ChainSearch::NotFound { last, visited }
      }
      ChainWalk::DepthExceeded { last, visited } => ChainSearch::DepthExceeded { last, visited },
    }
  }

  /// Whether `target` is `obj` or on its prototype chain.
  pub fn proto_chain_contains(&mut self, obj: Handle, target: Handle) -> Result<bool, HeapError> {
    Ok(
      self
        .walk_proto_chain_until(obj, |_, h| h == target)
        .into_result()?
        .is_some(),
    )
  }
}
