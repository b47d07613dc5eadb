//! Arena allocation and relocation-safe record handles for an embedded JavaScript interpreter.
//!
//! The crate has three layers:
//! - An [`Arena`]: one fixed-size block handed out by a lock-free bump offset, rewound wholesale
//!   between sessions. [`JsAllocator`] is the allocation interface an interpreter draws from.
//! - A [`HandleTable`]: opaque, generation-checked [`Handle`]s mapped to current addresses.
//!   Moving a record only rewrites its entry, so every holder of the handle follows it.
//! - The typed access layer on [`Heap`]: object and shape records, property slot arrays and dense
//!   element arrays, read and written through fused resolve-and-access methods, plus bounded
//!   prototype chain walks and shape interning.
//!
//! # Handle validity
//!
//! A handle is `{ index, generation }`. Index 0 is [`NULL_HANDLE`]. Invalidating a handle bumps its
//! entry's generation before the index is reused, and [`Heap::reset`] invalidates every handle, so
//! a handle from an earlier session or a dead record always resolves to nothing.
//!
//! Accessors never return a record's address. Getters such as [`Heap::get`] return a sentinel
//! (`NULL_HANDLE`, `0`, `false`, [`Value::Undefined`], [`PropertySlot::EMPTY`]) when a handle does
//! not resolve; `try_*` variants and setters report a [`HeapError`]. Debug builds additionally log
//! each failed resolution with its call site under the `heap_js::deref` tracing target.

mod allocator;
mod arena;
mod config;
mod diagnostics;
mod error;
mod handle;
mod handle_table;
mod heap;
mod property;
mod proto_chain;
mod record;
mod roots;
mod shape_table;
mod shared;
mod stats;
mod value;

pub use crate::allocator::JsAllocator;
pub use crate::arena::Arena;
pub use crate::arena::ArenaPtr;
pub use crate::arena::ALIGNMENT;
pub use crate::config::HeapConfig;
pub use crate::config::DEFAULT_ARENA_CAPACITY;
pub use crate::config::DEFAULT_INITIAL_HANDLES;
pub use crate::config::DEFAULT_SHAPE_HASH_BITS;
pub use crate::error::AllocError;
pub use crate::error::HeapError;
pub use crate::handle::Handle;
pub use crate::handle::NULL_HANDLE;
pub use crate::handle_table::HandleTable;
pub use crate::heap::Heap;
pub use crate::heap::RecordRef;
pub use crate::property::PropertySlot;
pub use crate::proto_chain::ChainSearch;
pub use crate::proto_chain::ChainWalk;
pub use crate::proto_chain::MAX_PROTO_CHAIN_DEPTH;
pub use crate::record::Field;
pub use crate::record::FieldValue;
pub use crate::record::ObjectRecord;
pub use crate::record::Record;
pub use crate::record::RecordKind;
pub use crate::record::ShapeRecord;
pub use crate::record::OBJECT_ARRAY_COUNT;
pub use crate::record::OBJECT_ARRAY_VALUES;
pub use crate::record::OBJECT_CLASS_ID;
pub use crate::record::OBJECT_EXTENSIBLE;
pub use crate::record::OBJECT_FAST_ARRAY;
pub use crate::record::OBJECT_IMMUTABLE_PROTO;
pub use crate::record::OBJECT_IS_CONSTRUCTOR;
pub use crate::record::OBJECT_IS_EXOTIC;
pub use crate::record::OBJECT_PROPS;
pub use crate::record::OBJECT_SHAPE;
pub use crate::record::OBJECT_WEAKREF_COUNT;
pub use crate::record::SHAPE_DELETED_PROP_COUNT;
pub use crate::record::SHAPE_HASH;
pub use crate::record::SHAPE_HASH_NEXT;
pub use crate::record::SHAPE_IS_HASHED;
pub use crate::record::SHAPE_PROP_COUNT;
pub use crate::record::SHAPE_PROP_SIZE;
pub use crate::record::SHAPE_PROTO;
pub use crate::roots::RootId;
pub use crate::shape_table::shape_initial_hash;
pub use crate::shape_table::INITIAL_PROP_SIZE;
pub use crate::shared::SharedHeap;
pub use crate::stats::HeapStats;
pub use crate::stats::RecordCounts;
pub use crate::value::Value;
