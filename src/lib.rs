//! rc-heap: single-threaded reference-counted boxes and a growable array,
//! both drawing memory from a pluggable allocator.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: small heap runtime with deterministic destruction. A value is
//!   destroyed at a point fixed by ownership: the last `Shared` drop, the
//!   `Unique` owner leaving scope, or its `DynArray` being truncated or
//!   dropped.
//! - Layers:
//!   - Allocator: the only source of memory. `Global` forwards to the
//!     process allocator; `TrackingAllocator` records every block and can
//!     simulate exhaustion.
//!   - Handles: `Unique<T, A>` owns one heap value exclusively;
//!     `Shared<T, A>` is one of several aliases of an RcBox (count + value).
//!   - RawBuf<T, A>: owns an uninitialized block of `cap` slots and knows how
//!     to relocate a prefix into a larger or smaller block.
//!   - DynArray<T, A>: tracks the initialized prefix `[0, len)` over a
//!     RawBuf and grows it geometrically per its `GrowthPolicy`.
//!
//! Constraints
//! - Single-threaded: `Shared`, `Unique` and `DynArray` are `!Send`/`!Sync`
//!   (no atomics).
//! - Handles are moved, never implicitly copied; a dropped handle cannot be
//!   named again, so use-after-free and double-drop do not compile.
//! - Failed allocation never mutates the container it was made for.
//! - Zero-sized payloads and empty buffers never reach the allocator.
//!
//! Overflow semantics
//! - Reference-count overflow aborts the process, matching `Rc`. Underflow
//!   cannot happen through the public API and is only debug-asserted.
//! - Capacity arithmetic is checked and surfaces as
//!   `AllocError::CapacityOverflow`.
//!
//! Error policy
//! - Plain constructors and `push`/`reserve` treat allocation failure as
//!   fatal (`handle_alloc_error` for out-of-memory, panic for capacity
//!   overflow). Each has a `try_` twin returning `AllocError`.
//! - Element access returns `IndexOutOfBounds`; `Index`/`IndexMut` panic
//!   like slices. Popping an empty array is `None`, not an error.
//!
//! Notes and non-goals
//! - No cycle collection: a cycle of `Shared` handles leaks.
//! - No weak handles.
//! - No automatic shrinking; `shrink_to_fit` is explicit.

mod alloc;
mod count;
mod dyn_array;
mod error;
mod policy;
mod raw_buf;
mod shared;
mod unique;

// Public surface
pub use alloc::{AllocStats, Allocator, Global, TrackingAllocator};
pub use dyn_array::{DynArray, IntoIter};
pub use error::{AllocError, IndexOutOfBounds, TryPushError};
pub use policy::GrowthPolicy;
pub use shared::Shared;
pub use unique::Unique;
