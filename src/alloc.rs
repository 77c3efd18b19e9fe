//! Allocator collaborator.
//!
//! The containers in this crate never call `std::alloc` directly; they go
//! through [`Allocator`]. Two implementations ship with the crate:
//! - [`Global`]: the process allocator.
//! - [`TrackingAllocator`]: a wrapper that records every block it hands out,
//!   can refuse requests past a byte limit, and panics on deallocation of a
//!   block it does not know about.
//!
//! Zero-sized requests never reach an allocator: callers substitute a
//! dangling, aligned pointer instead.

use crate::error::AllocError;
use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::ptr::NonNull;
use hashbrown::HashMap;

/// Source of raw memory blocks.
///
/// Implementations must hand out blocks that stay valid and exclusively
/// reserved until passed back to `deallocate`.
pub trait Allocator {
    /// Allocate a block for `layout`. `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Release a block.
    ///
    /// # Safety
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not have been deallocated since.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

/// The process allocator (`std::alloc`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Global;

impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0, "zero-sized allocation request");
        // Safety: layout has non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        NonNull::new(raw).ok_or(AllocError::OutOfMemory { layout })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

/// Counters kept by [`TrackingAllocator`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AllocStats {
    pub allocations: usize,
    pub deallocations: usize,
    pub failures: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
}

impl AllocStats {
    /// Blocks handed out and not yet returned.
    pub fn live_blocks(&self) -> usize {
        self.allocations - self.deallocations
    }
}

/// Instrumented allocator wrapper.
///
/// Single-threaded like the rest of the crate; share it between containers
/// by reference (`&TrackingAllocator` is itself an [`Allocator`]).
#[derive(Debug)]
pub struct TrackingAllocator<A: Allocator = Global> {
    inner: A,
    limit: Cell<Option<usize>>,
    stats: Cell<AllocStats>,
    // address -> layout of every block currently handed out
    live: RefCell<HashMap<usize, Layout>>,
}

impl TrackingAllocator<Global> {
    pub fn new() -> Self {
        Self::wrapping(Global)
    }

    /// Tracker that refuses any request that would push live bytes past `bytes`.
    pub fn with_limit(bytes: usize) -> Self {
        let t = Self::new();
        t.set_limit(Some(bytes));
        t
    }
}

impl Default for TrackingAllocator<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator> TrackingAllocator<A> {
    pub fn wrapping(inner: A) -> Self {
        Self {
            inner,
            limit: Cell::new(None),
            stats: Cell::new(AllocStats::default()),
            live: RefCell::new(HashMap::new()),
        }
    }

    pub fn set_limit(&self, limit: Option<usize>) {
        self.limit.set(limit);
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit.get()
    }

    pub fn stats(&self) -> AllocStats {
        self.stats.get()
    }

    pub fn live_bytes(&self) -> usize {
        self.stats.get().live_bytes
    }

    pub fn live_blocks(&self) -> usize {
        self.live.borrow().len()
    }

    /// True if `ptr` is a block currently handed out by this tracker.
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        self.live.borrow().contains_key(&(ptr.as_ptr() as usize))
    }
}

impl<A: Allocator> Allocator for TrackingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let mut stats = self.stats.get();
        let over_limit = match self.limit.get() {
            Some(limit) => stats
                .live_bytes
                .checked_add(layout.size())
                .map_or(true, |total| total > limit),
            None => false,
        };
        let result = if over_limit {
            log::debug!(
                "tracking allocator refused {} bytes ({} live, limit {:?})",
                layout.size(),
                stats.live_bytes,
                self.limit.get()
            );
            Err(AllocError::OutOfMemory { layout })
        } else {
            self.inner.allocate(layout)
        };
        match result {
            Ok(ptr) => {
                stats.allocations += 1;
                stats.live_bytes += layout.size();
                stats.peak_bytes = stats.peak_bytes.max(stats.live_bytes);
                self.live.borrow_mut().insert(ptr.as_ptr() as usize, layout);
            }
            Err(_) => stats.failures += 1,
        }
        self.stats.set(stats);
        result
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let recorded = self.live.borrow_mut().remove(&(ptr.as_ptr() as usize));
        match recorded {
            Some(l) => assert_eq!(l, layout, "deallocate called with a mismatched layout"),
            None => panic!("deallocate called on a block that is not live: {:p}", ptr),
        }
        let mut stats = self.stats.get();
        stats.deallocations += 1;
        stats.live_bytes -= layout.size();
        self.stats.set(stats);
        self.inner.deallocate(ptr, layout)
    }
}
