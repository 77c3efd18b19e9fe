//! RawBuf: capacity and allocation bookkeeping beneath `DynArray`.
//!
//! Owns a block of `cap` uninitialized `T` slots and nothing else: it never
//! reads, writes or drops elements. `DynArray` tracks which prefix is live.

use crate::alloc::Allocator;
use crate::error::AllocError;
use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

pub(crate) struct RawBuf<T, A: Allocator> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

impl<T, A: Allocator> RawBuf<T, A> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// Empty buffer: cap 0, dangling pointer, no allocation.
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            alloc,
            _owns: PhantomData,
        }
    }

    pub(crate) fn try_with_capacity_in(cap: usize, alloc: A) -> Result<Self, AllocError> {
        let mut buf = Self::new_in(alloc);
        buf.ptr = buf.allocate_block(cap)?;
        buf.cap = cap;
        Ok(buf)
    }

    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    fn allocate_block(&self, cap: usize) -> Result<NonNull<T>, AllocError> {
        if cap == 0 || Self::IS_ZST {
            return Ok(NonNull::dangling());
        }
        let layout = Layout::array::<T>(cap).map_err(|_| AllocError::CapacityOverflow)?;
        Ok(self.alloc.allocate(layout)?.cast())
    }

    /// Move the first `len` slots into a fresh block of `new_cap` slots, in
    /// index order, then release the old block.
    ///
    /// On error the buffer is left exactly as it was.
    pub(crate) fn try_relocate(&mut self, len: usize, new_cap: usize) -> Result<(), AllocError> {
        debug_assert!(len <= self.cap && len <= new_cap);
        let fresh = self.allocate_block(new_cap)?;
        // Safety: distinct blocks, both valid for `len` elements.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), fresh.as_ptr(), len);
            self.release();
        }
        self.ptr = fresh;
        self.cap = new_cap;
        Ok(())
    }

    /// Give the block back. Caller must reset `ptr`/`cap` or never touch them again.
    unsafe fn release(&mut self) {
        if self.cap == 0 || Self::IS_ZST {
            return;
        }
        // Safety: this layout was valid when the block was allocated.
        let layout =
            Layout::from_size_align_unchecked(mem::size_of::<T>() * self.cap, mem::align_of::<T>());
        self.alloc.deallocate(self.ptr.cast(), layout);
    }
}

impl<T, A: Allocator> Drop for RawBuf<T, A> {
    fn drop(&mut self) {
        unsafe { self.release() }
    }
}
