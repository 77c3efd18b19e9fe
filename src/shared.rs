//! RcBox control block and the count-tracked `Shared` handle.
//!
//! One heap block per shared value: `RcBox { count, value }`. Each live
//! `Shared` is one unit of `count`. Cloning a handle increments, dropping
//! decrements; the drop that brings the count to zero runs the payload's
//! drop glue and returns the block to the allocator that produced it.
//!
//! Use-after-free and double-drop are ruled out by ownership: a dropped
//! handle has been moved into `drop` and cannot be named again.

use crate::alloc::{Allocator, Global};
use crate::count::RefCount;
use crate::error::{handle_alloc_failure, AllocError};
use core::alloc::Layout;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::Deref;
use core::ptr::{self, NonNull};

/// Heap control block: live-handle counter plus payload.
struct RcBox<T> {
    count: RefCount,
    value: T,
}

/// Shared, reference-counted handle to a heap value.
///
/// `!Send`/`!Sync`: the count is a plain `Cell` (the `NonNull` field already
/// opts out of both auto traits).
pub struct Shared<T, A: Allocator = Global> {
    ptr: NonNull<RcBox<T>>,
    alloc: A,
    _owns: PhantomData<RcBox<T>>,
}

impl<T> Shared<T> {
    /// Allocate a box holding `value` with count 1. Out-of-memory is fatal.
    pub fn new(value: T) -> Self {
        Self::new_in(value, Global)
    }

    pub fn try_new(value: T) -> Result<Self, AllocError> {
        Self::try_new_in(value, Global)
    }
}

impl<T, A: Allocator> Shared<T, A> {
    pub fn new_in(value: T, alloc: A) -> Self {
        match Self::try_new_in(value, alloc) {
            Ok(s) => s,
            Err(e) => handle_alloc_failure(e),
        }
    }

    /// Allocate a box from `alloc`. On failure `value` is dropped and the
    /// error returned; nothing else is touched.
    pub fn try_new_in(value: T, alloc: A) -> Result<Self, AllocError> {
        let raw = alloc.allocate(Self::layout())?.cast::<RcBox<T>>();
        // Safety: freshly allocated for exactly this layout.
        unsafe {
            raw.as_ptr().write(RcBox {
                count: RefCount::one(),
                value,
            })
        };
        Ok(Self {
            ptr: raw,
            alloc,
            _owns: PhantomData,
        })
    }

    #[inline]
    fn layout() -> Layout {
        Layout::new::<RcBox<T>>()
    }

    #[inline]
    fn inner(&self) -> &RcBox<T> {
        // Safety: the box stays allocated while any handle (self) exists.
        unsafe { self.ptr.as_ref() }
    }

    /// Shared access to the payload; valid for as long as the handle is.
    #[inline]
    pub fn get(this: &Self) -> &T {
        &this.inner().value
    }

    /// Mutable access when `this` is the only handle; `None` otherwise.
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        if this.inner().count.get() == 1 {
            // Safety: unique handle and `&mut self`, so no other reference exists.
            Some(unsafe { &mut (*this.ptr.as_ptr()).value })
        } else {
            None
        }
    }

    /// Number of live handles to this box.
    pub fn strong_count(this: &Self) -> usize {
        this.inner().count.get()
    }

    /// True if both handles alias the same box.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }

    pub fn as_ptr(this: &Self) -> *const T {
        // Safety: pointer projection only, no read.
        unsafe { ptr::addr_of!((*this.ptr.as_ptr()).value) }
    }

    pub fn allocator(this: &Self) -> &A {
        &this.alloc
    }

    /// Move the payload out if `this` is the only handle, releasing the box.
    /// Otherwise hand the handle back untouched.
    pub fn try_unwrap(this: Self) -> Result<T, Self> {
        if this.inner().count.get() != 1 {
            return Err(this);
        }
        let this = ManuallyDrop::new(this);
        // Safety: last handle; the value is read exactly once and the block
        // released without running drop glue on it again.
        unsafe {
            let value = ptr::read(ptr::addr_of!((*this.ptr.as_ptr()).value));
            let alloc = ptr::read(&this.alloc);
            alloc.deallocate(this.ptr.cast(), Self::layout());
            Ok(value)
        }
    }

    /// Like `try_unwrap`, but drops the handle when it is not the last one.
    pub fn into_inner(this: Self) -> Option<T> {
        Self::try_unwrap(this).ok()
    }
}

impl<T: Clone, A: Allocator + Clone> Shared<T, A> {
    /// Clone-on-write: if other handles exist, detach `this` onto a fresh box
    /// holding a clone of the payload, then return mutable access.
    pub fn make_mut(this: &mut Self) -> &mut T {
        if this.inner().count.get() != 1 {
            let fresh = Shared::new_in(Self::get(this).clone(), this.alloc.clone());
            *this = fresh;
        }
        // Safety: `this` is now the only handle.
        unsafe { &mut (*this.ptr.as_ptr()).value }
    }
}

impl<T, A: Allocator + Clone> Clone for Shared<T, A> {
    /// Alias the same box; count + 1, no allocation.
    #[inline]
    fn clone(&self) -> Self {
        self.inner().count.inc();
        Self {
            ptr: self.ptr,
            alloc: self.alloc.clone(),
            _owns: PhantomData,
        }
    }
}

impl<T, A: Allocator> Drop for Shared<T, A> {
    fn drop(&mut self) {
        if !self.inner().count.dec() {
            return;
        }
        // Last handle: no reference into the box can exist past this point.
        unsafe {
            ptr::drop_in_place(ptr::addr_of_mut!((*self.ptr.as_ptr()).value));
            self.alloc.deallocate(self.ptr.cast(), Self::layout());
        }
        log::trace!("released rc box at {:p}", self.ptr);
    }
}

impl<T, A: Allocator> Deref for Shared<T, A> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner().value
    }
}

impl<T, A: Allocator> AsRef<T> for Shared<T, A> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, A: Allocator> Borrow<T> for Shared<T, A> {
    fn borrow(&self) -> &T {
        self
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Shared::new(value)
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Shared::new(T::default())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Shared<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: fmt::Display, A: Allocator> fmt::Display for Shared<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// Equality and hashing go by value; use `Shared::ptr_eq` for identity.
impl<T: PartialEq, A: Allocator> PartialEq for Shared<T, A> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq, A: Allocator> Eq for Shared<T, A> {}

impl<T: Hash, A: Allocator> Hash for Shared<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state)
    }
}
