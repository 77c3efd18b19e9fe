//! Uniquely-owning heap handle.
//!
//! The exclusive counterpart to `Shared`: one owner, moved rather than
//! copied, payload destroyed when the owner goes out of scope. Zero-sized
//! payloads never touch the allocator.

use crate::alloc::{Allocator, Global};
use crate::error::{handle_alloc_failure, AllocError};
use crate::shared::Shared;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

pub struct Unique<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    alloc: A,
    _owns: PhantomData<T>,
}

impl<T> Unique<T> {
    pub fn new(value: T) -> Self {
        Self::new_in(value, Global)
    }
}

impl<T, A: Allocator> Unique<T, A> {
    pub fn new_in(value: T, alloc: A) -> Self {
        match Self::try_new_in(value, alloc) {
            Ok(u) => u,
            Err(e) => handle_alloc_failure(e),
        }
    }

    pub fn try_new_in(value: T, alloc: A) -> Result<Self, AllocError> {
        let layout = Layout::new::<T>();
        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            alloc.allocate(layout)?.cast::<T>()
        };
        // Safety: valid for writes of T (dangling is fine for ZSTs).
        unsafe { ptr.as_ptr().write(value) };
        Ok(Self {
            ptr,
            alloc,
            _owns: PhantomData,
        })
    }

    /// Move the payload out and release the storage.
    pub fn into_inner(self) -> T {
        self.into_parts().0
    }

    /// Move the payload into a fresh RcBox from the same allocator.
    /// Out-of-memory is fatal.
    pub fn into_shared(self) -> Shared<T, A> {
        let (value, alloc) = self.into_parts();
        Shared::new_in(value, alloc)
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    fn into_parts(self) -> (T, A) {
        let this = ManuallyDrop::new(self);
        // Safety: both fields are read once and `this` is never dropped.
        unsafe {
            let value = ptr::read(this.ptr.as_ptr());
            let alloc = ptr::read(&this.alloc);
            release(this.ptr, &alloc);
            (value, alloc)
        }
    }
}

/// Return the storage behind `ptr` without touching its contents.
unsafe fn release<T, A: Allocator>(ptr: NonNull<T>, alloc: &A) {
    if mem::size_of::<T>() != 0 {
        alloc.deallocate(ptr.cast(), Layout::new::<T>());
    }
}

impl<T, A: Allocator> Drop for Unique<T, A> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            release(self.ptr, &self.alloc);
        }
    }
}

impl<T, A: Allocator> Deref for Unique<T, A> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: owned, initialized, and borrowed through &self.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, A: Allocator> DerefMut for Unique<T, A> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Unique<T, A> {
    fn clone(&self) -> Self {
        Unique::new_in((**self).clone(), self.alloc.clone())
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Unique<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: PartialEq, A: Allocator> PartialEq for Unique<T, A> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq, A: Allocator> Eq for Unique<T, A> {}
