//! DynArray: contiguous growable sequence over a `RawBuf`.
//!
//! Layout: slots `[0, len)` are initialized, `[len, cap)` are not. A full
//! array grows by asking its `GrowthPolicy` for a larger capacity, moving
//! the live prefix into a fresh block and releasing the old one. Capacity
//! only ever shrinks through `shrink_to_fit`.
//!
//! Failure boundaries
//! - Every growth path goes through `grow_for`, which either completes or
//!   leaves `len`, `cap` and the contents untouched.
//! - `try_*` methods hand allocation errors back; the plain methods treat
//!   them as fatal.
//! - Element drops can run user code. `len` is always updated before that
//!   code runs, so a panicking destructor never exposes a dropped slot.

use crate::alloc::{Allocator, Global};
use crate::error::{handle_alloc_failure, AllocError, IndexOutOfBounds, TryPushError};
use crate::policy::GrowthPolicy;
use crate::raw_buf::RawBuf;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::mem::ManuallyDrop;
use core::ops::{Index, IndexMut};
use core::ptr;
use core::slice;

pub struct DynArray<T, A: Allocator = Global> {
    buf: RawBuf<T, A>,
    len: usize,
    policy: GrowthPolicy,
}

impl<T> DynArray<T> {
    /// Empty array; nothing is allocated until the first push.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Empty array with room for `cap` elements. Out-of-memory is fatal.
    pub fn with_capacity(cap: usize) -> Self {
        Self::with_capacity_in(cap, Global)
    }

    pub fn with_policy(policy: GrowthPolicy) -> Self {
        let mut a = Self::new();
        a.policy = policy;
        a
    }

    /// Build from an initializer list; capacity is exactly `N`.
    pub fn from_array<const N: usize>(values: [T; N]) -> Self {
        let mut a = Self::with_capacity(N);
        for v in values {
            // Safety: capacity reserved above.
            unsafe { a.push_unchecked(v) };
        }
        a
    }

    pub fn from_elem(elem: T, n: usize) -> Self
    where
        T: Clone,
    {
        let mut a = Self::with_capacity(n);
        if n > 0 {
            for _ in 1..n {
                unsafe { a.push_unchecked(elem.clone()) };
            }
            unsafe { a.push_unchecked(elem) };
        }
        a
    }
}

impl<T, A: Allocator> DynArray<T, A> {
    pub const fn new_in(alloc: A) -> Self {
        Self {
            buf: RawBuf::new_in(alloc),
            len: 0,
            policy: GrowthPolicy::Doubling,
        }
    }

    pub fn with_capacity_in(cap: usize, alloc: A) -> Self {
        match Self::try_with_capacity_in(cap, alloc) {
            Ok(a) => a,
            Err(e) => handle_alloc_failure(e),
        }
    }

    pub fn try_with_capacity_in(cap: usize, alloc: A) -> Result<Self, AllocError> {
        Ok(Self {
            buf: RawBuf::try_with_capacity_in(cap, alloc)?,
            len: 0,
            policy: GrowthPolicy::Doubling,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: GrowthPolicy) {
        self.policy = policy;
    }

    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // Safety: [0, len) is initialized.
        unsafe { slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.ptr(), self.len) }
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Make room for `additional` more elements, growing per the policy.
    fn grow_for(&mut self, additional: usize) -> Result<(), AllocError> {
        let cap = self.capacity();
        let required = self
            .len
            .checked_add(additional)
            .ok_or(AllocError::CapacityOverflow)?;
        if required <= cap {
            return Ok(());
        }
        let new_cap = self
            .policy
            .next_capacity(cap, required)
            .ok_or(AllocError::CapacityOverflow)?;
        self.buf.try_relocate(self.len, new_cap)?;
        log::trace!(
            "dyn array grew {} -> {} (relocated {} elements)",
            cap,
            new_cap,
            self.len
        );
        Ok(())
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        self.grow_for(additional)
    }

    pub fn reserve(&mut self, additional: usize) {
        if let Err(e) = self.grow_for(additional) {
            handle_alloc_failure(e);
        }
    }

    /// Safety: `len < capacity`.
    #[inline]
    unsafe fn push_unchecked(&mut self, value: T) {
        debug_assert!(self.len < self.capacity());
        self.buf.ptr().add(self.len).write(value);
        self.len += 1;
    }

    /// Append `value`. Amortized O(1); a full array grows first.
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.len == self.capacity() {
            self.reserve(1);
        }
        unsafe { self.push_unchecked(value) }
    }

    /// Append `value`, handing it back if growth fails. The array is
    /// unchanged on failure.
    pub fn try_push(&mut self, value: T) -> Result<(), TryPushError<T>> {
        if self.len == self.capacity() {
            if let Err(error) = self.grow_for(1) {
                return Err(TryPushError { value, error });
            }
        }
        unsafe { self.push_unchecked(value) };
        Ok(())
    }

    /// Remove and return the last element; `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // Safety: slot `len` was initialized and is no longer part of the sequence.
        Some(unsafe { self.buf.ptr().add(self.len).read() })
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<(), IndexOutOfBounds> {
        if index < self.len {
            Ok(())
        } else {
            Err(IndexOutOfBounds {
                index,
                len: self.len,
            })
        }
    }

    pub fn get(&self, index: usize) -> Result<&T, IndexOutOfBounds> {
        self.check_index(index)?;
        Ok(unsafe { &*self.buf.ptr().add(index) })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, IndexOutOfBounds> {
        self.check_index(index)?;
        Ok(unsafe { &mut *self.buf.ptr().add(index) })
    }

    /// Overwrite the element at `index`, dropping the old one.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), IndexOutOfBounds> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Overwrite the element at `index` and return the old one.
    pub fn replace(&mut self, index: usize, value: T) -> Result<T, IndexOutOfBounds> {
        Ok(core::mem::replace(self.get_mut(index)?, value))
    }

    /// Insert at `index` (`0..=len`), shifting the tail right.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), IndexOutOfBounds> {
        if index > self.len {
            return Err(IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        if self.len == self.capacity() {
            self.reserve(1);
        }
        unsafe {
            let at = self.buf.ptr().add(index);
            ptr::copy(at, at.add(1), self.len - index);
            at.write(value);
        }
        self.len += 1;
        Ok(())
    }

    /// Remove the element at `index`, shifting the tail left.
    pub fn remove(&mut self, index: usize) -> Result<T, IndexOutOfBounds> {
        self.check_index(index)?;
        unsafe {
            let at = self.buf.ptr().add(index);
            let value = at.read();
            ptr::copy(at.add(1), at, self.len - index - 1);
            self.len -= 1;
            Ok(value)
        }
    }

    /// Drop every element past `new_len`; no-op if `new_len >= len`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        let tail = ptr::slice_from_raw_parts_mut(
            unsafe { self.buf.ptr().add(new_len) },
            self.len - new_len,
        );
        self.len = new_len;
        unsafe { ptr::drop_in_place(tail) };
    }

    pub fn clear(&mut self) {
        self.truncate(0)
    }

    /// Reallocate to exactly `len` slots (releasing the block when empty).
    pub fn try_shrink_to_fit(&mut self) -> Result<(), AllocError> {
        let cap = self.capacity();
        if cap == self.len {
            return Ok(());
        }
        self.buf.try_relocate(self.len, self.len)?;
        log::trace!("dyn array shrank {} -> {}", cap, self.len);
        Ok(())
    }

    pub fn shrink_to_fit(&mut self) {
        if let Err(e) = self.try_shrink_to_fit() {
            handle_alloc_failure(e);
        }
    }

    pub fn extend_from_slice(&mut self, other: &[T])
    where
        T: Clone,
    {
        self.reserve(other.len());
        for v in other {
            unsafe { self.push_unchecked(v.clone()) };
        }
    }
}

impl<T, A: Allocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        // Elements in index order; `buf` releases the block afterwards.
        unsafe { ptr::drop_in_place(self.as_mut_slice()) }
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for DynArray<T, A> {
    fn clone(&self) -> Self {
        let mut out = DynArray::with_capacity_in(self.len, self.allocator().clone());
        out.policy = self.policy;
        for v in self.iter() {
            unsafe { out.push_unchecked(v.clone()) };
        }
        out
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator, B: Allocator> PartialEq<DynArray<T, B>> for DynArray<T, A> {
    fn eq(&self, other: &DynArray<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for DynArray<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, A: Allocator, const N: usize> PartialEq<[T; N]> for DynArray<T, A> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Eq, A: Allocator> Eq for DynArray<T, A> {}

impl<T: Hash, A: Allocator> Hash for DynArray<T, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

/// Panicking index, like slices. Use `get`/`get_mut` for the checked form.
impl<T, A: Allocator> Index<usize> for DynArray<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T, A: Allocator> IndexMut<usize> for DynArray<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T, A: Allocator> AsRef<[T]> for DynArray<T, A> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> AsMut<[T]> for DynArray<T, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, const N: usize> From<[T; N]> for DynArray<T> {
    fn from(values: [T; N]) -> Self {
        Self::from_array(values)
    }
}

impl<T> FromIterator<T> for DynArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut a = DynArray::new();
        a.extend(iter);
        a
    }
}

impl<T, A: Allocator> Extend<T> for DynArray<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for v in iter {
            self.push(v);
        }
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a DynArray<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut DynArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T, A: Allocator> IntoIterator for DynArray<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        let this = ManuallyDrop::new(self);
        // Safety: `this` is never dropped, so the buffer moves out exactly once.
        let buf = unsafe { ptr::read(&this.buf) };
        IntoIter {
            buf,
            start: 0,
            end: this.len,
        }
    }
}

/// Owning iterator. Elements not yielded are dropped with the iterator.
pub struct IntoIter<T, A: Allocator = Global> {
    buf: RawBuf<T, A>,
    start: usize,
    end: usize,
}

impl<T, A: Allocator> IntoIter<T, A> {
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.ptr().add(self.start), self.end - self.start) }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let v = unsafe { self.buf.ptr().add(self.start).read() };
        self.start += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.start;
        (n, Some(n))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { self.buf.ptr().add(self.end).read() })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        let rest = ptr::slice_from_raw_parts_mut(
            unsafe { self.buf.ptr().add(self.start) },
            self.end - self.start,
        );
        self.start = self.end;
        unsafe { ptr::drop_in_place(rest) };
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

/// Build a `DynArray` from an initializer list, like `vec!`.
///
/// ```
/// use rc_heap::dyn_array;
/// let a = dyn_array![10, 20, 30];
/// assert_eq!(a.len(), 3);
/// assert_eq!(a.capacity(), 3);
/// let z = dyn_array![0u8; 4];
/// assert_eq!(z, [0, 0, 0, 0]);
/// ```
#[macro_export]
macro_rules! dyn_array {
    () => {
        $crate::DynArray::new()
    };
    ($elem:expr; $n:expr) => {
        $crate::DynArray::from_elem($elem, $n)
    };
    ($($x:expr),+ $(,)?) => {
        $crate::DynArray::from_array([$($x),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::TrackingAllocator;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records its id into a shared log when dropped.
    struct Tracked(u32, Rc<RefCell<Vec<u32>>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    /// Invariant: the observed capacity sequence from empty is 0, 1, 2, 4.
    #[test]
    fn push_capacity_sequence() {
        let mut a = DynArray::new();
        let mut caps = vec![a.capacity()];
        for v in [10, 20, 30] {
            a.push(v);
            caps.push(a.capacity());
        }
        assert_eq!(caps, [0, 1, 2, 4]);
        assert_eq!(a.len(), 3);
        assert_eq!((a[0], a[1], a[2]), (10, 20, 30));
    }

    /// Invariant: out-of-range access reports the index and len and has no effect.
    #[test]
    fn index_errors() {
        let mut a = DynArray::from([1, 2]);
        assert_eq!(a.get(2), Err(IndexOutOfBounds { index: 2, len: 2 }));
        assert_eq!(a.set(5, 9), Err(IndexOutOfBounds { index: 5, len: 2 }));
        assert_eq!(a.insert(3, 9), Err(IndexOutOfBounds { index: 3, len: 2 }));
        assert!(a.remove(2).is_err());
        assert_eq!(a, [1, 2]);
    }

    #[test]
    fn insert_and_remove_shift() {
        let mut a = DynArray::from([1, 3]);
        a.insert(1, 2).unwrap();
        a.insert(3, 4).unwrap();
        a.insert(0, 0).unwrap();
        assert_eq!(a, [0, 1, 2, 3, 4]);
        assert_eq!(a.remove(0), Ok(0));
        assert_eq!(a.remove(3), Ok(4));
        assert_eq!(a, [1, 2, 3]);
        assert_eq!(a.replace(1, 20), Ok(2));
        assert_eq!(a, [1, 20, 3]);
    }

    /// Invariant: truncate drops exactly the tail, in index order.
    #[test]
    fn truncate_drops_tail_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut a = DynArray::new();
        for i in 0..5 {
            a.push(Tracked(i, log.clone()));
        }
        a.truncate(2);
        assert_eq!(*log.borrow(), [2, 3, 4]);
        assert_eq!(a.len(), 2);
        assert_eq!(a.capacity(), 8);
        a.clear();
        assert_eq!(*log.borrow(), [2, 3, 4, 0, 1]);
    }

    /// Invariant: an owning iterator drops what it did not yield, and the
    /// buffer is released exactly once.
    #[test]
    fn into_iter_drops_remainder() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let t = TrackingAllocator::new();
        let mut a = DynArray::new_in(&t);
        for i in 0..4 {
            a.push(Tracked(i, log.clone()));
        }
        let mut it = a.into_iter();
        assert_eq!(it.len(), 4);
        let first = it.next().unwrap();
        let last = it.next_back().unwrap();
        assert_eq!((first.0, last.0), (0, 3));
        drop(it);
        assert_eq!(*log.borrow(), [1, 2]);
        assert_eq!(t.live_blocks(), 0);
        drop((first, last));
        assert_eq!(*log.borrow(), [1, 2, 0, 3]);
    }

    #[test]
    fn shrink_to_fit_releases_slack() {
        let t = TrackingAllocator::new();
        let mut a = DynArray::new_in(&t);
        for i in 0..5u64 {
            a.push(i);
        }
        assert_eq!(a.capacity(), 8);
        a.shrink_to_fit();
        assert_eq!(a.capacity(), 5);
        assert_eq!(t.live_bytes(), 40);
        a.clear();
        a.shrink_to_fit();
        assert_eq!(a.capacity(), 0);
        assert_eq!(t.live_blocks(), 0);
    }

    #[test]
    fn one_and_a_half_policy() {
        let mut a = DynArray::with_policy(GrowthPolicy::OneAndAHalf);
        let mut caps = Vec::new();
        for i in 0..7 {
            a.push(i);
            caps.push(a.capacity());
        }
        assert_eq!(caps, [1, 2, 3, 4, 6, 6, 9]);
    }

    #[test]
    fn clone_is_deep_and_exact() {
        let mut a = DynArray::new();
        for s in ["a", "b", "c"] {
            a.push(s.to_string());
        }
        let b = a.clone();
        a[0].push('!');
        assert_eq!(b.capacity(), 3);
        assert_eq!(b, ["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(a[0], "a!");
    }

    #[test]
    fn macro_forms() {
        let e: DynArray<i32> = dyn_array![];
        assert_eq!(e.capacity(), 0);
        let a = dyn_array![1, 2, 3,];
        assert_eq!(a, [1, 2, 3]);
        let z = dyn_array![String::from("x"); 3];
        assert_eq!(z.len(), 3);
        assert!(z.iter().all(|s| s == "x"));
        let none = dyn_array![String::new(); 0];
        assert!(none.is_empty());
    }

    #[test]
    fn zero_sized_elements() {
        let t = TrackingAllocator::new();
        let mut a = DynArray::new_in(&t);
        for _ in 0..100 {
            a.push(());
        }
        assert_eq!(a.len(), 100);
        assert_eq!(a.capacity(), 128);
        assert_eq!(a.pop(), Some(()));
        assert_eq!(t.stats().allocations, 0);
    }

    #[test]
    fn debug_and_collect() {
        let a: DynArray<u8> = (1..=3).collect();
        assert_eq!(format!("{a:?}"), "[1, 2, 3]");
        let mut b = DynArray::new();
        b.extend_from_slice(&[1u8, 2]);
        b.extend([3u8]);
        assert_eq!(a, b);
    }
}
