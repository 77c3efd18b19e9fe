//! Single-threaded reference counter for RcBox control blocks.

use core::cell::Cell;

/// Live-handle counter. Not atomic; the owning handle type is `!Send`.
#[derive(Debug)]
pub(crate) struct RefCount {
    count: Cell<usize>,
}

impl RefCount {
    /// A counter for a freshly created box: one handle exists.
    #[inline]
    pub(crate) const fn one() -> Self {
        Self {
            count: Cell::new(1),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.count.get()
    }

    /// Register one more handle.
    #[inline]
    pub(crate) fn inc(&self) {
        let n = self.count.get().wrapping_add(1);
        self.count.set(n);
        if n == 0 {
            // Follow Rc semantics: abort on overflow rather than continue unsafely.
            std::process::abort();
        }
    }

    /// Unregister one handle. Returns true if that was the last one.
    #[inline]
    pub(crate) fn dec(&self) -> bool {
        let c = self.count.get();
        debug_assert!(c > 0, "RefCount underflow");
        let n = c - 1;
        self.count.set(n);
        n == 0
    }
}
