//! Error types shared by the allocator, `Shared`, `Unique` and `DynArray`.

use core::alloc::Layout;
use core::fmt;
use thiserror::Error;

/// Error type for APIs with fallible heap allocation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum AllocError {
    /// The allocator could not satisfy the request.
    #[error("out of memory: allocator refused {} bytes (align {})", .layout.size(), .layout.align())]
    OutOfMemory {
        /// The layout that was passed to the allocator.
        layout: Layout,
    },
    /// Size computation overflowed `isize::MAX`.
    #[error("capacity overflow")]
    CapacityOverflow,
}

/// An index outside `[0, len)` was passed to an element accessor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("index out of bounds: the len is {len} but the index is {index}")]
pub struct IndexOutOfBounds {
    pub index: usize,
    pub len: usize,
}

/// Returned by `DynArray::try_push` when growth failed. Carries the value
/// back so the caller keeps ownership of it.
pub struct TryPushError<T> {
    pub value: T,
    pub error: AllocError,
}

impl<T> TryPushError<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryPushError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push failed: {}", self.error)
    }
}

impl<T> std::error::Error for TryPushError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Fatal path for the infallible entry points: out-of-memory goes to the
/// process-wide handler, capacity overflow panics.
#[cold]
#[inline(never)]
pub(crate) fn handle_alloc_failure(err: AllocError) -> ! {
    match err {
        AllocError::OutOfMemory { layout } => std::alloc::handle_alloc_error(layout),
        AllocError::CapacityOverflow => panic!("capacity overflow"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let oom = AllocError::OutOfMemory { layout };
        assert_eq!(
            oom.to_string(),
            "out of memory: allocator refused 64 bytes (align 8)"
        );
        let oob = IndexOutOfBounds { index: 3, len: 3 };
        assert_eq!(
            oob.to_string(),
            "index out of bounds: the len is 3 but the index is 3"
        );
    }

    #[test]
    fn try_push_error_returns_value() {
        let e = TryPushError {
            value: String::from("kept"),
            error: AllocError::CapacityOverflow,
        };
        assert_eq!(e.to_string(), "push failed: capacity overflow");
        assert_eq!(e.into_inner(), "kept");
    }
}
