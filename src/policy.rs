//! Capacity growth policy for `DynArray`.

/// How a full `DynArray` picks its next capacity.
///
/// Both policies are geometric, so N pushes relocate O(N) elements in total.
/// The result is never below the capacity actually required.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GrowthPolicy {
    /// `max(1, 2 * cap)`: 0, 1, 2, 4, 8, ...
    #[default]
    Doubling,
    /// `max(cap + 1, cap + cap / 2)`: 0, 1, 2, 3, 4, 6, 9, ...
    /// Less reserved-but-unused memory, more frequent relocation.
    OneAndAHalf,
}

impl GrowthPolicy {
    /// Next capacity for a buffer of `cap` that must hold at least `required`
    /// elements. `None` if the arithmetic overflows.
    pub fn next_capacity(self, cap: usize, required: usize) -> Option<usize> {
        let grown = match self {
            GrowthPolicy::Doubling => cap.checked_mul(2)?.max(1),
            GrowthPolicy::OneAndAHalf => cap.checked_add(cap / 2)?.max(cap.checked_add(1)?),
        };
        Some(grown.max(required))
    }
}
