//! Alignment and measurement helpers
//!
//! Pure functions shared by every allocation strategy in the crate.

/// Returns `true` if `align` is a power of two greater than zero.
///
/// # Examples
/// ```
/// use tessera_memory::utils::is_valid_alignment;
///
/// assert!(is_valid_alignment(1));
/// assert!(is_valid_alignment(64));
/// assert!(!is_valid_alignment(0));
/// assert!(!is_valid_alignment(24));
/// ```
#[inline(always)]
pub const fn is_valid_alignment(align: usize) -> bool {
    align != 0 && (align & (align - 1)) == 0
}

/// Smallest address `>= addr` that is a multiple of `align`.
///
/// # Panics
/// Panics if `align` is not a power of two greater than zero. Alignment is
/// a programming contract, not a recoverable condition.
///
/// # Examples
/// ```
/// use tessera_memory::utils::align_forward;
///
/// assert_eq!(align_forward(7, 8), 8);
/// assert_eq!(align_forward(8, 8), 8);
/// assert_eq!(align_forward(9, 8), 16);
/// assert_eq!(align_forward(13, 1), 13);
/// ```
#[inline(always)]
pub const fn align_forward(addr: usize, align: usize) -> usize {
    addr + padding_needed(addr, align)
}

/// Bytes needed to move `addr` forward to the next multiple of `align`.
///
/// Never overflows: the result is always below `align`.
///
/// # Panics
/// Panics if `align` is not a power of two greater than zero.
///
/// # Examples
/// ```
/// use tessera_memory::utils::padding_needed;
///
/// assert_eq!(padding_needed(7, 8), 1);
/// assert_eq!(padding_needed(8, 8), 0);
/// assert_eq!(padding_needed(9, 8), 7);
/// ```
#[inline(always)]
pub const fn padding_needed(addr: usize, align: usize) -> usize {
    assert!(
        is_valid_alignment(align),
        "alignment must be a power of 2 greater than 0"
    );
    addr.wrapping_neg() & (align - 1)
}

/// Checks if `addr` is a multiple of `align`
#[inline(always)]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    debug_assert!(is_valid_alignment(align));
    addr & (align - 1) == 0
}

/// Check if a pointer is properly aligned
#[inline(always)]
pub fn is_aligned_ptr<T>(ptr: *const T, align: usize) -> bool {
    is_aligned(ptr as usize, align)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_validation() {
        for shift in 0..usize::BITS {
            assert!(is_valid_alignment(1usize << shift));
        }
        for bad in [0, 3, 6, 12, 24, 100] {
            assert!(!is_valid_alignment(bad));
        }
    }

    #[test]
    fn test_align_forward_is_smallest_multiple() {
        for align in [1usize, 2, 4, 8, 16, 64, 4096] {
            for addr in 0..256usize {
                let aligned = align_forward(addr, align);
                assert!(aligned >= addr);
                assert_eq!(aligned % align, 0);
                assert!(aligned - addr < align);
            }
        }
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding_needed(0, 16), 0);
        assert_eq!(padding_needed(1, 16), 15);
        assert_eq!(padding_needed(17, 4), 3);
    }

    #[test]
    #[should_panic(expected = "alignment must be a power of 2")]
    fn test_align_forward_rejects_zero() {
        let _ = align_forward(10, 0);
    }

    #[test]
    #[should_panic(expected = "alignment must be a power of 2")]
    fn test_align_forward_rejects_non_power_of_two() {
        let _ = align_forward(10, 12);
    }

    #[test]
    fn test_is_aligned_ptr() {
        let value = 0u64;
        assert!(is_aligned_ptr(&raw const value, core::mem::align_of::<u64>()));
    }
}
