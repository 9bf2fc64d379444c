use std::ops::Range;

use crate::utils::error::{ApngError, ApngResult};

/// Bounds-checked slice access that reports violations as [`ApngError::BufferTooSmall`]
/// instead of panicking.
pub(crate) trait SafeAccess<T> {
    fn get_range_safe(&self, range: Range<usize>) -> ApngResult<&[T]>;
    fn get_range_mut_safe(&mut self, range: Range<usize>) -> ApngResult<&mut [T]>;
    fn check_range(&self, range: Range<usize>) -> ApngResult<()>;
}

impl<T> SafeAccess<T> for [T] {
    /// Retrieves a sub-slice.
    ///
    /// # Errors
    ///
    /// Returns `BufferTooSmall` when `range.end` exceeds the slice length, and `Custom` when the
    /// range is inverted.
    fn get_range_safe(&self, range: Range<usize>) -> ApngResult<&[T]> {
        self.check_range(range.clone())?;
        Ok(&self[range])
    }

    /// Mutable counterpart of [`SafeAccess::get_range_safe`].
    fn get_range_mut_safe(&mut self, range: Range<usize>) -> ApngResult<&mut [T]> {
        self.check_range(range.clone())?;
        Ok(&mut self[range])
    }

    /// Checks a range without retrieving the elements.
    fn check_range(&self, range: Range<usize>) -> ApngResult<()> {
        if range.start > range.end {
            return Err(ApngError::Custom(format!(
                "Invalid range {}..{}",
                range.start, range.end
            )));
        }

        if range.end > self.len() {
            return Err(ApngError::BufferTooSmall {
                required: range.end,
                actual: self.len(),
            });
        }

        Ok(())
    }
}
