//! Buffer ownership helpers shared by both sides of the boundary.
//!
//! Two rules govern every buffer that crosses:
//!
//! - Borrowed buffers (message input, code, log data) are valid only for
//!   the duration of the call that carries them.
//! - A result with a release function owns its output until that function
//!   is called, exactly once, by the receiver. [`OwnedResult`] encodes this.

use crate::error::CodecError;
use crate::ffi::RawResult;

/// View a `(pointer, length)` pair as a slice.
///
/// A zero length yields an empty slice regardless of the pointer. A null
/// pointer with a non-zero length is rejected.
///
/// # Safety
///
/// If `len > 0` and `data` is non-null, `data` must be valid for reads of
/// `len` bytes for the whole of `'a`.
pub unsafe fn borrowed_slice<'a>(data: *const u8, len: usize) -> Result<&'a [u8], CodecError> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(CodecError::NullData(len));
    }
    Ok(core::slice::from_raw_parts(data, len))
}

/// Mutable counterpart of [`borrowed_slice`].
///
/// # Safety
///
/// If `len > 0` and `data` is non-null, `data` must be valid for writes of
/// `len` bytes and not aliased for the whole of `'a`.
pub unsafe fn borrowed_slice_mut<'a>(
    data: *mut u8,
    len: usize,
) -> Result<&'a mut [u8], CodecError> {
    if len == 0 {
        return Ok(&mut []);
    }
    if data.is_null() {
        return Err(CodecError::NullData(len));
    }
    Ok(core::slice::from_raw_parts_mut(data, len))
}

/// Copy `source[offset..]` into `dest`, as much as fits.
///
/// Returns the number of bytes written: `min(dest.len(), source.len() - offset)`,
/// or zero when `offset` is at or past the end of `source`. Bytes of `dest`
/// beyond the returned count are left untouched.
pub fn copy_window(source: &[u8], offset: usize, dest: &mut [u8]) -> usize {
    let Some(tail) = source.get(offset..) else {
        return 0;
    };
    let n = tail.len().min(dest.len());
    dest[..n].copy_from_slice(&tail[..n]);
    n
}

/// A result received from the other side of the boundary.
///
/// Calls the attached release function once, when dropped.
#[derive(Debug)]
pub struct OwnedResult {
    raw: RawResult,
}

impl OwnedResult {
    /// Take ownership of a received result.
    ///
    /// # Safety
    ///
    /// `raw` must come straight from the producer and must not have been
    /// released, or wrapped in another `OwnedResult`.
    pub unsafe fn from_raw(raw: RawResult) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &RawResult {
        &self.raw
    }

    /// The output buffer, valid until this value is dropped.
    pub fn output(&self) -> Result<&[u8], CodecError> {
        // SAFETY: the producer guarantees output_data/output_size describe a
        // live buffer until release, and release only runs in Drop.
        unsafe { borrowed_slice(self.raw.output_data, self.raw.output_size) }
    }
}

impl Drop for OwnedResult {
    fn drop(&mut self) {
        if let Some(release) = self.raw.release.take() {
            // SAFETY: `take` guarantees this runs at most once; the pointer
            // refers to the same result the producer filled in.
            unsafe { release(&self.raw) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_copy_window_bounds() {
        let code: Vec<u8> = (0u8..10).collect();
        for offset in 0..=12 {
            for size in 0..=12 {
                let mut buf = vec![0xee; size];
                let n = copy_window(&code, offset, &mut buf);
                let expected = size.min(code.len().saturating_sub(offset));
                assert_eq!(n, expected, "offset={offset} size={size}");
                assert_eq!(&buf[..n], &code[offset.min(10)..offset.min(10) + n]);
                assert!(buf[n..].iter().all(|b| *b == 0xee));
            }
        }
    }

    #[test]
    fn test_copy_window_huge_offset() {
        let mut buf = [0u8; 4];
        assert_eq!(copy_window(b"abc", usize::MAX, &mut buf), 0);
    }

    #[test]
    fn test_borrowed_slice_null_handling() {
        let empty = unsafe { borrowed_slice(core::ptr::null(), 0) }.unwrap();
        assert!(empty.is_empty());
        let err = unsafe { borrowed_slice(core::ptr::null(), 3) }.unwrap_err();
        assert_eq!(err, CodecError::NullData(3));

        let data = [1u8, 2, 3];
        let view = unsafe { borrowed_slice(data.as_ptr(), 2) }.unwrap();
        assert_eq!(view, &[1, 2]);
    }

    static RELEASES: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_release(result: *const RawResult) {
        assert_eq!((*result).output_size, 5);
        RELEASES.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_owned_result_releases_once() {
        let data = b"hello";
        let mut raw = RawResult::empty(0, 0);
        raw.output_data = data.as_ptr();
        raw.output_size = data.len();
        raw.release = Some(count_release);

        let before = RELEASES.load(Ordering::SeqCst);
        let owned = unsafe { OwnedResult::from_raw(raw) };
        assert_eq!(owned.output().unwrap(), b"hello");
        drop(owned);
        assert_eq!(RELEASES.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_owned_result_without_release() {
        let owned = unsafe { OwnedResult::from_raw(RawResult::empty(1, 0)) };
        assert!(owned.output().unwrap().is_empty());
    }
}
