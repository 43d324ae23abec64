// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Byte buffers allocated by OpenSSL.

use std::{ffi::c_void, fmt, ptr};

use crate::{
    error::{Error, Result},
    ffi,
};

/// Unowned view of `len` elements starting at `data`.
///
/// Produced by [`OwnedBuffer::view`] and [`OwnedBuffer::release`].  It does
/// not free anything.
#[derive(Debug)]
pub struct Buffer<T> {
    /// Start of the region, null when `len` is zero.
    pub data: *mut T,
    /// Number of elements.
    pub len: usize,
}

impl<T> Buffer<T> {
    /// The empty view.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Buffer<T> {}

/// A byte buffer owned through OpenSSL's allocator.
///
/// The memory is wiped before it is freed.  A buffer of length zero holds
/// no allocation.
pub struct OwnedBuffer {
    data: *mut u8,
    len: usize,
}

impl OwnedBuffer {
    /// The buffer holding nothing.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }

    /// Allocates `len` zeroed bytes.
    pub fn alloc(len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self::empty());
        }

        let data = unsafe { ffi::OPENSSL_zalloc(len) };
        if data.is_null() {
            return Err(bherror::Error::root(Error::Allocation)
                .ctx(format!("unable to allocate {len} bytes")));
        }

        Ok(Self {
            data: data.cast(),
            len,
        })
    }

    /// Takes ownership of `len` bytes at `data`.
    ///
    /// # Safety
    ///
    /// `data` must be null or come from OpenSSL's allocator and hold at
    /// least `len` bytes.  A non-null `data` with `len` zero is freed.
    pub unsafe fn from_raw(data: *mut c_void, len: usize) -> Self {
        if data.is_null() {
            return Self::empty();
        }
        if len == 0 {
            ffi::OPENSSL_free(data);
            return Self::empty();
        }
        Self {
            data: data.cast(),
            len,
        }
    }

    /// Frees the current allocation and takes ownership of `data`.
    ///
    /// # Safety
    ///
    /// Same contract as [`OwnedBuffer::from_raw`].
    pub unsafe fn reset(&mut self, data: *mut c_void, len: usize) {
        self.clear();
        *self = Self::from_raw(data, len);
    }

    /// Wipes and frees the allocation, leaving the buffer empty.
    pub fn clear(&mut self) {
        if !self.data.is_null() {
            unsafe { ffi::OPENSSL_clear_free(self.data.cast(), self.len) };
        }
        self.data = ptr::null_mut();
        self.len = 0;
    }

    /// Gives up ownership.  The caller must free the returned region with
    /// OpenSSL's allocator.
    #[must_use = "the released buffer leaks unless freed"]
    pub fn release(&mut self) -> Buffer<c_void> {
        let buffer = self.view();
        self.data = ptr::null_mut();
        self.len = 0;
        buffer
    }

    /// Unowned view of the allocation.
    pub fn view(&self) -> Buffer<c_void> {
        Buffer {
            data: self.data.cast(),
            len: self.len,
        }
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the buffer holds an allocation.
    pub fn is_some(&self) -> bool {
        !self.data.is_null()
    }

    /// The bytes.
    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
    }

    /// The bytes, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.data.is_null() {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.data, self.len) }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.data
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Default for OwnedBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

impl AsRef<[u8]> for OwnedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for OwnedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents may be key material.
        f.debug_struct("OwnedBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

unsafe impl Send for OwnedBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_zeroed() {
        let buffer = OwnedBuffer::alloc(32).unwrap();

        assert!(buffer.is_some());
        assert_eq!(buffer.len(), 32);
        assert!(buffer.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alloc_zero_holds_nothing() {
        let buffer = OwnedBuffer::alloc(0).unwrap();

        assert!(!buffer.is_some());
        assert!(buffer.is_empty());
        assert_eq!(buffer.as_slice(), &[] as &[u8]);
        let view = buffer.view();
        assert!(view.data.is_null());
        assert_eq!(view.len, 0);
    }

    #[test]
    fn test_adopting_zero_length_allocation_frees_it() {
        let raw = OwnedBuffer::alloc(16).unwrap().release();

        let adopted = unsafe { OwnedBuffer::from_raw(raw.data, 0) };

        assert!(!adopted.is_some());
        assert!(adopted.is_empty());
        assert!(adopted.view().data.is_null());
    }

    #[test]
    fn test_write_and_view() {
        let mut buffer = OwnedBuffer::alloc(4).unwrap();
        buffer.as_mut_slice().copy_from_slice(b"abcd");

        let view = buffer.view();
        assert_eq!(view.len, 4);
        assert_eq!(view.data.cast::<u8>(), buffer.as_slice().as_ptr().cast_mut());
        assert_eq!(buffer.as_ref(), b"abcd");
    }

    #[test]
    fn test_release_and_readopt() {
        let mut buffer = OwnedBuffer::alloc(8).unwrap();
        buffer.as_mut_slice()[0] = 0xAA;

        let raw = buffer.release();
        assert!(buffer.is_empty());
        assert!(!buffer.is_some());

        let adopted = unsafe { OwnedBuffer::from_raw(raw.data, raw.len) };
        assert_eq!(adopted.len(), 8);
        assert_eq!(adopted.as_slice()[0], 0xAA);
    }

    #[test]
    fn test_reset_and_clear() {
        let mut buffer = OwnedBuffer::alloc(2).unwrap();
        let raw = OwnedBuffer::alloc(5).unwrap().release();

        unsafe { buffer.reset(raw.data, raw.len) };
        assert_eq!(buffer.len(), 5);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_some());
    }
}
