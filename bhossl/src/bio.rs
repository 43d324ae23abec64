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

//! In-memory `BIO`s.

use std::{borrow::Cow, ffi::c_int, marker::PhantomData, ptr};

use crate::{
    error::{Error, Result},
    error_stack::guarded,
    ffi,
    handle::BioHandle,
};

/// An owned, growable memory `BIO`.
///
/// Printing operations write into it; the written bytes are read back with
/// [`MemBio::as_bytes`] or [`MemBio::text`].
#[derive(Debug)]
pub struct MemBio {
    bio: BioHandle,
}

impl MemBio {
    /// Creates an empty memory `BIO`.
    pub fn new() -> Result<Self> {
        let (bio, errors) = guarded(|| unsafe { ffi::BIO_new(ffi::BIO_s_mem()) });
        if bio.is_null() {
            return errors.fail(Error::Allocation);
        }

        Ok(Self {
            bio: unsafe { BioHandle::from_ptr(bio) },
        })
    }

    /// Appends `data`.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let len = c_int::try_from(data.len())
            .map_err(|_| bherror::Error::root(Error::InvalidInput("data too large".into())))?;

        let (written, errors) =
            guarded(|| unsafe { ffi::BIO_write(self.bio.as_ptr(), data.as_ptr().cast(), len) });
        if written != len {
            return errors.fail(Error::OperationFailed);
        }
        Ok(())
    }

    /// Everything written so far.
    pub fn as_bytes(&self) -> &[u8] {
        let mut data = ptr::null_mut();
        let len = unsafe { ffi::BIO_get_mem_data(self.bio.as_ptr(), &mut data) };
        if data.is_null() || len <= 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(data.cast(), len as usize) }
    }

    /// Everything written so far, as text.  Invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// The underlying `BIO`, still owned by `self`.
    pub fn as_ptr(&self) -> *mut ffi::BIO {
        self.bio.as_ptr()
    }

    /// Converts into the underlying handle.
    pub fn into_handle(self) -> BioHandle {
        self.bio
    }
}

/// A read-only memory `BIO` over borrowed bytes.
pub(crate) struct MemBioSlice<'a> {
    bio: BioHandle,
    _data: PhantomData<&'a [u8]>,
}

impl<'a> MemBioSlice<'a> {
    /// Returns `None` when OpenSSL cannot allocate the `BIO`; the failure is
    /// left on the error queue.
    pub(crate) fn new(data: &'a [u8]) -> Option<Self> {
        let len = c_int::try_from(data.len()).ok()?;
        let bio = unsafe { ffi::BIO_new_mem_buf(data.as_ptr().cast(), len) };
        if bio.is_null() {
            return None;
        }

        Some(Self {
            bio: unsafe { BioHandle::from_ptr(bio) },
            _data: PhantomData,
        })
    }

    pub(crate) fn as_ptr(&self) -> *mut ffi::BIO {
        self.bio.as_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_empty_error_stack;

    #[test]
    fn test_write_and_read_back() {
        let mut bio = MemBio::new().unwrap();
        assert!(bio.as_bytes().is_empty());

        bio.write(b"hello, ").unwrap();
        bio.write(b"").unwrap();
        bio.write(b"world").unwrap();

        assert_eq!(bio.as_bytes(), b"hello, world");
        assert_eq!(bio.text(), "hello, world");
        assert_empty_error_stack();
    }

    #[test]
    fn test_text_replaces_invalid_utf8() {
        let mut bio = MemBio::new().unwrap();
        bio.write(&[b'a', 0xFF, b'b']).unwrap();

        assert_eq!(bio.text(), "a\u{FFFD}b");
    }

    #[test]
    fn test_into_handle_keeps_resource() {
        let bio = MemBio::new().unwrap();
        let ptr = bio.as_ptr();

        let handle = bio.into_handle();
        assert_eq!(handle.as_ptr(), ptr);
    }

    #[test]
    fn test_slice_bio() {
        let data = b"borrowed";
        let bio = MemBioSlice::new(data).unwrap();

        assert!(!bio.as_ptr().is_null());
    }
}
