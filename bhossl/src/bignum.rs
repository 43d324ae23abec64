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

//! Arbitrary-precision integers backed by OpenSSL's `BIGNUM`.

use std::{
    cmp::Ordering,
    ffi::{c_int, CStr},
};

use crate::{
    buffer::OwnedBuffer,
    error::{Error, Result},
    error_stack::guarded,
    ffi,
    handle::BignumHandle,
};

/// Native word of the big number implementation.
pub type Word = ffi::BN_ULONG;

/// An owned big integer.
///
/// Byte encodings are unsigned big-endian.  Zero has the empty encoding.
/// The value is wiped when released.
#[derive(Debug, Default)]
pub struct BigInt {
    bn: BignumHandle,
}

fn buffer_too_small(needed: usize, available: usize) -> bherror::Error<Error> {
    bherror::Error::root(Error::BufferTooSmall { needed, available })
}

fn c_len(len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| {
        bherror::Error::root(Error::InvalidInput(format!(
            "{len} bytes exceed the native length limit"
        )))
    })
}

impl BigInt {
    /// Creates a zero value.
    pub fn new() -> Result<Self> {
        Self::allocate(|| unsafe { ffi::BN_new() })
    }

    /// Creates a zero value in OpenSSL's secure heap, if one is configured.
    pub fn new_secure() -> Result<Self> {
        Self::allocate(|| unsafe { ffi::BN_secure_new() })
    }

    fn allocate(f: impl FnOnce() -> *mut ffi::BIGNUM) -> Result<Self> {
        let (bn, errors) = guarded(f);
        if bn.is_null() {
            return errors.fail(Error::Allocation);
        }
        Ok(unsafe { Self::from_ptr(bn) })
    }

    /// Decodes an unsigned big-endian value.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut value = Self::default();
        value.reset_bytes(data)?;
        Ok(value)
    }

    /// Takes ownership of `bn`.
    ///
    /// # Safety
    ///
    /// `bn` must be null or a live `BIGNUM` that nobody else releases.
    pub unsafe fn from_ptr(bn: *mut ffi::BIGNUM) -> Self {
        Self {
            bn: BignumHandle::from_ptr(bn),
        }
    }

    /// Replaces the value with the unsigned big-endian `data`, reusing the
    /// existing allocation when there is one.
    pub fn reset_bytes(&mut self, data: &[u8]) -> Result<()> {
        let len = c_len(data.len())?;
        let current = self.bn.as_ptr();

        let (bn, errors) = guarded(|| unsafe { ffi::BN_bin2bn(data.as_ptr(), len, current) });
        if bn.is_null() {
            return errors.fail(Error::Allocation);
        }
        if bn != current {
            unsafe { self.bn.reset(bn) };
        }
        Ok(())
    }

    /// Gives up ownership of the `BIGNUM`, leaving `self` empty.
    #[must_use = "the released pointer leaks unless freed"]
    pub fn release(&mut self) -> *mut ffi::BIGNUM {
        self.bn.release()
    }

    /// The underlying `BIGNUM`, null if empty.
    pub fn as_ptr(&self) -> *mut ffi::BIGNUM {
        self.bn.as_ptr()
    }

    /// Whether `self` holds a value.
    pub fn is_some(&self) -> bool {
        self.bn.is_some()
    }

    fn non_empty(&self) -> Result<*const ffi::BIGNUM> {
        if self.bn.is_empty() {
            return Err(bherror::Error::root(Error::EmptyHandle));
        }
        Ok(self.bn.as_ptr())
    }

    /// Minimal big-endian encoding.
    pub fn encode(&self) -> Result<OwnedBuffer> {
        unsafe { Self::encode_raw(self.non_empty()?) }
    }

    /// Big-endian encoding left-padded with zeros to exactly `size` bytes.
    pub fn encode_padded(&self, size: usize) -> Result<OwnedBuffer> {
        unsafe { Self::encode_padded_raw(self.non_empty()?, size) }
    }

    /// Writes the minimal encoding to the front of `out` and returns the
    /// number of bytes written.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize> {
        let bn = self.non_empty()?;
        let needed = self.byte_len();
        if needed > out.len() {
            return Err(buffer_too_small(needed, out.len()));
        }
        if needed == 0 {
            return Ok(0);
        }

        let written = unsafe { ffi::BN_bn2bin(bn, out.as_mut_ptr()) };
        Ok(written as usize)
    }

    /// Writes the encoding padded to `size` bytes to the front of `out` and
    /// returns `size`.
    pub fn encode_padded_into(&self, out: &mut [u8], size: usize) -> Result<usize> {
        let bn = self.non_empty()?;
        if size > out.len() {
            return Err(buffer_too_small(size, out.len()));
        }
        let needed = self.byte_len();
        if needed > size {
            return Err(buffer_too_small(needed, size));
        }
        if size == 0 {
            return Ok(0);
        }

        let written = unsafe { ffi::BN_bn2binpad(bn, out.as_mut_ptr(), c_len(size)?) };
        if written < 0 {
            return Err(buffer_too_small(needed, size));
        }
        Ok(written as usize)
    }

    /// Number of bytes of the minimal encoding; `0` for zero or empty.
    pub fn byte_len(&self) -> usize {
        unsafe { Self::byte_count_raw(self.bn.as_ptr()) }
    }

    /// Number of significant bits; `0` for zero or empty.
    pub fn bit_count(&self) -> usize {
        unsafe { Self::bit_count_raw(self.bn.as_ptr()) }
    }

    /// Whether the value is zero.  An empty `BigInt` is not.
    pub fn is_zero(&self) -> bool {
        self.bn.is_some() && unsafe { ffi::BN_is_zero(self.bn.as_ptr()) } == 1
    }

    /// Whether the value is one.  An empty `BigInt` is not.
    pub fn is_one(&self) -> bool {
        self.bn.is_some() && unsafe { ffi::BN_is_one(self.bn.as_ptr()) } == 1
    }

    /// Whether the value is negative.
    pub fn is_negative(&self) -> bool {
        self.bn.is_some() && unsafe { ffi::BN_is_negative(self.bn.as_ptr()) } == 1
    }

    /// Sets the value to `word`.  Returns `false` for an empty `BigInt` or
    /// when OpenSSL fails.
    pub fn set_word(&mut self, word: Word) -> bool {
        self.bn.is_some() && unsafe { ffi::BN_set_word(self.bn.as_ptr(), word) } == 1
    }

    /// The value as a single word, saturating at [`Word::MAX`] when it does
    /// not fit.  `0` for an empty `BigInt`.
    pub fn word(&self) -> Word {
        unsafe { Self::word_raw(self.bn.as_ptr()) }
    }

    /// Uppercase hexadecimal rendering, `-` prefixed when negative.
    pub fn to_hex(&self) -> Result<OwnedBuffer> {
        let bn = self.non_empty()?;
        let (hex, errors) = guarded(|| unsafe { ffi::BN_bn2hex(bn) });
        if hex.is_null() {
            return errors.fail(Error::Allocation);
        }

        let len = unsafe { CStr::from_ptr(hex) }.to_bytes().len();
        Ok(unsafe { OwnedBuffer::from_raw(hex.cast(), len) })
    }

    /// Compares with a `BIGNUM` not owned by a `BigInt`.  An empty `self`
    /// orders before any value.
    ///
    /// # Safety
    ///
    /// `other` must point to a live `BIGNUM`.
    pub unsafe fn cmp_raw(&self, other: *const ffi::BIGNUM) -> Ordering {
        if self.bn.is_empty() {
            return Ordering::Less;
        }
        ffi::BN_cmp(self.bn.as_ptr(), other).cmp(&0)
    }

    /// OpenSSL's shared constant one.  Must not be freed or modified.
    pub fn one() -> *const ffi::BIGNUM {
        unsafe { ffi::BN_value_one() }
    }

    /// Minimal big-endian encoding of `bn`.
    ///
    /// # Safety
    ///
    /// `bn` must point to a live `BIGNUM`.
    pub unsafe fn encode_raw(bn: *const ffi::BIGNUM) -> Result<OwnedBuffer> {
        let len = Self::byte_count_raw(bn);
        let mut buffer = OwnedBuffer::alloc(len)?;
        if len > 0 {
            ffi::BN_bn2bin(bn, buffer.as_mut_ptr());
        }
        Ok(buffer)
    }

    /// Encoding of `bn` padded to exactly `size` bytes.
    ///
    /// # Safety
    ///
    /// `bn` must point to a live `BIGNUM`.
    pub unsafe fn encode_padded_raw(bn: *const ffi::BIGNUM, size: usize) -> Result<OwnedBuffer> {
        let needed = Self::byte_count_raw(bn);
        if needed > size {
            return Err(buffer_too_small(needed, size));
        }

        let mut buffer = OwnedBuffer::alloc(size)?;
        if size > 0 && ffi::BN_bn2binpad(bn, buffer.as_mut_ptr(), c_len(size)?) < 0 {
            return Err(buffer_too_small(needed, size));
        }
        Ok(buffer)
    }

    /// Significant bits of `bn`, `0` when null.
    ///
    /// # Safety
    ///
    /// `bn` must be null or point to a live `BIGNUM`.
    pub unsafe fn bit_count_raw(bn: *const ffi::BIGNUM) -> usize {
        if bn.is_null() {
            return 0;
        }
        ffi::BN_num_bits(bn).max(0) as usize
    }

    /// Bytes of the minimal encoding of `bn`, `0` when null.
    ///
    /// # Safety
    ///
    /// `bn` must be null or point to a live `BIGNUM`.
    pub unsafe fn byte_count_raw(bn: *const ffi::BIGNUM) -> usize {
        if bn.is_null() {
            return 0;
        }
        ffi::BN_num_bytes(bn).max(0) as usize
    }

    /// `bn` as a single word, saturating at [`Word::MAX`]; `0` when null.
    ///
    /// # Safety
    ///
    /// `bn` must be null or point to a live `BIGNUM`.
    pub unsafe fn word_raw(bn: *const ffi::BIGNUM) -> Word {
        if bn.is_null() {
            return 0;
        }
        ffi::BN_get_word(bn)
    }
}

impl PartialEq for BigInt {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BigInt {}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.bn.is_some(), other.bn.is_some()) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (true, true) => unsafe { self.cmp_raw(other.bn.as_ptr()) },
        }
    }
}
