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

//! Cryptographically secure random bytes.

use std::ffi::c_int;

use crate::{
    error::{Error, Result},
    error_stack::guarded,
    ffi,
};

/// Fills `buffer` from OpenSSL's CSPRNG, reseeding while the generator
/// reports that it lacks entropy.
pub fn csprng(buffer: &mut [u8]) -> Result<()> {
    let (filled, errors) = guarded(|| {
        buffer
            .chunks_mut(c_int::MAX as usize)
            .all(|chunk| unsafe { fill(chunk) })
    });
    if !filled {
        return errors.fail(Error::Random);
    }
    Ok(())
}

unsafe fn fill(chunk: &mut [u8]) -> bool {
    loop {
        if ffi::RAND_status() == 1 && ffi::RAND_bytes(chunk.as_mut_ptr(), chunk.len() as c_int) == 1
        {
            return true;
        }
        if ffi::RAND_poll() != 1 {
            return false;
        }
    }
}
