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

use std::ffi::c_ulong;

/// Error returned by the crate API.
#[derive(strum_macros::Display, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// An [`ErrorStack`][crate::ErrorStack] was read while it held no
    /// entries.
    #[strum(to_string = "The error stack is empty")]
    EmptyStack,
    /// OpenSSL failed to parse the input.  Carries the packed OpenSSL error
    /// code of the most recent failure, or `0` when none was reported.
    #[strum(to_string = "OpenSSL failed to parse the input (code {0})")]
    Parse(c_ulong),
    /// OpenSSL could not allocate a resource.
    #[strum(to_string = "OpenSSL allocation failed")]
    Allocation,
    /// The destination cannot hold the encoded value.
    #[strum(to_string = "Buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall {
        /// Number of bytes the encoding requires.
        needed: usize,
        /// Number of bytes the destination offers.
        available: usize,
    },
    /// A native operation failed on well-formed input.
    #[strum(to_string = "OpenSSL operation failed")]
    OperationFailed,
    /// The input was rejected before reaching OpenSSL.
    #[strum(to_string = "Invalid input: {0}")]
    InvalidInput(String),
    /// The operation was attempted on a handle that owns nothing.
    #[strum(to_string = "The handle is empty")]
    EmptyHandle,
    /// Changing the FIPS mode failed.
    #[strum(to_string = "Unable to change the FIPS mode")]
    Fips,
    /// The random number generator could not produce output.
    #[strum(to_string = "Random number generation failed")]
    Random,
}

impl bherror::BhError for Error {}

/// The [`bherror::Result`] type with the error type of
/// [`bhossl::Error`](Error), used throughout this crate.
pub type Result<T> = bherror::Result<T, Error>;
