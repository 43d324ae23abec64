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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate is a thin safety layer over the OpenSSL C API.  It does not
//! implement cryptography; it makes the lifetime of native resources, the
//! discipline of OpenSSL's thread-local error queue, big integer encodings
//! and certificate identity checks hard to get wrong.
//!
//! # Details
//!
//! - [`OwnedHandle`] owns one native resource and releases it exactly once,
//!   with the release function bound to the resource type.  Aliases such as
//!   [`X509Handle`] or [`EvpPkeyHandle`] exist for every wrapped kind.
//! - [`ErrorStack`], [`ClearErrorOnDrop`] and [`MarkPopErrorOnDrop`] capture,
//!   clear or restore the OpenSSL error queue around native calls.  Every
//!   fallible operation of this crate leaves the queue as it found it and
//!   reports the captured entries as the source of the returned
//!   [`bherror::Error`].
//! - [`BigInt`] converts between `BIGNUM`s and unsigned big-endian bytes,
//!   padded or minimal.
//! - [`OwnedCertificate`] parses PEM or DER certificates and
//!   [`CertificateView`] inspects them, including hostname, email and IP
//!   address checks governed by [`CheckFlags`].
//! - [`spkac`], [`fips`] and [`random`] are guarded pass-throughs to the
//!   corresponding OpenSSL facilities.
//!
//! OpenSSL 3.0 or newer is required.
//!
//! # Examples
//!
//! ```no_run
//! use bhossl::{CheckFlags, CheckMatch, OwnedCertificate};
//!
//! let pem = std::fs::read("path-to-server-certificate.pem").expect("read certificate");
//! let cert = OwnedCertificate::parse(&pem).expect("valid certificate");
//!
//! let view = cert.view();
//! println!("{}", view.subject().expect("printable subject").text());
//!
//! let (result, peer) = view.check_host_with_peer_name("www.example.com", CheckFlags::empty());
//! if result == CheckMatch::Match {
//!     println!("matched {}", peer.unwrap_or_default());
//! }
//! ```

mod bignum;
mod bio;
mod buffer;
mod error;
mod error_stack;
pub mod ffi;
pub mod fips;
mod guard;
mod handle;
pub mod random;
pub mod spkac;
#[cfg(any(feature = "test-utils", test))]
pub mod test_utils;
mod x509;

pub use bignum::{BigInt, Word};
pub use bio::MemBio;
pub use buffer::{Buffer, OwnedBuffer};
pub use error::{Error, Result};
pub use error_stack::{guarded, ErrorStack};
pub use guard::{ClearErrorOnDrop, MarkPopErrorOnDrop};
pub use handle::{
    BignumHandle, BioHandle, BnCtxHandle, CipherCtxHandle, DhHandle, DsaHandle, DsaSigHandle,
    EcGroupHandle, EcKeyHandle, EcPointHandle, EcdsaSigHandle, EvpMdCtxHandle, EvpPkeyCtxHandle,
    EvpPkeyHandle, HmacCtxHandle, NativeResource, ObjectStack, OwnedHandle, Pkcs8Handle,
    RsaHandle, SendableResource, SpkiHandle, SslCtxHandle, SslHandle, SslSessionHandle,
    X509Handle,
};
pub use x509::{CertificateView, CheckFlags, CheckMatch, OwnedCertificate};

/// Initializes the OpenSSL library.
///
/// OpenSSL 3 initializes itself on first use, so calling this is optional.
/// It is safe to call more than once and from several threads.
pub fn init() {
    openssl_sys::init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();

        let value = BigInt::from_bytes(&[0x2A]).unwrap();
        assert_eq!(value.word(), 42);
    }
}
