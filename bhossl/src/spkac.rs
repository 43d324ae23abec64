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

//! Signed Public Key and Challenge (SPKAC) structures, as produced by the
//! legacy `<keygen>` element.
//!
//! Inputs are base64 text; trailing ASCII whitespace is ignored.

use std::ffi::c_int;

use bherror::traits::ErrorContext as _;

use crate::{
    bio::MemBio,
    buffer::OwnedBuffer,
    error::{Error, Result},
    error_stack::guarded,
    ffi,
    guard::MarkPopErrorOnDrop,
    handle::{EvpPkeyHandle, SpkiHandle},
};

fn decode(input: &[u8]) -> Result<SpkiHandle> {
    let input = input.trim_ascii_end();
    if input.is_empty() {
        return Err(bherror::Error::root(Error::InvalidInput("empty SPKAC".into())));
    }
    let len = c_int::try_from(input.len())
        .map_err(|_| bherror::Error::root(Error::InvalidInput("SPKAC too large".into())))?;

    let (spki, errors) = guarded(|| unsafe {
        let spki = ffi::NETSCAPE_SPKI_b64_decode(input.as_ptr().cast(), len);
        if spki.is_null() {
            Err(ffi::ERR_peek_last_error())
        } else {
            Ok(spki)
        }
    });

    match spki {
        Ok(spki) => Ok(unsafe { SpkiHandle::from_ptr(spki) }),
        Err(code) => errors
            .fail(Error::Parse(code))
            .ctx(|| "unable to decode the SPKAC"),
    }
}

fn public_key(spki: &SpkiHandle) -> Result<EvpPkeyHandle> {
    let (key, errors) = guarded(|| unsafe { ffi::NETSCAPE_SPKI_get_pubkey(spki.as_ptr()) });
    if key.is_null() {
        return errors
            .fail(Error::OperationFailed)
            .ctx(|| "the SPKAC carries no usable public key");
    }
    Ok(unsafe { EvpPkeyHandle::from_ptr(key) })
}

/// Whether `input` decodes and is signed by the public key it carries.
///
/// Errors raised while checking are discarded.
pub fn verify_spkac(input: &[u8]) -> bool {
    let _guard = MarkPopErrorOnDrop::new(None);

    let Ok(spki) = decode(input) else {
        return false;
    };
    let Ok(key) = public_key(&spki) else {
        return false;
    };
    unsafe { ffi::NETSCAPE_SPKI_verify(spki.as_ptr(), key.as_ptr()) > 0 }
}

/// The public key carried by `input`, PEM encoded.
pub fn export_public_key(input: &[u8]) -> Result<MemBio> {
    let spki = decode(input)?;
    let key = public_key(&spki)?;

    let bio = MemBio::new()?;
    let (written, errors) =
        guarded(|| unsafe { ffi::PEM_write_bio_PUBKEY(bio.as_ptr(), key.as_ptr()) });
    if written != 1 {
        return errors.fail(Error::OperationFailed);
    }
    Ok(bio)
}

/// The challenge string carried by `input`, as UTF-8.
pub fn export_challenge(input: &[u8]) -> Result<OwnedBuffer> {
    let spki = decode(input)?;

    let challenge = unsafe {
        let spkac = (*spki.as_ptr()).spkac;
        if spkac.is_null() {
            std::ptr::null_mut()
        } else {
            (*spkac).challenge
        }
    };
    if challenge.is_null() {
        return Err(bherror::Error::root(Error::OperationFailed).ctx("the SPKAC has no challenge"));
    }

    let mut utf8 = std::ptr::null_mut();
    let (len, errors) = guarded(|| unsafe { ffi::ASN1_STRING_to_UTF8(&mut utf8, challenge) });
    if len < 0 {
        return errors.fail(Error::OperationFailed);
    }
    Ok(unsafe { OwnedBuffer::from_raw(utf8.cast(), len as usize) })
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use assert_matches::assert_matches;
    use foreign_types::ForeignType;

    use super::*;
    use crate::test_utils::{
        assert_empty_error_stack, generate_key, pending_error_count, push_error,
    };

    fn signed_spkac(challenge: &str) -> (Vec<u8>, openssl::pkey::PKey<openssl::pkey::Private>) {
        let key = generate_key();
        unsafe {
            let spki = SpkiHandle::from_ptr(ffi::NETSCAPE_SPKI_new());
            assert!(spki.is_some());
            let challenge_string = (*(*spki.as_ptr()).spkac).challenge;
            assert_eq!(
                ffi::ASN1_STRING_set(
                    challenge_string,
                    challenge.as_ptr().cast(),
                    challenge.len() as c_int
                ),
                1
            );
            assert_eq!(ffi::NETSCAPE_SPKI_set_pubkey(spki.as_ptr(), key.as_ptr()), 1);
            assert!(ffi::NETSCAPE_SPKI_sign(spki.as_ptr(), key.as_ptr(), ffi::EVP_sha256()) > 0);

            let encoded = ffi::NETSCAPE_SPKI_b64_encode(spki.as_ptr());
            assert!(!encoded.is_null());
            let text = CStr::from_ptr(encoded).to_bytes().to_vec();
            ffi::OPENSSL_free(encoded.cast());
            (text, key)
        }
    }

    #[test]
    fn test_verify_signed_spkac() {
        let (spkac, _) = signed_spkac("challenge");

        assert!(verify_spkac(&spkac));
        assert_empty_error_stack();
    }

    #[test]
    fn test_trailing_whitespace_is_ignored() {
        let (mut spkac, _) = signed_spkac("challenge");
        spkac.extend_from_slice(b" \r\n\t");

        assert!(verify_spkac(&spkac));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        push_error();

        assert!(!verify_spkac(b"bm90IGFuIFNQS0FD"));
        assert!(!verify_spkac(b""));
        assert!(!verify_spkac(b"   "));

        assert_eq!(pending_error_count(), 1);
        crate::ErrorStack::captured();
    }

    #[test]
    fn test_export_challenge() {
        let (spkac, _) = signed_spkac("this is a challenge");

        let challenge = export_challenge(&spkac).unwrap();

        assert_eq!(challenge.as_slice(), b"this is a challenge");
        assert_empty_error_stack();
    }

    #[test]
    fn test_export_public_key() {
        let (spkac, key) = signed_spkac("challenge");

        let pem = export_public_key(&spkac).unwrap();

        assert_eq!(pem.as_bytes(), key.public_key_to_pem().unwrap());
    }

    #[test]
    fn test_export_rejects_empty_input() {
        assert_matches!(
            export_challenge(b" \n").unwrap_err().error,
            Error::InvalidInput(_)
        );
        assert_matches!(
            export_public_key(b"").unwrap_err().error,
            Error::InvalidInput(_)
        );
    }

    #[test]
    fn test_export_rejects_garbage() {
        assert_matches!(
            export_challenge(b"bm90IGFuIFNQS0FD").unwrap_err().error,
            Error::Parse(_)
        );
        assert_empty_error_stack();
    }
}
