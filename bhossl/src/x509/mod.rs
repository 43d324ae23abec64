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

//! X.509 certificates: ownership, field inspection and identity checks.

use std::{
    ffi::{c_char, c_int, c_void},
    marker::PhantomData,
    ptr::{self, NonNull},
};

use bherror::traits::ErrorContext as _;
use bitflags::bitflags;
use foreign_types::ForeignType;
use tracing::warn;

use crate::{
    bignum::BigInt,
    bio::{MemBio, MemBioSlice},
    buffer::OwnedBuffer,
    error::{Error, Result},
    error_stack::guarded,
    ffi,
    guard::{ClearErrorOnDrop, MarkPopErrorOnDrop},
    handle::{AccessDescriptions, EvpPkeyHandle, GeneralNames, ObjectStack, X509Handle},
};

mod identity;
mod names;
mod print;

use names::GeneralName;

const NAME_FLAGS: std::ffi::c_ulong = ffi::ASN1_STRFLGS_ESC_2253
    | ffi::ASN1_STRFLGS_ESC_CTRL
    | ffi::ASN1_STRFLGS_UTF8_CONVERT
    | ffi::XN_FLAG_SEP_MULTILINE
    | ffi::XN_FLAG_FN_SN;

bitflags! {
    /// Options of the identity checks on [`CertificateView`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CheckFlags: u32 {
        /// Consult the subject even when matching SAN entries exist.
        const ALWAYS_CHECK_SUBJECT = 1;
        /// Never consult the subject.
        const NEVER_CHECK_SUBJECT = 1 << 1;
        /// Treat `*` in presented names as a literal that never matches.
        const NO_WILDCARDS = 1 << 2;
    }
}

/// Outcome of an identity check.
#[derive(strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMatch {
    /// No presented identity matches.
    #[strum(to_string = "no match")]
    NoMatch,
    /// A presented identity matches.
    #[strum(to_string = "match")]
    Match,
    /// The reference identity is malformed.
    #[strum(to_string = "invalid name")]
    InvalidName,
    /// The certificate could not be inspected.
    #[strum(to_string = "operation failed")]
    OperationFailed,
}

impl CheckMatch {
    /// Whether the check succeeded.
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

#[derive(Debug, Clone, Copy)]
enum IdentityKind {
    Dns,
    Email,
    Ip,
}

impl IdentityKind {
    fn presented(self, name: GeneralName<'_>) -> Option<&[u8]> {
        match (self, name) {
            (Self::Dns, GeneralName::Dns(value))
            | (Self::Email, GeneralName::Email(value))
            | (Self::Ip, GeneralName::IpAddress(value)) => Some(value),
            _ => None,
        }
    }

    fn subject_nid(self) -> Option<c_int> {
        match self {
            Self::Dns => Some(ffi::NID_commonName),
            Self::Email => Some(ffi::NID_pkcs9_emailAddress),
            Self::Ip => None,
        }
    }
}

fn check_outcome(outcome: Result<Option<String>>) -> (CheckMatch, Option<String>) {
    match outcome {
        Ok(Some(name)) => (CheckMatch::Match, Some(name)),
        Ok(None) => (CheckMatch::NoMatch, None),
        Err(error) => {
            warn!(%error, "unable to inspect the certificate identities");
            (CheckMatch::OperationFailed, None)
        }
    }
}

unsafe extern "C" fn no_password_callback(
    _buf: *mut c_char,
    _size: c_int,
    _rwflag: c_int,
    _userdata: *mut c_void,
) -> c_int {
    0
}

/// Writes into a fresh [`MemBio`] with `f`, which reports success.
fn print_to_bio(f: impl FnOnce(*mut ffi::BIO) -> bool) -> Result<MemBio> {
    let bio = MemBio::new()?;
    let (written, errors) = guarded(|| f(bio.as_ptr()));
    if !written {
        return errors.fail(Error::OperationFailed);
    }
    Ok(bio)
}

/// An owned certificate.  Never empty.
#[derive(Debug)]
pub struct OwnedCertificate {
    cert: X509Handle,
}

impl OwnedCertificate {
    /// Parses a PEM or DER encoded certificate.
    ///
    /// PEM is tried first; encrypted PEM is never prompted for.  On failure
    /// the error carries the most recent OpenSSL error code, and the OpenSSL
    /// error queue is left as it was.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let len = std::ffi::c_long::try_from(data.len()).map_err(|_| {
            bherror::Error::root(Error::InvalidInput("certificate too large".into()))
        })?;

        let (cert, errors) = guarded(|| unsafe {
            if let Some(bio) = MemBioSlice::new(data) {
                let cert = ffi::PEM_read_bio_X509(
                    bio.as_ptr(),
                    ptr::null_mut(),
                    Some(no_password_callback),
                    ptr::null_mut(),
                );
                if !cert.is_null() {
                    return Ok(cert);
                }
            }

            let mut der = data.as_ptr();
            let cert = ffi::d2i_X509(ptr::null_mut(), &mut der, len);
            if !cert.is_null() {
                return Ok(cert);
            }

            Err(ffi::ERR_peek_last_error())
        });

        match cert {
            Ok(cert) => Ok(Self {
                cert: unsafe { X509Handle::from_ptr(cert) },
            }),
            Err(code) => errors
                .fail(Error::Parse(code))
                .ctx(|| "neither a PEM nor a DER certificate"),
        }
    }

    /// Takes ownership of `cert`.  Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `cert` must be null or a live `X509` that nobody else releases.
    pub unsafe fn from_ptr(cert: *mut ffi::X509) -> Option<Self> {
        let cert = X509Handle::from_ptr(cert);
        cert.is_some().then_some(Self { cert })
    }

    /// Releases the current certificate and takes ownership of `cert`.
    ///
    /// # Safety
    ///
    /// `cert` must be a live `X509` that nobody else releases, other than
    /// the one currently owned.
    pub unsafe fn reset(&mut self, cert: NonNull<ffi::X509>) {
        self.cert.reset(cert.as_ptr());
    }

    /// Gives up ownership.  The caller must free the result with `X509_free`.
    #[must_use = "the released certificate leaks unless freed"]
    pub fn release(mut self) -> *mut ffi::X509 {
        self.cert.release()
    }

    /// The underlying `X509`, still owned by `self`.
    pub fn as_ptr(&self) -> *mut ffi::X509 {
        self.cert.as_ptr()
    }

    /// A borrowed view for inspection.
    pub fn view(&self) -> CertificateView<'_> {
        CertificateView {
            cert: self.cert.as_ptr(),
            _owner: PhantomData,
        }
    }

    /// Another owner of the same certificate, sharing it by reference count.
    pub fn try_clone(&self) -> Result<Self> {
        self.view().to_owned_certificate()
    }
}

impl From<openssl::x509::X509> for OwnedCertificate {
    fn from(cert: openssl::x509::X509) -> Self {
        let ptr = cert.as_ptr();
        std::mem::forget(cert);
        Self {
            cert: unsafe { X509Handle::from_ptr(ptr) },
        }
    }
}

impl From<OwnedCertificate> for openssl::x509::X509 {
    fn from(cert: OwnedCertificate) -> Self {
        unsafe { openssl::x509::X509::from_ptr(cert.release()) }
    }
}

/// A read-only view of a certificate owned elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct CertificateView<'a> {
    // Never null.
    cert: *mut ffi::X509,
    _owner: PhantomData<&'a ffi::X509>,
}

impl<'a> CertificateView<'a> {
    /// Views a certificate owned by foreign code.  Returns `None` for a null
    /// pointer.
    ///
    /// # Safety
    ///
    /// `cert` must stay alive and unmodified for `'a`.
    pub unsafe fn from_ptr(cert: *const ffi::X509) -> Option<Self> {
        if cert.is_null() {
            return None;
        }
        Some(Self {
            cert: cert.cast_mut(),
            _owner: PhantomData,
        })
    }

    /// The viewed `X509`.
    pub fn as_ptr(&self) -> *const ffi::X509 {
        self.cert
    }

    // Some OpenSSL inspection functions take a non-const certificate
    // without modifying it.
    fn as_mut_ptr(&self) -> *mut ffi::X509 {
        self.cert
    }

    /// A new owner of the viewed certificate.
    pub fn to_owned_certificate(&self) -> Result<OwnedCertificate> {
        let (status, errors) = guarded(|| unsafe { ffi::X509_up_ref(self.as_mut_ptr()) });
        if status != 1 {
            return errors.fail(Error::OperationFailed);
        }
        Ok(OwnedCertificate {
            cert: unsafe { X509Handle::from_ptr(self.as_mut_ptr()) },
        })
    }

    /// PEM encoding.
    pub fn to_pem(&self) -> Result<MemBio> {
        print_to_bio(|bio| unsafe { ffi::PEM_write_bio_X509(bio, self.as_ptr()) } == 1)
    }

    /// DER encoding.
    pub fn to_der(&self) -> Result<MemBio> {
        print_to_bio(|bio| unsafe { ffi::i2d_X509_bio(bio, self.as_ptr()) } == 1)
    }

    fn print_name(&self, name: *const ffi::X509_NAME) -> Result<MemBio> {
        if name.is_null() {
            return Err(bherror::Error::root(Error::OperationFailed).ctx("missing name"));
        }
        print_to_bio(|bio| unsafe { ffi::X509_NAME_print_ex(bio, name, 0, NAME_FLAGS) } >= 0)
    }

    /// The subject, one attribute per line with RFC 2253 escaping.
    pub fn subject(&self) -> Result<MemBio> {
        self.print_name(unsafe { ffi::X509_get_subject_name(self.as_ptr()) })
    }

    /// The issuer, one attribute per line with RFC 2253 escaping.
    pub fn issuer(&self) -> Result<MemBio> {
        self.print_name(unsafe { ffi::X509_get_issuer_name(self.as_ptr()) })
    }

    /// The subject alternative names, `, `-separated.  Names that could be
    /// confused with separators or quoting are JSON-quoted.
    ///
    /// `Ok(None)` when the certificate has no such extension.
    pub fn subject_alt_name(&self) -> Result<Option<MemBio>> {
        let alt_names: Option<GeneralNames> =
            unsafe { names::extension(self.as_ptr(), ffi::NID_subject_alt_name)? };
        alt_names
            .as_ref()
            .map(print::print_subject_alt_names)
            .transpose()
    }

    /// The authority information access descriptions, one
    /// `method - location` line each.
    ///
    /// `Ok(None)` when the certificate has no such extension.
    pub fn info_access(&self) -> Result<Option<MemBio>> {
        let descriptions: Option<AccessDescriptions> =
            unsafe { names::extension(self.as_ptr(), ffi::NID_info_access)? };
        descriptions
            .as_ref()
            .map(print::print_info_access)
            .transpose()
    }

    /// Start of the validity period, e.g. `Jan  1 00:00:00 2024 GMT`.
    pub fn valid_from(&self) -> Result<MemBio> {
        let time = unsafe { ffi::X509_get0_notBefore(self.as_ptr()) };
        print_to_bio(|bio| unsafe { ffi::ASN1_TIME_print(bio, time) } == 1)
    }

    /// End of the validity period.
    pub fn valid_to(&self) -> Result<MemBio> {
        let time = unsafe { ffi::X509_get0_notAfter(self.as_ptr()) };
        print_to_bio(|bio| unsafe { ffi::ASN1_TIME_print(bio, time) } == 1)
    }

    /// Minimal big-endian encoding of the serial number.
    pub fn serial_number(&self) -> Result<OwnedBuffer> {
        let (serial, errors) = guarded(|| unsafe {
            ffi::ASN1_INTEGER_to_BN(ffi::X509_get0_serialNumber(self.as_ptr()), ptr::null_mut())
        });
        if serial.is_null() {
            return errors.fail(Error::OperationFailed);
        }
        unsafe { BigInt::from_ptr(serial) }.encode()
    }

    /// The subject public key.
    pub fn public_key(&self) -> Result<EvpPkeyHandle> {
        let (key, errors) = guarded(|| unsafe {
            let key = ffi::X509_get_pubkey(self.as_mut_ptr());
            if key.is_null() {
                Err(ffi::ERR_peek_last_error())
            } else {
                Ok(key)
            }
        });

        match key {
            Ok(key) => Ok(unsafe { EvpPkeyHandle::from_ptr(key) }),
            Err(code) => errors.fail(Error::Parse(code)),
        }
    }

    /// The extended key usage purposes.
    ///
    /// `Ok(None)` when the certificate has no such extension.
    pub fn key_usage(&self) -> Result<Option<ObjectStack>> {
        unsafe { names::extension(self.as_ptr(), ffi::NID_ext_key_usage) }
    }

    /// Whether the certificate is a CA certificate.
    pub fn is_ca(&self) -> bool {
        let _guard = MarkPopErrorOnDrop::new(None);
        unsafe { ffi::X509_check_ca(self.as_mut_ptr()) == 1 }
    }

    /// Whether `issuer` is the issuer of this certificate by name and key
    /// identifier.  The signature is not checked.
    pub fn is_issued_by(&self, issuer: &CertificateView<'_>) -> bool {
        let _guard = MarkPopErrorOnDrop::new(None);
        unsafe { ffi::X509_check_issued(issuer.as_mut_ptr(), self.as_mut_ptr()) == ffi::X509_V_OK }
    }

    /// Whether `key` is the private key of this certificate.
    pub fn check_private_key(&self, key: &EvpPkeyHandle) -> bool {
        if key.is_empty() {
            return false;
        }
        let _guard = ClearErrorOnDrop::new(None);
        unsafe { ffi::X509_check_private_key(self.as_ptr(), key.as_ptr()) == 1 }
    }

    /// Whether the certificate's signature verifies under `key`.
    pub fn check_public_key(&self, key: &EvpPkeyHandle) -> bool {
        if key.is_empty() {
            return false;
        }
        let _guard = ClearErrorOnDrop::new(None);
        unsafe { ffi::X509_verify(self.as_mut_ptr(), key.as_ptr()) > 0 }
    }

    fn find_identity(
        &self,
        kind: IdentityKind,
        flags: CheckFlags,
        matches: impl Fn(&[u8]) -> bool,
    ) -> Result<Option<String>> {
        let cert = self.as_ptr();
        let mut presented = false;

        let alt_names: Option<GeneralNames> =
            unsafe { names::extension(cert, ffi::NID_subject_alt_name)? };
        if let Some(alt_names) = &alt_names {
            for name in names::general_names(alt_names) {
                let Some(value) = kind.presented(name) else {
                    continue;
                };
                presented = true;
                if matches(value) {
                    return Ok(Some(String::from_utf8_lossy(value).into_owned()));
                }
            }
        }

        let Some(nid) = kind.subject_nid() else {
            return Ok(None);
        };
        if flags.contains(CheckFlags::NEVER_CHECK_SUBJECT)
            || (presented && !flags.contains(CheckFlags::ALWAYS_CHECK_SUBJECT))
        {
            return Ok(None);
        }

        for entry in unsafe { names::subject_entries(cert, nid)? } {
            if matches(entry.as_slice()) {
                return Ok(Some(String::from_utf8_lossy(entry.as_slice()).into_owned()));
            }
        }
        Ok(None)
    }

    /// Checks `host` against the DNS names of the certificate.
    pub fn check_host(&self, host: &str, flags: CheckFlags) -> CheckMatch {
        self.check_host_with_peer_name(host, flags).0
    }

    /// Like [`CertificateView::check_host`], also returning the presented
    /// name that matched.
    pub fn check_host_with_peer_name(
        &self,
        host: &str,
        flags: CheckFlags,
    ) -> (CheckMatch, Option<String>) {
        let Some(host) = identity::normalize_host(host) else {
            return (CheckMatch::InvalidName, None);
        };
        let allow_wildcards = !flags.contains(CheckFlags::NO_WILDCARDS);

        check_outcome(self.find_identity(IdentityKind::Dns, flags, |presented| {
            identity::host_matches(presented, host, allow_wildcards)
        }))
    }

    /// Checks `email` against the email addresses of the certificate.
    pub fn check_email(&self, email: &str, flags: CheckFlags) -> CheckMatch {
        let Some((local, domain)) = identity::split_email(email) else {
            return CheckMatch::InvalidName;
        };

        check_outcome(self.find_identity(IdentityKind::Email, flags, |presented| {
            identity::email_matches(presented, local, domain)
        }))
        .0
    }

    /// Checks the IPv4 or IPv6 literal `ip` against the IP addresses of the
    /// certificate.  The subject is never consulted.
    pub fn check_ip(&self, ip: &str, flags: CheckFlags) -> CheckMatch {
        let Some(octets) = identity::parse_ip(ip) else {
            return CheckMatch::InvalidName;
        };

        check_outcome(self.find_identity(IdentityKind::Ip, flags, |presented| {
            presented == octets.as_slice()
        }))
        .0
    }
}

impl ObjectStack {
    /// Dotted numeric form of every object, in order.
    pub fn oids(&self) -> Vec<String> {
        names::stack_items::<_, ffi::ASN1_OBJECT>(self)
            .map(|obj| unsafe { print::object_text(obj, true) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::test_utils::{
        assert_empty_error_stack, generate_key, push_error, pending_error_count,
        TestCertificate, TestCertificateBuilder,
    };

    fn leaf() -> TestCertificate {
        TestCertificateBuilder::new()
            .common_name("leaf.example.com")
            .dns("www.example.com")
            .dns("*.api.example.com")
            .email("admin@example.com")
            .ip("127.0.0.1")
            .ip("::1")
            .build(None)
    }

    fn owned(cert: &TestCertificate) -> OwnedCertificate {
        OwnedCertificate::from(cert.cert.clone())
    }

    fn key_handle<T>(key: &openssl::pkey::PKey<T>) -> EvpPkeyHandle {
        let key = key.clone();
        let ptr = key.as_ptr();
        std::mem::forget(key);
        unsafe { EvpPkeyHandle::from_ptr(ptr) }
    }

    #[test]
    fn test_parse_pem_and_der() {
        let fixture = leaf();

        let from_pem = OwnedCertificate::parse(&fixture.pem()).unwrap();
        let from_der = OwnedCertificate::parse(&fixture.der()).unwrap();

        assert_eq!(
            from_pem.view().to_der().unwrap().as_bytes(),
            from_der.view().to_der().unwrap().as_bytes()
        );
        assert_eq!(from_pem.view().to_pem().unwrap().as_bytes(), fixture.pem());
        assert_empty_error_stack();
    }

    #[test]
    fn test_parse_garbage_fails_cleanly() {
        let err = OwnedCertificate::parse(b"definitely not a certificate").unwrap_err();

        assert_matches!(err.error, Error::Parse(code) if code != 0);
        assert_empty_error_stack();
    }

    #[test]
    fn test_parse_empty_input_fails() {
        let err = OwnedCertificate::parse(&[]).unwrap_err();

        assert_matches!(err.error, Error::Parse(_));
        assert_empty_error_stack();
    }

    #[test]
    fn test_parse_preserves_pending_errors() {
        push_error();

        OwnedCertificate::parse(b"garbage").unwrap_err();

        assert_eq!(pending_error_count(), 1);
        crate::ErrorStack::captured();
    }

    #[test]
    fn test_interop_round_trip() {
        let fixture = leaf();
        let cert = owned(&fixture);

        let back = openssl::x509::X509::from(cert);
        assert_eq!(back.to_der().unwrap(), fixture.der());
    }

    #[test]
    fn test_try_clone_shares_certificate() {
        let cert = owned(&leaf());

        let clone = cert.try_clone().unwrap();

        assert_eq!(clone.as_ptr(), cert.as_ptr());
        drop(cert);
        assert!(clone.view().subject().is_ok());
    }

    #[test]
    fn test_view_from_null_pointer() {
        assert!(unsafe { CertificateView::from_ptr(ptr::null()) }.is_none());
        assert!(unsafe { OwnedCertificate::from_ptr(ptr::null_mut()) }.is_none());
    }

    #[test]
    fn test_subject_and_issuer() {
        let ca = TestCertificateBuilder::new()
            .common_name("Test CA")
            .ca()
            .build(None);
        let leaf = TestCertificateBuilder::new()
            .common_name("leaf.example.com")
            .email_address("leaf@example.com")
            .build(Some(&ca));
        let cert = owned(&leaf);

        assert_eq!(
            cert.view().subject().unwrap().text(),
            "CN=leaf.example.com\nemailAddress=leaf@example.com"
        );
        assert_eq!(cert.view().issuer().unwrap().text(), "CN=Test CA");
    }

    #[test]
    fn test_subject_alt_name() {
        let cert = owned(&leaf());

        let names = cert.view().subject_alt_name().unwrap().unwrap();
        assert_eq!(
            names.text(),
            "DNS:www.example.com, DNS:*.api.example.com, email:admin@example.com, \
             IP Address:127.0.0.1, IP Address:0:0:0:0:0:0:0:1"
        );
    }

    #[test]
    fn test_subject_alt_name_quotes_uris() {
        let cert = owned(
            &TestCertificateBuilder::new()
                .uri("https://example.com/a")
                .uri("https://example.com/a,DNS:evil.com")
                .build(None),
        );

        let names = cert.view().subject_alt_name().unwrap().unwrap();
        assert_eq!(
            names.text(),
            r#"URI:https://example.com/a, URI:"https://example.com/a\u002cDNS:evil.com""#
        );
    }

    #[test]
    fn test_missing_extensions() {
        let cert = owned(&TestCertificateBuilder::new().common_name("bare").build(None));
        let view = cert.view();

        assert!(view.subject_alt_name().unwrap().is_none());
        assert!(view.info_access().unwrap().is_none());
        assert!(view.key_usage().unwrap().is_none());
        assert_empty_error_stack();
    }

    #[test]
    fn test_info_access() {
        let cert = owned(
            &TestCertificateBuilder::new()
                .common_name("aia")
                .info_access("OCSP;URI:http://ocsp.example.com,caIssuers;URI:http://ca.example.com/ca.pem")
                .build(None),
        );

        let info = cert.view().info_access().unwrap().unwrap();
        assert_eq!(
            info.text(),
            "OCSP - URI:http://ocsp.example.com\nCA Issuers - URI:http://ca.example.com/ca.pem"
        );
    }

    #[test]
    fn test_validity_period() {
        let cert = owned(&leaf());

        assert_eq!(
            cert.view().valid_from().unwrap().text(),
            "Jan  1 00:00:00 2024 GMT"
        );
        assert_eq!(
            cert.view().valid_to().unwrap().text(),
            "Jan  1 00:00:00 2034 GMT"
        );
    }

    #[test]
    fn test_serial_number() {
        let serial = [0x0A, 0xBC, 0xDE, 0xF0];
        let cert = owned(&TestCertificateBuilder::new().serial(&serial).build(None));

        let encoded = cert.view().serial_number().unwrap();

        assert_eq!(encoded.as_slice(), &serial);
        assert_eq!(
            encoded.as_slice(),
            BigInt::from_bytes(&serial).unwrap().encode().unwrap().as_slice()
        );
    }

    #[test]
    fn test_public_key() {
        let fixture = leaf();
        let cert = owned(&fixture);

        let key = cert.view().public_key().unwrap();

        assert!(key.is_some());
        assert!(cert.view().check_public_key(&key));
    }

    #[test]
    fn test_key_usage() {
        let cert = owned(
            &TestCertificateBuilder::new()
                .common_name("eku")
                .extended_key_usage()
                .build(None),
        );

        let usage = cert.view().key_usage().unwrap().unwrap();

        assert_eq!(
            usage.oids(),
            vec!["1.3.6.1.5.5.7.3.1".to_owned(), "1.3.6.1.5.5.7.3.2".to_owned()]
        );
    }

    #[test]
    fn test_ca_and_issuance() {
        let ca = TestCertificateBuilder::new()
            .common_name("Test CA")
            .ca()
            .build(None);
        let leaf = TestCertificateBuilder::new()
            .common_name("leaf")
            .build(Some(&ca));
        let other = TestCertificateBuilder::new()
            .common_name("Other")
            .build(None);
        let (ca_cert, leaf_cert, other_cert) = (owned(&ca), owned(&leaf), owned(&other));

        assert!(ca_cert.view().is_ca());
        assert!(!leaf_cert.view().is_ca());
        assert!(leaf_cert.view().is_issued_by(&ca_cert.view()));
        assert!(!leaf_cert.view().is_issued_by(&other_cert.view()));
        assert!(!ca_cert.view().is_issued_by(&leaf_cert.view()));
        assert_empty_error_stack();
    }

    #[test]
    fn test_check_keys() {
        let ca = TestCertificateBuilder::new().common_name("CA").ca().build(None);
        let leaf = TestCertificateBuilder::new().common_name("leaf").build(Some(&ca));
        let cert = owned(&leaf);
        let view = cert.view();

        assert!(view.check_private_key(&key_handle(&leaf.key)));
        assert!(!view.check_private_key(&key_handle(&generate_key())));
        assert!(!view.check_private_key(&EvpPkeyHandle::empty()));

        assert!(view.check_public_key(&key_handle(&ca.key)));
        assert!(!view.check_public_key(&key_handle(&leaf.key)));
        assert!(!view.check_public_key(&EvpPkeyHandle::empty()));
        assert_empty_error_stack();
    }

    #[test]
    fn test_check_host() {
        let cert = owned(&leaf());
        let view = cert.view();
        let flags = CheckFlags::empty();

        assert_eq!(view.check_host("www.example.com", flags), CheckMatch::Match);
        assert_eq!(view.check_host("WWW.EXAMPLE.COM.", flags), CheckMatch::Match);
        assert_eq!(view.check_host("v1.api.example.com", flags), CheckMatch::Match);
        assert_eq!(view.check_host("api.example.com", flags), CheckMatch::NoMatch);
        assert_eq!(view.check_host("a.b.api.example.com", flags), CheckMatch::NoMatch);
        assert_eq!(view.check_host("evil.com", flags), CheckMatch::NoMatch);
        assert_eq!(
            view.check_host("v1.api.example.com", CheckFlags::NO_WILDCARDS),
            CheckMatch::NoMatch
        );
    }

    #[test]
    fn test_check_host_reports_peer_name() {
        let cert = owned(&leaf());

        let (result, peer) = cert
            .view()
            .check_host_with_peer_name("v1.api.example.com", CheckFlags::empty());

        assert!(result.is_match());
        assert_eq!(peer.as_deref(), Some("*.api.example.com"));
    }

    #[test]
    fn test_check_host_invalid_names() {
        let cert = owned(&leaf());
        let view = cert.view();

        for host in ["", ".", "a..b", "*.example.com", "exa mple.com"] {
            assert_eq!(
                view.check_host(host, CheckFlags::empty()),
                CheckMatch::InvalidName,
                "{host:?}"
            );
        }
    }

    #[test]
    fn test_check_host_subject_fallback() {
        let cert = owned(&leaf());
        let view = cert.view();

        // DNS SANs exist, so the common name is ignored by default.
        assert_eq!(
            view.check_host("leaf.example.com", CheckFlags::empty()),
            CheckMatch::NoMatch
        );
        assert_eq!(
            view.check_host("leaf.example.com", CheckFlags::ALWAYS_CHECK_SUBJECT),
            CheckMatch::Match
        );

        let cn_only = owned(
            &TestCertificateBuilder::new()
                .common_name("cn.example.com")
                .build(None),
        );
        assert_eq!(
            cn_only
                .view()
                .check_host("cn.example.com", CheckFlags::empty()),
            CheckMatch::Match
        );
        assert_eq!(
            cn_only
                .view()
                .check_host("cn.example.com", CheckFlags::NEVER_CHECK_SUBJECT),
            CheckMatch::NoMatch
        );
    }

    #[test]
    fn test_check_host_ignores_non_dns_entries() {
        let cert = owned(
            &TestCertificateBuilder::new()
                .common_name("cn.example.com")
                .email("admin@example.com")
                .build(None),
        );

        assert_eq!(
            cert.view().check_host("cn.example.com", CheckFlags::empty()),
            CheckMatch::Match
        );
    }

    #[test]
    fn test_check_email() {
        let cert = owned(&leaf());
        let view = cert.view();
        let flags = CheckFlags::empty();

        assert_eq!(view.check_email("admin@example.com", flags), CheckMatch::Match);
        assert_eq!(view.check_email("admin@EXAMPLE.com", flags), CheckMatch::Match);
        assert_eq!(view.check_email("Admin@example.com", flags), CheckMatch::NoMatch);
        assert_eq!(view.check_email("root@example.com", flags), CheckMatch::NoMatch);
        assert_eq!(view.check_email("not-an-email", flags), CheckMatch::InvalidName);
        assert_eq!(view.check_email("a@b@c", flags), CheckMatch::InvalidName);
    }

    #[test]
    fn test_check_email_subject_fallback() {
        let cert = owned(
            &TestCertificateBuilder::new()
                .common_name("mail")
                .email_address("owner@example.com")
                .build(None),
        );

        assert_eq!(
            cert.view().check_email("owner@example.com", CheckFlags::empty()),
            CheckMatch::Match
        );
        assert_eq!(
            cert.view()
                .check_email("owner@example.com", CheckFlags::NEVER_CHECK_SUBJECT),
            CheckMatch::NoMatch
        );
    }

    #[test]
    fn test_check_ip() {
        let cert = owned(&leaf());
        let view = cert.view();
        let flags = CheckFlags::empty();

        assert_eq!(view.check_ip("127.0.0.1", flags), CheckMatch::Match);
        assert_eq!(view.check_ip("::1", flags), CheckMatch::Match);
        assert_eq!(view.check_ip("0:0:0:0:0:0:0:1", flags), CheckMatch::Match);
        assert_eq!(view.check_ip("127.0.0.2", flags), CheckMatch::NoMatch);
        assert_eq!(view.check_ip("not-an-ip", flags), CheckMatch::InvalidName);
        assert_eq!(view.check_ip("www.example.com", flags), CheckMatch::InvalidName);
    }

    #[test]
    fn test_check_ip_never_uses_subject() {
        let cert = owned(&TestCertificateBuilder::new().common_name("10.0.0.1").build(None));

        assert_eq!(
            cert.view().check_ip("10.0.0.1", CheckFlags::ALWAYS_CHECK_SUBJECT),
            CheckMatch::NoMatch
        );
    }

    #[test]
    fn test_malformed_subject_alt_name_fails_closed() {
        // Not a GeneralNames SEQUENCE.
        let cert = owned(
            &TestCertificateBuilder::new()
                .common_name("www.example.com")
                .raw_extension("2.5.29.17", &[0x01, 0x02, 0x03])
                .build(None),
        );
        let view = cert.view();

        let err = view.subject_alt_name().unwrap_err();
        assert_matches!(err.error, Error::OperationFailed);

        let flags = CheckFlags::ALWAYS_CHECK_SUBJECT;
        assert_eq!(view.check_host("www.example.com", flags), CheckMatch::OperationFailed);
        assert_eq!(
            view.check_host_with_peer_name("www.example.com", flags),
            (CheckMatch::OperationFailed, None)
        );
        assert_eq!(view.check_email("a@example.com", flags), CheckMatch::OperationFailed);
        assert_eq!(view.check_ip("127.0.0.1", flags), CheckMatch::OperationFailed);
        assert_empty_error_stack();
    }

    #[test]
    fn test_check_match_display() {
        assert_eq!(CheckMatch::InvalidName.to_string(), "invalid name");
        assert!(!CheckMatch::OperationFailed.is_match());
    }
}
