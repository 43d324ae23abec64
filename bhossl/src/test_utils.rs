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

//! Fixtures for tests: certificates built on the fly and helpers to inspect
//! the OpenSSL error queue.
//!
//! Do NOT use this module in production code.

#![allow(deprecated)]

use std::sync::OnceLock;

use openssl::{
    asn1::{Asn1Integer, Asn1Object, Asn1OctetString, Asn1Time},
    bn::BigNum,
    ec::{EcGroup, EcKey},
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    x509::{
        extension::{BasicConstraints, ExtendedKeyUsage, SubjectAlternativeName},
        X509Extension, X509NameBuilder, X509,
    },
};

/// A sample OpenSSL error, produced once by a failing parse.
fn sample_error() -> &'static openssl::error::Error {
    static SAMPLE: OnceLock<openssl::error::Error> = OnceLock::new();
    SAMPLE.get_or_init(|| {
        // The failing parse drains the queue, so set the pending entries aside.
        let pending = openssl::error::ErrorStack::get();
        let errors = X509::from_der(b"not a certificate").expect_err("parsing must fail");
        pending.put();
        errors
            .errors()
            .first()
            .expect("a parse failure reports at least one error")
            .clone()
    })
}

/// Pushes exactly one entry onto the calling thread's OpenSSL error queue,
/// leaving the entries already there untouched.
pub fn push_error() {
    sample_error().put();
}

/// Number of entries on the calling thread's OpenSSL error queue.  The queue
/// is left unchanged.
pub fn pending_error_count() -> usize {
    let errors = openssl::error::ErrorStack::get();
    let count = errors.errors().len();
    errors.put();
    count
}

/// Asserts that the calling thread's OpenSSL error queue is empty.
pub fn assert_empty_error_stack() {
    let errors = openssl::error::ErrorStack::get();
    assert!(
        errors.errors().is_empty(),
        "Error stack was non-empty: {:?}",
        errors
    );
}

/// Generates a fresh P-256 key.
pub fn generate_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

/// A certificate together with the private key of its subject.
#[derive(Debug, Clone)]
pub struct TestCertificate {
    /// The certificate.
    pub cert: X509,
    /// The private key matching the certificate's public key.
    pub key: PKey<Private>,
}

impl TestCertificate {
    /// PEM encoding of the certificate.
    pub fn pem(&self) -> Vec<u8> {
        self.cert.to_pem().unwrap()
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }
}

/// Builds [`TestCertificate`]s with the identities a test needs.
#[derive(Debug, Default, Clone)]
pub struct TestCertificateBuilder {
    common_names: Vec<String>,
    email_address: Option<String>,
    dns_names: Vec<String>,
    emails: Vec<String>,
    ips: Vec<String>,
    uris: Vec<String>,
    serial: Option<Vec<u8>>,
    ca: bool,
    extended_key_usage: bool,
    info_access: Option<String>,
    raw_extensions: Vec<(String, Vec<u8>)>,
}

impl TestCertificateBuilder {
    /// A builder for a certificate with no names at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subject common name.
    pub fn common_name(mut self, name: &str) -> Self {
        self.common_names.push(name.to_owned());
        self
    }

    /// Sets the subject `emailAddress` attribute.
    pub fn email_address(mut self, email: &str) -> Self {
        self.email_address = Some(email.to_owned());
        self
    }

    /// Adds a `dNSName` SAN entry.
    pub fn dns(mut self, name: &str) -> Self {
        self.dns_names.push(name.to_owned());
        self
    }

    /// Adds an `rfc822Name` SAN entry.
    pub fn email(mut self, email: &str) -> Self {
        self.emails.push(email.to_owned());
        self
    }

    /// Adds an `iPAddress` SAN entry.
    pub fn ip(mut self, ip: &str) -> Self {
        self.ips.push(ip.to_owned());
        self
    }

    /// Adds a `uniformResourceIdentifier` SAN entry.
    pub fn uri(mut self, uri: &str) -> Self {
        self.uris.push(uri.to_owned());
        self
    }

    /// Sets the serial number, big-endian.
    pub fn serial(mut self, serial: &[u8]) -> Self {
        self.serial = Some(serial.to_vec());
        self
    }

    /// Marks the certificate as a CA.
    pub fn ca(mut self) -> Self {
        self.ca = true;
        self
    }

    /// Adds an extended key usage extension with server and client auth.
    pub fn extended_key_usage(mut self) -> Self {
        self.extended_key_usage = true;
        self
    }

    /// Adds an authority information access extension in OpenSSL config
    /// syntax, e.g. `OCSP;URI:http://ocsp.example.com`.
    pub fn info_access(mut self, value: &str) -> Self {
        self.info_access = Some(value.to_owned());
        self
    }

    /// Adds a non-critical extension with the dotted `oid` and the given DER
    /// contents, taken as is.
    pub fn raw_extension(mut self, oid: &str, der: &[u8]) -> Self {
        self.raw_extensions.push((oid.to_owned(), der.to_vec()));
        self
    }

    /// Builds a certificate signed by `issuer`, or self-signed.
    pub fn build(self, issuer: Option<&TestCertificate>) -> TestCertificate {
        let key = generate_key();

        let mut name = X509NameBuilder::new().unwrap();
        for common_name in &self.common_names {
            name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
        }
        if let Some(email) = &self.email_address {
            name.append_entry_by_nid(Nid::PKCS9_EMAILADDRESS, email).unwrap();
        }
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();

        let serial = self.serial.unwrap_or_else(|| vec![0x01, 0x02, 0x03]);
        let serial: Asn1Integer = BigNum::from_slice(&serial)
            .unwrap()
            .to_asn1_integer()
            .unwrap();
        builder.set_serial_number(&serial).unwrap();

        builder.set_pubkey(&key).unwrap();
        builder.set_subject_name(&name).unwrap();
        let issuer_name = issuer.map_or(&*name, |issuer| issuer.cert.subject_name());
        builder.set_issuer_name(issuer_name).unwrap();

        builder
            .set_not_before(&Asn1Time::from_str("20240101000000Z").unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::from_str("20340101000000Z").unwrap())
            .unwrap();

        let mut basic_constraints = BasicConstraints::new();
        if self.ca {
            basic_constraints.critical().ca();
        }
        builder
            .append_extension(basic_constraints.build().unwrap())
            .unwrap();

        let has_san = !(self.dns_names.is_empty()
            && self.emails.is_empty()
            && self.ips.is_empty()
            && self.uris.is_empty());
        if has_san {
            let mut san = SubjectAlternativeName::new();
            for dns in &self.dns_names {
                san.dns(dns);
            }
            for email in &self.emails {
                san.email(email);
            }
            for ip in &self.ips {
                san.ip(ip);
            }
            for uri in &self.uris {
                san.uri(uri);
            }
            let san = san
                .build(&builder.x509v3_context(issuer.map(|issuer| issuer.cert.as_ref()), None))
                .unwrap();
            builder.append_extension(san).unwrap();
        }

        if self.extended_key_usage {
            let usage = ExtendedKeyUsage::new()
                .server_auth()
                .client_auth()
                .build()
                .unwrap();
            builder.append_extension(usage).unwrap();
        }

        if let Some(info_access) = &self.info_access {
            let extension = X509Extension::new_nid(
                None,
                Some(&builder.x509v3_context(None, None)),
                Nid::from_raw(crate::ffi::NID_info_access),
                info_access,
            )
            .unwrap();
            builder.append_extension(extension).unwrap();
        }

        for (oid, der) in &self.raw_extensions {
            let oid = Asn1Object::from_str(oid).unwrap();
            let contents = Asn1OctetString::new_from_bytes(der).unwrap();
            let extension = X509Extension::new_from_der(&oid, false, &contents).unwrap();
            builder.append_extension(extension).unwrap();
        }

        let signing_key = issuer.map_or(&key, |issuer| &issuer.key);
        builder.sign(signing_key, MessageDigest::sha256()).unwrap();

        TestCertificate {
            cert: builder.build(),
            key,
        }
    }
}
