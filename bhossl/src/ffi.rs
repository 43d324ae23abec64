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

//! Raw `libcrypto` bindings.
//!
//! Everything `openssl-sys` exports is re-exported as is.  The symbols it
//! lacks are declared here, together with the C macros this crate needs.
//! OpenSSL 3.0 or newer is assumed.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(missing_docs)]

use std::ffi::{c_char, c_int, c_ulong, c_void};

pub use openssl_sys::*;

#[repr(C)]
pub struct NETSCAPE_SPKAC {
    pub pubkey: *mut c_void,
    pub challenge: *mut ASN1_STRING,
}

/// Only the leading field is declared; the struct is never allocated on the
/// Rust side.
#[repr(C)]
pub struct NETSCAPE_SPKI {
    pub spkac: *mut NETSCAPE_SPKAC,
    _rest: [u8; 0],
}

pub const ASN1_STRFLGS_ESC_2253: c_ulong = 1;
pub const ASN1_STRFLGS_ESC_CTRL: c_ulong = 2;
pub const ASN1_STRFLGS_UTF8_CONVERT: c_ulong = 0x10;
pub const ASN1_STRFLGS_DUMP_UNKNOWN: c_ulong = 0x100;
pub const ASN1_STRFLGS_DUMP_DER: c_ulong = 0x200;
pub const XN_FLAG_SEP_COMMA_PLUS: c_ulong = 1 << 16;
pub const XN_FLAG_SEP_MULTILINE: c_ulong = 4 << 16;
pub const XN_FLAG_DN_REV: c_ulong = 1 << 20;
pub const XN_FLAG_FN_SN: c_ulong = 0;
pub const XN_FLAG_DUMP_UNKNOWN_FIELDS: c_ulong = 1 << 24;

extern "C" {
    pub fn ERR_peek_error() -> c_ulong;

    pub fn CRYPTO_zalloc(num: usize, file: *const c_char, line: c_int) -> *mut c_void;
    pub fn CRYPTO_clear_free(ptr: *mut c_void, num: usize, file: *const c_char, line: c_int);

    pub fn BN_is_zero(bn: *const BIGNUM) -> c_int;
    pub fn BN_is_one(bn: *const BIGNUM) -> c_int;
    pub fn BN_get_word(bn: *const BIGNUM) -> BN_ULONG;
    pub fn BN_value_one() -> *const BIGNUM;

    pub fn X509_NAME_print_ex(
        out: *mut BIO,
        name: *const X509_NAME,
        indent: c_int,
        flags: c_ulong,
    ) -> c_int;
    pub fn X509_get0_notBefore(x: *const X509) -> *const ASN1_TIME;
    pub fn X509_get0_notAfter(x: *const X509) -> *const ASN1_TIME;
    pub fn X509_get0_serialNumber(x: *const X509) -> *const ASN1_INTEGER;
    pub fn X509_check_ca(x: *mut X509) -> c_int;
    pub fn X509_check_private_key(x: *const X509, pkey: *const EVP_PKEY) -> c_int;
    pub fn GENERAL_NAMES_free(names: *mut stack_st_GENERAL_NAME);
    pub fn AUTHORITY_INFO_ACCESS_free(aia: *mut stack_st_ACCESS_DESCRIPTION);

    pub fn NETSCAPE_SPKI_b64_decode(s: *const c_char, len: c_int) -> *mut NETSCAPE_SPKI;
    pub fn NETSCAPE_SPKI_get_pubkey(spki: *mut NETSCAPE_SPKI) -> *mut EVP_PKEY;
    pub fn NETSCAPE_SPKI_verify(spki: *mut NETSCAPE_SPKI, pkey: *mut EVP_PKEY) -> c_int;
    pub fn NETSCAPE_SPKI_free(spki: *mut NETSCAPE_SPKI);

    pub fn OSSL_PROVIDER_available(libctx: *mut OSSL_LIB_CTX, name: *const c_char) -> c_int;
    pub fn OSSL_PROVIDER_self_test(provider: *const OSSL_PROVIDER) -> c_int;

    pub fn RAND_poll() -> c_int;
}

#[cfg(test)]
extern "C" {
    pub fn NETSCAPE_SPKI_new() -> *mut NETSCAPE_SPKI;
    pub fn NETSCAPE_SPKI_set_pubkey(spki: *mut NETSCAPE_SPKI, pkey: *mut EVP_PKEY) -> c_int;
    pub fn NETSCAPE_SPKI_sign(
        spki: *mut NETSCAPE_SPKI,
        pkey: *mut EVP_PKEY,
        md: *const EVP_MD,
    ) -> c_int;
    pub fn NETSCAPE_SPKI_b64_encode(spki: *mut NETSCAPE_SPKI) -> *mut c_char;
}

/// The `OPENSSL_zalloc` macro.
pub unsafe fn OPENSSL_zalloc(num: usize) -> *mut c_void {
    CRYPTO_zalloc(num, concat!(file!(), "\0").as_ptr().cast(), line!() as c_int)
}

/// The `OPENSSL_clear_free` macro.
pub unsafe fn OPENSSL_clear_free(ptr: *mut c_void, num: usize) {
    CRYPTO_clear_free(ptr, num, concat!(file!(), "\0").as_ptr().cast(), line!() as c_int)
}

/// The `BN_num_bytes` macro.
pub unsafe fn BN_num_bytes(bn: *const BIGNUM) -> c_int {
    (BN_num_bits(bn) + 7) / 8
}
