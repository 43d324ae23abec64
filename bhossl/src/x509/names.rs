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

//! Typed access to names stored in certificate extensions and subjects.

use std::{ffi::c_int, ptr};

use bherror::traits::ErrorContext as _;

use crate::{
    buffer::OwnedBuffer,
    error::{Error, Result},
    error_stack::guarded,
    ffi,
    handle::{NativeResource, OwnedHandle},
};

/// Contents of an `ASN1_STRING`, borrowed from its owner.
pub(crate) unsafe fn asn1_bytes<'a>(string: *const ffi::ASN1_STRING) -> &'a [u8] {
    if string.is_null() {
        return &[];
    }
    let data = ffi::ASN1_STRING_get0_data(string);
    let len = ffi::ASN1_STRING_length(string);
    if data.is_null() || len <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(data, len as usize)
}

/// One entry of a `GENERAL_NAMES` sequence.
#[derive(Debug, Clone, Copy)]
pub(crate) enum GeneralName<'a> {
    Email(&'a [u8]),
    Dns(&'a [u8]),
    Uri(&'a [u8]),
    IpAddress(&'a [u8]),
    DirName(*const ffi::X509_NAME),
    RegisteredId(*const ffi::ASN1_OBJECT),
    OtherName,
    X400Address,
    EdiPartyName,
}

impl<'a> GeneralName<'a> {
    /// # Safety
    ///
    /// `name` must point to a `GENERAL_NAME` that outlives `'a`.
    pub(crate) unsafe fn from_ptr(name: *const ffi::GENERAL_NAME) -> Self {
        let d = (*name).d;
        match (*name).type_ {
            ffi::GEN_EMAIL => Self::Email(asn1_bytes(d.cast())),
            ffi::GEN_DNS => Self::Dns(asn1_bytes(d.cast())),
            ffi::GEN_URI => Self::Uri(asn1_bytes(d.cast())),
            ffi::GEN_IPADD => Self::IpAddress(asn1_bytes(d.cast())),
            ffi::GEN_DIRNAME => Self::DirName(d.cast()),
            ffi::GEN_RID => Self::RegisteredId(d.cast()),
            ffi::GEN_X400 => Self::X400Address,
            ffi::GEN_EDIPARTY => Self::EdiPartyName,
            _ => Self::OtherName,
        }
    }
}

/// Iterates over the raw elements of an OpenSSL stack owned by `handle`.
pub(crate) fn stack_items<T, E>(handle: &OwnedHandle<T>) -> impl Iterator<Item = *mut E> + '_
where
    T: NativeResource,
{
    let stack = handle.as_ptr() as *const ffi::OPENSSL_STACK;
    let len = if stack.is_null() {
        0
    } else {
        unsafe { ffi::OPENSSL_sk_num(stack) }.max(0)
    };

    (0..len).map(move |i| unsafe { ffi::OPENSSL_sk_value(stack, i) }.cast::<E>())
}

/// Entries of a `GENERAL_NAMES` sequence.
pub(crate) fn general_names<T: NativeResource>(
    names: &OwnedHandle<T>,
) -> impl Iterator<Item = GeneralName<'_>> + '_ {
    stack_items::<T, ffi::GENERAL_NAME>(names)
        .filter(|name| !name.is_null())
        .map(|name| unsafe { GeneralName::from_ptr(name) })
}

/// Decodes a copy of the extension `nid` of `cert`.
///
/// Returns `Ok(None)` when the extension is absent, and an error when it is
/// present but cannot be decoded.
pub(crate) unsafe fn extension<T: NativeResource>(
    cert: *const ffi::X509,
    nid: c_int,
) -> Result<Option<OwnedHandle<T>>> {
    let mut crit: c_int = 0;
    let (value, errors) =
        guarded(|| ffi::X509_get_ext_d2i(cert, nid, &mut crit, ptr::null_mut()));

    if !value.is_null() {
        return Ok(Some(OwnedHandle::from_ptr(value.cast())));
    }
    if crit == -1 {
        return Ok(None);
    }

    errors
        .fail(Error::OperationFailed)
        .ctx(|| format!("unable to decode extension with NID {nid}"))
}

/// UTF-8 values of every subject attribute `nid`, in certificate order.
pub(crate) unsafe fn subject_entries(
    cert: *const ffi::X509,
    nid: c_int,
) -> Result<Vec<OwnedBuffer>> {
    let name = ffi::X509_get_subject_name(cert);
    if name.is_null() {
        return Err(bherror::Error::root(Error::OperationFailed).ctx("certificate has no subject"));
    }

    let mut entries = Vec::new();
    let mut position = -1;
    loop {
        position = ffi::X509_NAME_get_index_by_NID(name, nid, position);
        if position < 0 {
            break;
        }

        let entry = ffi::X509_NAME_get_entry(name, position);
        let data = ffi::X509_NAME_ENTRY_get_data(entry);
        let mut utf8 = ptr::null_mut();
        let (len, errors) = guarded(|| ffi::ASN1_STRING_to_UTF8(&mut utf8, data));
        if len < 0 {
            return errors
                .fail(Error::OperationFailed)
                .ctx(|| "unable to convert a subject attribute to UTF-8");
        }

        entries.push(OwnedBuffer::from_raw(utf8.cast(), len as usize));
    }

    Ok(entries)
}
