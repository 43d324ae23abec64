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

//! Unambiguous rendering of subject alternative names and information access
//! descriptions.
//!
//! Names that could be mistaken for list separators or quoting are emitted
//! as JSON string literals, so a certificate cannot smuggle an extra entry
//! into the listing.

use std::ffi::{c_char, c_int, CStr};

use crate::{
    bio::MemBio,
    error::{Error, Result},
    error_stack::guarded,
    ffi,
    handle::{AccessDescriptions, GeneralNames},
};

use super::names::{general_names, stack_items, GeneralName};

const DIR_NAME_FLAGS: std::ffi::c_ulong = ffi::ASN1_STRFLGS_ESC_2253
    | ffi::ASN1_STRFLGS_UTF8_CONVERT
    | ffi::ASN1_STRFLGS_DUMP_UNKNOWN
    | ffi::ASN1_STRFLGS_DUMP_DER
    | ffi::XN_FLAG_SEP_COMMA_PLUS
    | ffi::XN_FLAG_DN_REV
    | ffi::XN_FLAG_FN_SN
    | ffi::XN_FLAG_DUMP_UNKNOWN_FIELDS;

/// Whether `name` can be printed verbatim.
///
/// UTF-8 names may carry non-ASCII bytes; other names must be printable
/// ASCII.
pub(crate) fn is_safe_alt_name(name: &[u8], utf8: bool) -> bool {
    name.iter().all(|&c| match c {
        b'"' | b'\\' | b',' | b'\'' => false,
        _ if utf8 => c >= b' ' && c != 0x7F,
        _ => (b' '..=b'~').contains(&c),
    })
}

/// Appends `name`, JSON-quoted unless it is safe.
pub(crate) fn write_alt_name(out: &mut Vec<u8>, name: &[u8], utf8: bool, prefix: Option<&str>) {
    if is_safe_alt_name(name, utf8) {
        if let Some(prefix) = prefix {
            out.extend_from_slice(prefix.as_bytes());
            out.push(b':');
        }
        out.extend_from_slice(name);
        return;
    }

    out.push(b'"');
    if let Some(prefix) = prefix {
        out.extend_from_slice(prefix.as_bytes());
        out.push(b':');
    }
    for &c in name {
        match c {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'"' => out.extend_from_slice(b"\\\""),
            b' '..=b'~' if c != b',' => out.push(c),
            _ if utf8 && c & 0x80 != 0 => out.push(c),
            // Everything else is treated as Latin-1.
            _ => {
                const HEX: &[u8; 16] = b"0123456789abcdef";
                out.extend_from_slice(b"\\u00");
                out.push(HEX[usize::from(c >> 4)]);
                out.push(HEX[usize::from(c & 0x0F)]);
            }
        }
    }
    out.push(b'"');
}

fn write_ip_address(out: &mut Vec<u8>, ip: &[u8]) {
    match ip.len() {
        4 => out.extend_from_slice(format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]).as_bytes()),
        16 => {
            let groups: Vec<String> = ip
                .chunks_exact(2)
                .map(|pair| format!("{:X}", u16::from_be_bytes([pair[0], pair[1]])))
                .collect();
            out.extend_from_slice(groups.join(":").as_bytes());
        }
        _ => out.extend_from_slice(b"<invalid>"),
    }
}

/// Numeric dotted form of `obj`, or its long name when `numeric` is false.
pub(crate) unsafe fn object_text(obj: *const ffi::ASN1_OBJECT, numeric: bool) -> String {
    let mut buf = [0 as c_char; 128];
    let len = ffi::OBJ_obj2txt(buf.as_mut_ptr(), buf.len() as c_int, obj, c_int::from(numeric));
    if len <= 0 {
        return String::new();
    }
    CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned()
}

fn write_general_name(out: &mut Vec<u8>, name: GeneralName<'_>) -> Result<()> {
    match name {
        GeneralName::Dns(dns) => {
            out.extend_from_slice(b"DNS:");
            write_alt_name(out, dns, false, None);
        }
        GeneralName::Email(email) => {
            out.extend_from_slice(b"email:");
            write_alt_name(out, email, false, None);
        }
        GeneralName::Uri(uri) => {
            out.extend_from_slice(b"URI:");
            write_alt_name(out, uri, false, None);
        }
        GeneralName::DirName(dir_name) => {
            let rendered = MemBio::new()?;
            let (status, errors) = guarded(|| unsafe {
                ffi::X509_NAME_print_ex(rendered.as_ptr(), dir_name, 0, DIR_NAME_FLAGS)
            });
            if status < 0 {
                return errors.fail(Error::OperationFailed);
            }
            out.extend_from_slice(b"DirName:");
            write_alt_name(out, rendered.as_bytes(), true, None);
        }
        GeneralName::IpAddress(ip) => {
            out.extend_from_slice(b"IP Address:");
            write_ip_address(out, ip);
        }
        GeneralName::RegisteredId(oid) => {
            out.extend_from_slice(b"Registered ID:");
            out.extend_from_slice(unsafe { object_text(oid, true) }.as_bytes());
        }
        GeneralName::OtherName => out.extend_from_slice(b"othername:<unsupported>"),
        GeneralName::X400Address => out.extend_from_slice(b"X400Name:<unsupported>"),
        GeneralName::EdiPartyName => out.extend_from_slice(b"EdiPartyName:<unsupported>"),
    }
    Ok(())
}

/// Renders a subject alternative name extension as `, `-separated entries.
pub(crate) fn print_subject_alt_names(names: &GeneralNames) -> Result<MemBio> {
    let mut out = Vec::new();
    for (i, name) in general_names(names).enumerate() {
        if i != 0 {
            out.extend_from_slice(b", ");
        }
        write_general_name(&mut out, name)?;
    }

    let mut bio = MemBio::new()?;
    bio.write(&out)?;
    Ok(bio)
}

/// Renders an information access extension, one `method - location` line per
/// description.
pub(crate) fn print_info_access(descriptions: &AccessDescriptions) -> Result<MemBio> {
    let mut out = Vec::new();
    let items = stack_items::<_, ffi::ACCESS_DESCRIPTION>(descriptions)
        .filter(|description| !description.is_null());
    for (i, description) in items.enumerate() {
        if i != 0 {
            out.push(b'\n');
        }
        let (method, location) = unsafe { ((*description).method, (*description).location) };
        out.extend_from_slice(unsafe { object_text(method, false) }.as_bytes());
        out.extend_from_slice(b" - ");
        if location.is_null() {
            return Err(bherror::Error::root(Error::OperationFailed)
                .ctx("access description without a location"));
        }
        write_general_name(&mut out, unsafe { GeneralName::from_ptr(location) })?;
    }

    let mut bio = MemBio::new()?;
    bio.write(&out)?;
    Ok(bio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alt_name(name: &[u8], utf8: bool, prefix: Option<&str>) -> String {
        let mut out = Vec::new();
        write_alt_name(&mut out, name, utf8, prefix);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_safe_names_are_verbatim() {
        assert_eq!(alt_name(b"example.com", false, None), "example.com");
        assert_eq!(alt_name(b"a b", false, Some("DNS")), "DNS:a b");
        assert_eq!(alt_name("zürich".as_bytes(), true, None), "zürich");
    }

    #[test]
    fn test_separators_are_quoted() {
        assert_eq!(
            alt_name(b"evil.com, DNS:good.com", false, None),
            r#""evil.com\u002c DNS:good.com""#
        );
        assert_eq!(alt_name(b"it's", false, None), r#""it's""#);
        assert_eq!(alt_name(br#"a"b\c"#, false, None), r#""a\"b\\c""#);
    }

    #[test]
    fn test_control_and_high_bytes_are_escaped() {
        assert_eq!(alt_name(b"a\nb", true, None), r#""a\u000ab""#);
        assert_eq!(alt_name(&[b'x', 0xE9], false, None), r#""x\u00e9""#);
        assert_eq!(alt_name(b"x\x7f", true, Some("p")), r#""p:x\u007f""#);
    }

    #[test]
    fn test_is_safe_alt_name() {
        assert!(is_safe_alt_name(b"", false));
        assert!(is_safe_alt_name(b"*.example.com", false));
        assert!(!is_safe_alt_name(b"a,b", true));
        assert!(!is_safe_alt_name(&[0xC3, 0xA9], false));
        assert!(is_safe_alt_name(&[0xC3, 0xA9], true));
    }

    #[test]
    fn test_ip_addresses() {
        let mut out = Vec::new();
        write_ip_address(&mut out, &[192, 168, 0, 1]);
        assert_eq!(out, b"192.168.0.1");

        let mut out = Vec::new();
        let mut v6 = [0u8; 16];
        v6[0] = 0x20;
        v6[1] = 0x01;
        v6[2] = 0x0d;
        v6[3] = 0xb8;
        v6[15] = 0x01;
        write_ip_address(&mut out, &v6);
        assert_eq!(out, b"2001:DB8:0:0:0:0:0:1");

        let mut out = Vec::new();
        write_ip_address(&mut out, &[1, 2, 3]);
        assert_eq!(out, b"<invalid>");
    }
}
