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

//! Exclusive ownership of native OpenSSL resources.

use std::{ffi::c_void, fmt, ptr::NonNull};

use crate::ffi;

/// A native OpenSSL type with a matching release function.
///
/// # Safety
///
/// [`NativeResource::release`] must free a resource obtained from OpenSSL
/// for exactly this type, and must accept any such live pointer.
pub unsafe trait NativeResource {
    /// Frees `ptr`.  Never called with a null pointer.
    unsafe fn release(ptr: *mut Self);
}

/// Marks native kinds whose ownership can move between threads.
///
/// # Safety
///
/// The type must not rely on thread-local state for its lifetime.
pub unsafe trait SendableResource: NativeResource {}

macro_rules! native_resource {
    ($($ty:ty => $free:path),+ $(,)?) => {
        $(
            unsafe impl NativeResource for $ty {
                unsafe fn release(ptr: *mut Self) {
                    $free(ptr)
                }
            }
        )+
    };
}

native_resource! {
    ffi::BIGNUM => ffi::BN_clear_free,
    ffi::BN_CTX => ffi::BN_CTX_free,
    ffi::BIO => ffi::BIO_free_all,
    ffi::EVP_CIPHER_CTX => ffi::EVP_CIPHER_CTX_free,
    ffi::DH => ffi::DH_free,
    ffi::DSA => ffi::DSA_free,
    ffi::DSA_SIG => ffi::DSA_SIG_free,
    ffi::ECDSA_SIG => ffi::ECDSA_SIG_free,
    ffi::EC_KEY => ffi::EC_KEY_free,
    ffi::EC_GROUP => ffi::EC_GROUP_free,
    ffi::EC_POINT => ffi::EC_POINT_free,
    ffi::EVP_PKEY_CTX => ffi::EVP_PKEY_CTX_free,
    ffi::EVP_PKEY => ffi::EVP_PKEY_free,
    ffi::EVP_MD_CTX => ffi::EVP_MD_CTX_free,
    ffi::HMAC_CTX => ffi::HMAC_CTX_free,
    ffi::NETSCAPE_SPKI => ffi::NETSCAPE_SPKI_free,
    ffi::PKCS8_PRIV_KEY_INFO => ffi::PKCS8_PRIV_KEY_INFO_free,
    ffi::RSA => ffi::RSA_free,
    ffi::SSL_CTX => ffi::SSL_CTX_free,
    ffi::SSL => ffi::SSL_free,
    ffi::SSL_SESSION => ffi::SSL_SESSION_free,
    ffi::X509 => ffi::X509_free,
    ffi::stack_st_GENERAL_NAME => ffi::GENERAL_NAMES_free,
    ffi::stack_st_ACCESS_DESCRIPTION => ffi::AUTHORITY_INFO_ACCESS_free,
}

unsafe extern "C" fn free_asn1_object(obj: *mut c_void) {
    ffi::ASN1_OBJECT_free(obj.cast())
}

unsafe impl NativeResource for ffi::stack_st_ASN1_OBJECT {
    unsafe fn release(ptr: *mut Self) {
        ffi::OPENSSL_sk_pop_free(ptr.cast(), Some(free_asn1_object))
    }
}

unsafe impl SendableResource for ffi::BIGNUM {}
unsafe impl SendableResource for ffi::EVP_PKEY {}
unsafe impl SendableResource for ffi::X509 {}

/// Sole owner of a native OpenSSL resource.
///
/// The resource is released with [`NativeResource::release`] exactly once,
/// when the handle is dropped, reset, or cleared.  An empty handle owns
/// nothing.  Ownership moves with the value; use [`OwnedHandle::take`] to move
/// it out of a place that must stay valid.
pub struct OwnedHandle<T: NativeResource> {
    ptr: Option<NonNull<T>>,
}

impl<T: NativeResource> OwnedHandle<T> {
    /// Creates a handle that owns nothing.
    pub const fn empty() -> Self {
        Self { ptr: None }
    }

    /// Takes ownership of `ptr`.  A null pointer yields an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live resource of type `T` that nobody else
    /// releases.
    pub unsafe fn from_ptr(ptr: *mut T) -> Self {
        Self {
            ptr: NonNull::new(ptr),
        }
    }

    /// Whether the handle owns a resource.
    pub fn is_some(&self) -> bool {
        self.ptr.is_some()
    }

    /// Whether the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// The owned pointer, or null for an empty handle.  Ownership is kept.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Releases the current resource, if any, and takes ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// Same contract as [`OwnedHandle::from_ptr`].  `ptr` must not be the
    /// pointer currently owned.
    pub unsafe fn reset(&mut self, ptr: *mut T) {
        let previous = std::mem::replace(&mut self.ptr, NonNull::new(ptr));
        if let Some(previous) = previous {
            T::release(previous.as_ptr());
        }
    }

    /// Releases the current resource, if any, leaving the handle empty.
    pub fn clear(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe { T::release(ptr.as_ptr()) };
        }
    }

    /// Gives up ownership without releasing.  The caller becomes responsible
    /// for the returned pointer, which is null for an empty handle.
    #[must_use = "the released pointer leaks unless freed"]
    pub fn release(&mut self) -> *mut T {
        self.ptr.take().map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Moves ownership into a new handle, leaving this one empty.
    pub fn take(&mut self) -> Self {
        Self {
            ptr: self.ptr.take(),
        }
    }
}

impl<T: NativeResource> Drop for OwnedHandle<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: NativeResource> Default for OwnedHandle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: NativeResource> fmt::Debug for OwnedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedHandle")
            .field(&std::any::type_name::<T>())
            .field(&self.as_ptr())
            .finish()
    }
}

unsafe impl<T: SendableResource> Send for OwnedHandle<T> {}

/// Owning handle of a `BN_CTX`.
pub type BnCtxHandle = OwnedHandle<ffi::BN_CTX>;
/// Owning handle of a `BIO` chain.
pub type BioHandle = OwnedHandle<ffi::BIO>;
/// Owning handle of an `EVP_CIPHER_CTX`.
pub type CipherCtxHandle = OwnedHandle<ffi::EVP_CIPHER_CTX>;
/// Owning handle of a `DH`.
pub type DhHandle = OwnedHandle<ffi::DH>;
/// Owning handle of a `DSA`.
pub type DsaHandle = OwnedHandle<ffi::DSA>;
/// Owning handle of a `DSA_SIG`.
pub type DsaSigHandle = OwnedHandle<ffi::DSA_SIG>;
/// Owning handle of an `ECDSA_SIG`.
pub type EcdsaSigHandle = OwnedHandle<ffi::ECDSA_SIG>;
/// Owning handle of an `EC_KEY`.
pub type EcKeyHandle = OwnedHandle<ffi::EC_KEY>;
/// Owning handle of an `EC_GROUP`.
pub type EcGroupHandle = OwnedHandle<ffi::EC_GROUP>;
/// Owning handle of an `EC_POINT`.
pub type EcPointHandle = OwnedHandle<ffi::EC_POINT>;
/// Owning handle of an `EVP_PKEY_CTX`.
pub type EvpPkeyCtxHandle = OwnedHandle<ffi::EVP_PKEY_CTX>;
/// Owning handle of an `EVP_PKEY`.
pub type EvpPkeyHandle = OwnedHandle<ffi::EVP_PKEY>;
/// Owning handle of an `EVP_MD_CTX`.
pub type EvpMdCtxHandle = OwnedHandle<ffi::EVP_MD_CTX>;
/// Owning handle of an `HMAC_CTX`.
pub type HmacCtxHandle = OwnedHandle<ffi::HMAC_CTX>;
/// Owning handle of a `NETSCAPE_SPKI`.
pub type SpkiHandle = OwnedHandle<ffi::NETSCAPE_SPKI>;
/// Owning handle of a `PKCS8_PRIV_KEY_INFO`.
pub type Pkcs8Handle = OwnedHandle<ffi::PKCS8_PRIV_KEY_INFO>;
/// Owning handle of an `RSA`.
pub type RsaHandle = OwnedHandle<ffi::RSA>;
/// Owning handle of an `SSL_CTX`.
pub type SslCtxHandle = OwnedHandle<ffi::SSL_CTX>;
/// Owning handle of an `SSL`.
pub type SslHandle = OwnedHandle<ffi::SSL>;
/// Owning handle of an `SSL_SESSION`.
pub type SslSessionHandle = OwnedHandle<ffi::SSL_SESSION>;
/// Owning handle of an `X509`.
pub type X509Handle = OwnedHandle<ffi::X509>;
/// Owning handle of a `BIGNUM`, wiped on release.
pub type BignumHandle = OwnedHandle<ffi::BIGNUM>;
/// Owning handle of a `STACK_OF(ASN1_OBJECT)`, freeing the objects with the
/// stack.
pub type ObjectStack = OwnedHandle<ffi::stack_st_ASN1_OBJECT>;
pub(crate) type GeneralNames = OwnedHandle<ffi::stack_st_GENERAL_NAME>;
pub(crate) type AccessDescriptions = OwnedHandle<ffi::stack_st_ACCESS_DESCRIPTION>;
