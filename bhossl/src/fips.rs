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

//! FIPS mode of the default library context.

use crate::{
    error::{Error, Result},
    error_stack::guarded,
    ffi,
};

/// Whether algorithm fetches default to FIPS-approved implementations.
pub fn is_fips_enabled() -> bool {
    unsafe { ffi::EVP_default_properties_is_fips_enabled(std::ptr::null_mut()) == 1 }
}

/// Turns FIPS mode on or off.  Nothing is done if the mode already matches.
pub fn set_fips_enabled(enabled: bool) -> Result<()> {
    if is_fips_enabled() == enabled {
        return Ok(());
    }

    let (status, errors) = guarded(|| unsafe {
        ffi::EVP_default_properties_enable_fips(std::ptr::null_mut(), i32::from(enabled))
    });
    if status != 1 {
        return errors.fail(Error::Fips);
    }
    Ok(())
}

/// Whether a FIPS provider is installed and passes its self test.
pub fn test_fips_enabled() -> bool {
    let (available, _) = guarded(|| unsafe {
        if ffi::OSSL_PROVIDER_available(std::ptr::null_mut(), c"fips".as_ptr()) != 1 {
            return false;
        }

        let provider = ffi::OSSL_PROVIDER_load(std::ptr::null_mut(), c"fips".as_ptr());
        if provider.is_null() {
            return false;
        }
        let passed = ffi::OSSL_PROVIDER_self_test(provider) == 1;
        ffi::OSSL_PROVIDER_unload(provider);
        passed
    });
    available
}
