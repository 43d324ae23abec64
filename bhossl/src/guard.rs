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

//! Scoped guards over OpenSSL's thread-local error queue.
//!
//! Both guards are bound to the thread that created them and never fail.

use std::{ffi::c_ulong, marker::PhantomData};

use tracing::debug;

use crate::{error_stack::ErrorStack, ffi};

/// Clears the whole error queue when dropped.
///
/// If a destination [`ErrorStack`] is given, the queue is captured into it
/// first.
#[must_use = "the queue is cleared when the guard is dropped"]
pub struct ClearErrorOnDrop<'a> {
    errors: Option<&'a mut ErrorStack>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ClearErrorOnDrop<'a> {
    /// Creates the guard, optionally capturing into `errors` on drop.
    pub fn new(errors: Option<&'a mut ErrorStack>) -> Self {
        Self {
            errors,
            _not_send: PhantomData,
        }
    }

    /// Packed code of the oldest pending error, `0` if the queue is empty.
    pub fn peek_error(&self) -> c_ulong {
        unsafe { ffi::ERR_peek_error() }
    }
}

impl Drop for ClearErrorOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(errors) = self.errors.as_deref_mut() {
            let count = errors.capture();
            if count > 0 {
                debug!(count, "captured OpenSSL errors before clearing the queue");
            }
        }
        unsafe { ffi::ERR_clear_error() };
    }
}

/// Restores the error queue to the state it had at construction when
/// dropped.
///
/// Entries already pending are set aside while the guard is alive, so the
/// queue only ever holds entries pushed inside the scope.  On drop those are
/// moved into the destination [`ErrorStack`] if one is given, and discarded
/// otherwise; the set-aside entries then return to the queue in their
/// original order.
#[must_use = "the queue is restored when the guard is dropped"]
pub struct MarkPopErrorOnDrop<'a> {
    errors: Option<&'a mut ErrorStack>,
    pending: openssl::error::ErrorStack,
    _not_send: PhantomData<*const ()>,
}

impl<'a> MarkPopErrorOnDrop<'a> {
    /// Creates the guard, setting the pending entries aside.
    pub fn new(errors: Option<&'a mut ErrorStack>) -> Self {
        Self {
            errors,
            pending: openssl::error::ErrorStack::get(),
            _not_send: PhantomData,
        }
    }

    /// Packed code of the oldest pending error, `0` if the queue is empty.
    pub fn peek_error(&self) -> c_ulong {
        match self.pending.errors().first() {
            Some(error) => error.code(),
            None => unsafe { ffi::ERR_peek_error() },
        }
    }
}

impl Drop for MarkPopErrorOnDrop<'_> {
    fn drop(&mut self) {
        let added = openssl::error::ErrorStack::get();
        let added = added.errors();
        self.pending.put();

        if added.is_empty() {
            return;
        }

        match self.errors.as_deref_mut() {
            Some(errors) => {
                errors.extend(added);
                debug!(count = added.len(), "captured OpenSSL errors");
            }
            None => debug!(count = added.len(), "discarded OpenSSL errors"),
        }
    }
}
