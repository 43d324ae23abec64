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

//! Snapshot of OpenSSL's thread-local error queue.

use std::collections::VecDeque;

use bherror::traits::ForeignError as _;

use crate::{
    error::{Error, Result},
    guard::MarkPopErrorOnDrop,
};

/// An ordered collection of human-readable OpenSSL error messages, oldest
/// first.
///
/// Entries are appended by [`ErrorStack::capture`] or [`ErrorStack::add`] and
/// removed from either end.  The stack is never reordered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorStack {
    entries: VecDeque<String>,
}

impl ErrorStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stack holding everything currently on the thread's queue,
    /// leaving the queue empty.
    pub fn captured() -> Self {
        let mut stack = Self::new();
        stack.capture();
        stack
    }

    /// Drains the thread's OpenSSL error queue into this stack, preserving
    /// chronological order.  Returns the number of captured entries.
    pub fn capture(&mut self) -> usize {
        let drained = openssl::error::ErrorStack::get();
        self.extend(drained.errors());
        drained.errors().len()
    }

    pub(crate) fn extend(&mut self, errors: &[openssl::error::Error]) {
        self.entries.extend(errors.iter().map(ToString::to_string));
    }

    /// Appends a message to the back of the stack.
    pub fn add(&mut self, message: impl Into<String>) {
        self.entries.push_back(message.into());
    }

    /// Returns the most recent entry.
    pub fn peek_back(&self) -> Result<&str> {
        self.entries
            .back()
            .map(String::as_str)
            .ok_or_else(|| bherror::Error::root(Error::EmptyStack))
    }

    /// Removes and returns the most recent entry.
    pub fn pop_back(&mut self) -> Option<String> {
        self.entries.pop_back()
    }

    /// Removes and returns the oldest entry.
    pub fn pop_front(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates from the oldest entry to the most recent one.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.entries.iter().map(String::as_str)
    }

    /// Wraps `error` into a [`bherror::Error`] with this stack as its source.
    #[track_caller]
    pub(crate) fn fail<T>(self, error: Error) -> Result<T> {
        Err(self).foreign_err(|| error)
    }
}

impl std::fmt::Display for ErrorStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("no OpenSSL errors reported");
        }

        for (i, entry) in self.entries.iter().enumerate() {
            if i != 0 {
                f.write_str("; ")?;
            }
            f.write_str(entry)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorStack {}

impl<'a> IntoIterator for &'a ErrorStack {
    type Item = &'a String;
    type IntoIter = std::collections::vec_deque::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Runs `f` under a [`MarkPopErrorOnDrop`] guard and returns its result
/// together with every error it pushed onto the thread's queue.
///
/// Errors that were pending before the call stay on the queue.
pub fn guarded<T>(f: impl FnOnce() -> T) -> (T, ErrorStack) {
    let mut errors = ErrorStack::new();
    let value = {
        let _guard = MarkPopErrorOnDrop::new(Some(&mut errors));
        f()
    };
    (value, errors)
}
