// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Book catalog.
//!
//! The [`Catalog`] owns the set of book titles and, per title, the total
//! and currently-available copy counts. Availability is only ever mutated
//! by the lending ledger, inside the per-book critical section exposed
//! through [`Catalog::with_book_mut`].
//!
//! # Invariants
//!
//! - `0 <= available_copies <= total_copies` for every book.
//! - No two books share an ISBN.
//! - Book ids are unique and never reused.

use crate::base::BookId;
use crate::error::{LedgerError, LedgerResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// A book title with its copy counters.
///
/// This is both the stored state (behind the catalog's per-book mutex)
/// and the snapshot type returned by read queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
}

impl Book {
    fn assert_invariants(&self) {
        debug_assert!(
            self.available_copies <= self.total_copies,
            "Invariant violated: book {} has {} available of {} total",
            self.id,
            self.available_copies,
            self.total_copies
        );
    }

    /// Takes one copy off the shelf for a new loan.
    pub(crate) fn reserve_copy(&mut self) -> LedgerResult<()> {
        if self.available_copies == 0 {
            return Err(LedgerError::NoCopiesAvailable(self.id));
        }
        self.available_copies -= 1;
        self.assert_invariants();
        Ok(())
    }

    /// Puts one copy back on the shelf after a return.
    ///
    /// A release that would push `available_copies` past `total_copies`
    /// is capped and logged instead of corrupting the counter. The
    /// ledger releases exactly once per loan, so a capped release means
    /// some caller is double-releasing.
    pub(crate) fn release_copy(&mut self) {
        if self.available_copies >= self.total_copies {
            tracing::warn!(
                book = %self.id,
                total_copies = self.total_copies,
                "release_copy past total_copies; capping instead of over-counting"
            );
            return;
        }
        self.available_copies += 1;
        self.assert_invariants();
    }
}

/// Keyed store of book titles with atomic ISBN uniqueness.
///
/// Books live behind a per-book [`Mutex`] inside a [`DashMap`], so
/// operations on different books proceed in parallel while any
/// check-then-write on a single book is serialized.
#[derive(Debug)]
pub struct Catalog {
    /// Books indexed by id; the mutex is the per-book critical section.
    books: DashMap<BookId, Mutex<Book>>,
    /// ISBN to book id, for O(1) duplicate detection on creation.
    isbn_index: DashMap<String, BookId>,
    /// Next book id to allocate; ids start at 1.
    next_id: AtomicU32,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            isbn_index: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Adds a new title with `total_copies` copies, all available.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] - empty title or author, or
    ///   `total_copies == 0`.
    /// - [`LedgerError::DuplicateIsbn`] - another book already carries
    ///   this ISBN.
    pub fn add_book(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
        total_copies: u32,
    ) -> LedgerResult<BookId> {
        if title.is_empty() {
            return Err(LedgerError::InvalidArgument("title must not be empty"));
        }
        if author.is_empty() {
            return Err(LedgerError::InvalidArgument("author must not be empty"));
        }
        if total_copies == 0 {
            return Err(LedgerError::InvalidArgument("total_copies must be positive"));
        }
        // An empty ISBN means "absent": it never participates in
        // uniqueness.
        let isbn = isbn.filter(|s| !s.is_empty());

        let id = BookId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // Use entry API for atomic check-and-insert so concurrent adds
        // with the same ISBN yield exactly one success. A losing racer
        // burns an id; uniqueness, not density, is the invariant.
        if let Some(isbn) = isbn {
            match self.isbn_index.entry(isbn.to_owned()) {
                Entry::Occupied(_) => return Err(LedgerError::DuplicateIsbn(isbn.to_owned())),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        let book = Book {
            id,
            title: title.to_owned(),
            author: author.to_owned(),
            isbn: isbn.map(str::to_owned),
            total_copies,
            available_copies: total_copies,
        };
        self.books.insert(id, Mutex::new(book));
        tracing::debug!(book = %id, title, "book added");
        Ok(id)
    }

    /// Returns a snapshot of the book.
    ///
    /// # Errors
    ///
    /// [`LedgerError::BookNotFound`] if no book has this id.
    pub fn get(&self, id: BookId) -> LedgerResult<Book> {
        let entry = self.books.get(&id).ok_or(LedgerError::BookNotFound(id))?;
        let book = entry.lock();
        Ok(book.clone())
    }

    /// Returns snapshots of all books in id order.
    ///
    /// Safe to call concurrently with mutations: each book is cloned
    /// under its own lock, so no snapshot shows a half-applied update.
    pub fn list(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.iter().map(|entry| entry.lock().clone()).collect();
        books.sort_by_key(|book| book.id);
        books
    }

    /// Number of titles in the catalog.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Runs `f` under the book's mutex.
    ///
    /// This is the mutual-exclusion scope keyed by book id: everything
    /// `f` does (reserve a copy, append a loan record) is one atomic
    /// unit relative to all other issue/return calls on the same book.
    pub(crate) fn with_book_mut<T>(
        &self,
        id: BookId,
        f: impl FnOnce(&mut Book) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let entry = self.books.get(&id).ok_or(LedgerError::BookNotFound(id))?;
        let mut book = entry.lock();
        f(&mut book)
    }

    /// Re-inserts a book from a persisted snapshot.
    ///
    /// Counters are taken as stored; the ledger's loader cross-checks
    /// them against the loan log afterwards.
    pub(crate) fn restore_book(&self, book: Book) -> LedgerResult<()> {
        if book.available_copies > book.total_copies {
            return Err(LedgerError::Storage(format!(
                "book {}: available_copies {} exceeds total_copies {}",
                book.id, book.available_copies, book.total_copies
            )));
        }
        if let Some(ref isbn) = book.isbn {
            match self.isbn_index.entry(isbn.clone()) {
                Entry::Occupied(_) => {
                    return Err(LedgerError::Storage(format!("duplicate ISBN in snapshot: {isbn}")));
                }
                Entry::Vacant(slot) => {
                    slot.insert(book.id);
                }
            }
        }
        self.next_id.fetch_max(book.id.0 + 1, Ordering::Relaxed);
        if self.books.insert(book.id, Mutex::new(book)).is_some() {
            return Err(LedgerError::Storage("duplicate book id in snapshot".into()));
        }
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
