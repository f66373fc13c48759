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

//! Lending ledger.
//!
//! The [`LendingLedger`] is the sole authority that mutates available
//! copies on the [`Catalog`]. It owns the append-only loan log and makes
//! "check availability, reserve, append record" one atomic unit per
//! book, and "mark returned, release copy" similarly atomic and
//! idempotent.
//!
//! # Thread Safety
//!
//! Operations touching the same book are serialized by that book's
//! mutex, entered through [`Catalog::with_book_mut`]. Operations on
//! different books proceed fully in parallel. The only lock order is
//! book mutex first, loan-log entry second, so issue and return can
//! never deadlock against each other.
//!
//! # Invariants
//!
//! - For every book, `available_copies == total_copies - |{loans for it
//!   with returned == false}|` whenever the book's critical section is
//!   not held.
//! - Loan ids are unique and monotonically increasing.
//! - A loan's `returned` flag flips to true at most once; exactly one
//!   copy is released per loan, ever.

use crate::base::{BookId, BorrowerId, LoanId};
use crate::catalog::Catalog;
use crate::directory::BorrowerDirectory;
use crate::error::{LedgerError, LedgerResult};
use crate::loan::Loan;
use chrono::{Days, NaiveDate};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The lending ledger: loan log plus the atomic issue/return core.
#[derive(Debug)]
pub struct LendingLedger {
    catalog: Arc<Catalog>,
    directory: Arc<BorrowerDirectory>,
    /// Append-only loan log indexed by loan id. Entries are only ever
    /// mutated (returned flag) under the owning book's mutex.
    loans: DashMap<LoanId, Loan>,
    /// Next loan id to allocate; ids start at 1.
    next_loan_id: AtomicU64,
}

impl LendingLedger {
    /// Creates a ledger over an existing catalog and directory.
    pub fn new(catalog: Arc<Catalog>, directory: Arc<BorrowerDirectory>) -> Self {
        Self {
            catalog,
            directory,
            loans: DashMap::new(),
            next_loan_id: AtomicU64::new(1),
        }
    }

    /// The catalog this ledger mutates availability on.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The borrower directory this ledger resolves borrowers against.
    pub fn directory(&self) -> &Arc<BorrowerDirectory> {
        &self.directory
    }

    /// Issues one copy of a book to a borrower.
    ///
    /// Reserving the copy and appending the loan record happen inside
    /// the book's critical section, so no other transaction on that
    /// book can observe one without the other.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidArgument`] - `duration_days == 0`.
    /// - [`LedgerError::BorrowerNotFound`] - unknown borrower id.
    /// - [`LedgerError::BookNotFound`] - unknown book id.
    /// - [`LedgerError::NoCopiesAvailable`] - every copy is on loan;
    ///   no mutation is performed.
    pub fn issue_loan(
        &self,
        book_id: BookId,
        borrower_id: BorrowerId,
        issue_date: NaiveDate,
        duration_days: u32,
    ) -> LedgerResult<LoanId> {
        if duration_days == 0 {
            return Err(LedgerError::InvalidArgument("duration_days must be positive"));
        }
        let due_date = issue_date
            .checked_add_days(Days::new(u64::from(duration_days)))
            .ok_or(LedgerError::InvalidArgument("due date out of calendar range"))?;

        // Referential integrity is checked once, at issue time.
        // Borrowers are never deleted, so the check cannot go stale.
        self.directory.get(borrower_id)?;

        self.catalog.with_book_mut(book_id, |book| {
            book.reserve_copy()?;

            let loan_id = LoanId(self.next_loan_id.fetch_add(1, Ordering::Relaxed));
            let loan = Loan {
                id: loan_id,
                book_id,
                borrower_id,
                issue_date,
                due_date,
                returned: false,
            };
            self.loans.insert(loan_id, loan);
            tracing::debug!(loan = %loan_id, book = %book_id, borrower = %borrower_id, %due_date, "loan issued");
            Ok(loan_id)
        })
    }

    /// Marks a loan returned and releases its copy back to the shelf.
    ///
    /// Idempotent: returning an already-returned loan is a no-op
    /// success, so a caller retrying after an ambiguous response can
    /// repeat the call safely. Exactly one copy is released per loan,
    /// no matter how many times this is called.
    ///
    /// # Errors
    ///
    /// [`LedgerError::LoanNotFound`] - unknown loan id.
    pub fn return_loan(&self, loan_id: LoanId) -> LedgerResult<()> {
        // The book id is immutable, so reading it outside the critical
        // section is safe; the returned flag is re-checked inside.
        let book_id = self
            .loans
            .get(&loan_id)
            .ok_or(LedgerError::LoanNotFound(loan_id))?
            .book_id;

        self.catalog.with_book_mut(book_id, |book| {
            // Loans are never deleted, so the entry is still present.
            let mut loan = self
                .loans
                .get_mut(&loan_id)
                .ok_or(LedgerError::LoanNotFound(loan_id))?;

            if loan.returned {
                tracing::debug!(loan = %loan_id, "return of already-returned loan; no-op");
                return Ok(());
            }

            loan.returned = true;
            book.release_copy();
            tracing::debug!(loan = %loan_id, book = %book_id, "loan returned");
            Ok(())
        })
    }

    /// Returns a snapshot of the loan.
    ///
    /// # Errors
    ///
    /// [`LedgerError::LoanNotFound`] if no loan has this id.
    pub fn get_loan(&self, loan_id: LoanId) -> LedgerResult<Loan> {
        self.loans
            .get(&loan_id)
            .map(|entry| entry.clone())
            .ok_or(LedgerError::LoanNotFound(loan_id))
    }

    /// All loans, returned or not, in id (issue) order.
    pub fn list_loans(&self) -> Vec<Loan> {
        self.collect_loans(|_| true)
    }

    /// Loans not yet returned, in id order.
    pub fn list_active_loans(&self) -> Vec<Loan> {
        self.collect_loans(|loan| !loan.returned)
    }

    /// All loans ever issued against a book, in id order.
    pub fn list_loans_for_book(&self, book_id: BookId) -> Vec<Loan> {
        self.collect_loans(|loan| loan.book_id == book_id)
    }

    /// All loans ever issued to a borrower, in id order.
    pub fn list_loans_for_borrower(&self, borrower_id: BorrowerId) -> Vec<Loan> {
        self.collect_loans(|loan| loan.borrower_id == borrower_id)
    }

    /// Active loans whose due date has passed, in id order.
    pub fn list_overdue_loans(&self, today: NaiveDate) -> Vec<Loan> {
        self.collect_loans(|loan| loan.is_overdue(today))
    }

    /// Number of loan records, including returned ones.
    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    /// Checks the conservation invariant for one book, under its lock:
    /// `available_copies == total_copies - |active loans|`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::BookNotFound`] - unknown book id.
    /// - [`LedgerError::Storage`] - the counters disagree with the loan
    ///   log, meaning the stored state is corrupt.
    pub fn verify_book(&self, book_id: BookId) -> LedgerResult<()> {
        self.catalog.with_book_mut(book_id, |book| {
            let active = self
                .loans
                .iter()
                .filter(|loan| loan.book_id == book_id && !loan.returned)
                .count() as u32;
            let expected = book.total_copies - active.min(book.total_copies);

            if active > book.total_copies || book.available_copies != expected {
                return Err(LedgerError::Storage(format!(
                    "book {book_id}: {} available of {} total but {active} active loans",
                    book.available_copies, book.total_copies
                )));
            }
            Ok(())
        })
    }

    /// Re-inserts a loan from a persisted snapshot.
    ///
    /// Checks that both referenced entities resolve; the availability
    /// cross-check against the book counters is done by the loader once
    /// all loans are in.
    pub(crate) fn restore_loan(&self, loan: Loan) -> LedgerResult<()> {
        if self.catalog.get(loan.book_id).is_err() {
            return Err(LedgerError::Storage(format!(
                "loan {} references missing book {}",
                loan.id, loan.book_id
            )));
        }
        if self.directory.get(loan.borrower_id).is_err() {
            return Err(LedgerError::Storage(format!(
                "loan {} references missing borrower {}",
                loan.id, loan.borrower_id
            )));
        }
        self.next_loan_id.fetch_max(loan.id.0 + 1, Ordering::Relaxed);
        if self.loans.insert(loan.id, loan).is_some() {
            return Err(LedgerError::Storage("duplicate loan id in snapshot".into()));
        }
        Ok(())
    }

    fn collect_loans(&self, keep: impl Fn(&Loan) -> bool) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .loans
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.clone())
            .collect();
        loans.sort_by_key(|loan| loan.id);
        loans
    }
}

impl Default for LendingLedger {
    /// A ledger over a fresh, empty catalog and directory.
    fn default() -> Self {
        Self::new(Arc::new(Catalog::new()), Arc::new(BorrowerDirectory::new()))
    }
}
