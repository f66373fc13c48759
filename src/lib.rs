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

//! # Lending Ledger
//!
//! This library provides the lending-ledger core of a library-management
//! system: which physical copies of a book exist, which are on loan, to
//! whom, and until when. This crate keeps those facts consistent under
//! concurrent access; presentation (GUI, CLI, API) is an external caller
//! of the operations exposed here.
//!
//! ## Core Components
//!
//! - [`Catalog`]: book titles with total and available copy counts
//! - [`BorrowerDirectory`]: registered borrowers
//! - [`LendingLedger`]: the loan log and the atomic issue/return core;
//!   the sole mutator of availability
//! - [`store`]: CSV snapshot persistence for all three
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use lending_ledger::{BorrowerDirectory, Catalog, LendingLedger};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(Catalog::new());
//! let directory = Arc::new(BorrowerDirectory::new());
//! let ledger = LendingLedger::new(Arc::clone(&catalog), Arc::clone(&directory));
//!
//! let book = catalog
//!     .add_book("Dune", "Frank Herbert", Some("978-0441172719"), 2)
//!     .unwrap();
//! let borrower = directory.add_borrower("Paul Atreides", None).unwrap();
//!
//! let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let loan = ledger.issue_loan(book, borrower, today, 14).unwrap();
//! assert_eq!(catalog.get(book).unwrap().available_copies, 1);
//!
//! ledger.return_loan(loan).unwrap();
//! assert_eq!(catalog.get(book).unwrap().available_copies, 2);
//! ```
//!
//! ## Thread Safety
//!
//! Issue and return calls touching the same book are linearized by a
//! per-book mutex; calls on different books run fully in parallel. Read
//! queries never see a half-applied issue or return.

pub mod base;
pub mod catalog;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod loan;
pub mod store;

pub use base::{BookId, BorrowerId, LoanId};
pub use catalog::{Book, Catalog};
pub use directory::{Borrower, BorrowerDirectory};
pub use error::{LedgerError, LedgerResult};
pub use ledger::LendingLedger;
pub use loan::Loan;
