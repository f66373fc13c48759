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

//! Error types for ledger operations.
//!
//! Every variant except [`LedgerError::Storage`] is caller-recoverable:
//! the operation that produced it performed no mutation of shared state,
//! and a retry with corrected input is safe. `Storage` is the fatal
//! class for durable-write faults and aborts the in-flight operation
//! without partial effect.

use crate::base::{BookId, BorrowerId, LoanId};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or out-of-range input (empty required text,
    /// non-positive copy count or loan duration).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Referenced book id does not exist in the catalog.
    #[error("book {0} not found")]
    BookNotFound(BookId),

    /// Referenced borrower id does not exist in the directory.
    #[error("borrower {0} not found")]
    BorrowerNotFound(BorrowerId),

    /// Referenced loan id does not exist in the loan log.
    #[error("loan {0} not found")]
    LoanNotFound(LoanId),

    /// A book with this ISBN already exists.
    #[error("duplicate ISBN: {0}")]
    DuplicateIsbn(String),

    /// Every copy of the title is currently on loan.
    #[error("no copies of book {0} available")]
    NoCopiesAvailable(BookId),

    /// Durable-storage fault (load or save). Fatal for the in-flight
    /// operation; shared in-memory state is left untouched.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}
