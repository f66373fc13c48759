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

//! Durable snapshots.
//!
//! The ledger's durable state is three CSV tables, one per entity:
//! `books.csv`, `borrowers.csv`, and `loans.csv`. Saves go through a
//! temporary file plus rename, so a crashed save leaves the previous
//! table intact rather than a half-written one. Loads rebuild the id
//! counters and the ISBN index, re-check referential integrity, and
//! cross-check every book's availability counter against the loan log;
//! any mismatch fails with [`LedgerError::Storage`].

use crate::catalog::{Book, Catalog};
use crate::directory::{Borrower, BorrowerDirectory};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::LendingLedger;
use crate::loan::Loan;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const BOOKS_FILE: &str = "books.csv";
const BORROWERS_FILE: &str = "borrowers.csv";
const LOANS_FILE: &str = "loans.csv";

/// Writes the ledger's full state to `dir` as three CSV tables.
///
/// Creates `dir` if needed. Each table is written to a `.tmp` sibling
/// and renamed into place once flushed.
///
/// # Errors
///
/// [`LedgerError::Storage`] on any io/csv fault; the previously
/// committed tables are left untouched.
pub fn save_ledger(ledger: &LendingLedger, dir: &Path) -> LedgerResult<()> {
    fs::create_dir_all(dir)?;
    write_table(dir, BOOKS_FILE, &ledger.catalog().list())?;
    write_table(dir, BORROWERS_FILE, &ledger.directory().list())?;
    write_table(dir, LOANS_FILE, &ledger.list_loans())?;
    tracing::debug!(dir = %dir.display(), "ledger snapshot saved");
    Ok(())
}

/// Loads a ledger from the three CSV tables in `dir`.
///
/// # Errors
///
/// [`LedgerError::Storage`] if a table is missing or unreadable, if a
/// loan references a missing book or borrower, if ids or ISBNs
/// collide, or if any book's availability counter disagrees with its
/// active-loan count.
pub fn load_ledger(dir: &Path) -> LedgerResult<LendingLedger> {
    let catalog = Arc::new(Catalog::new());
    for book in read_table::<Book>(&dir.join(BOOKS_FILE))? {
        catalog.restore_book(book)?;
    }

    let directory = Arc::new(BorrowerDirectory::new());
    for borrower in read_table::<Borrower>(&dir.join(BORROWERS_FILE))? {
        directory.restore_borrower(borrower)?;
    }

    let ledger = LendingLedger::new(catalog, directory);
    for loan in read_table::<Loan>(&dir.join(LOANS_FILE))? {
        ledger.restore_loan(loan)?;
    }

    // A snapshot where the stored counters and the loan log disagree is
    // corrupt; refuse it rather than run with a broken invariant.
    for book in ledger.catalog().list() {
        ledger.verify_book(book.id)?;
    }

    tracing::debug!(dir = %dir.display(), books = ledger.catalog().len(), loans = ledger.loan_count(), "ledger snapshot loaded");
    Ok(ledger)
}

/// True if `dir` holds a previously saved snapshot.
pub fn snapshot_exists(dir: &Path) -> bool {
    dir.join(BOOKS_FILE).is_file()
}

fn write_table<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> LedgerResult<()> {
    let tmp = dir.join(format!("{name}.tmp"));
    let mut writer = csv::Writer::from_path(&tmp)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

fn read_table<T: DeserializeOwned>(path: &Path) -> LedgerResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| LedgerError::Storage(format!("{}: {e}", path.display())))?;
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        rows.push(result?);
    }
    Ok(rows)
}
