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

//! Borrower directory.
//!
//! A simple keyed store: borrowers are created once and read-only
//! thereafter, so no per-entry lock is needed beyond the map's own
//! sharding.

use crate::base::BorrowerId;
use crate::error::{LedgerError, LedgerResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// A registered borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub id: BorrowerId,
    pub name: String,
    pub contact: Option<String>,
}

/// Keyed store of registered borrowers.
#[derive(Debug)]
pub struct BorrowerDirectory {
    borrowers: DashMap<BorrowerId, Borrower>,
    next_id: AtomicU32,
}

impl BorrowerDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            borrowers: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Registers a borrower.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `name` is empty.
    pub fn add_borrower(&self, name: &str, contact: Option<&str>) -> LedgerResult<BorrowerId> {
        if name.is_empty() {
            return Err(LedgerError::InvalidArgument("name must not be empty"));
        }

        let id = BorrowerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let borrower = Borrower {
            id,
            name: name.to_owned(),
            contact: contact.map(str::to_owned),
        };
        self.borrowers.insert(id, borrower);
        tracing::debug!(borrower = %id, name, "borrower added");
        Ok(id)
    }

    /// Returns the borrower with this id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::BorrowerNotFound`] if no borrower has this id.
    pub fn get(&self, id: BorrowerId) -> LedgerResult<Borrower> {
        self.borrowers
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(LedgerError::BorrowerNotFound(id))
    }

    /// Returns all borrowers in id order.
    pub fn list(&self) -> Vec<Borrower> {
        let mut borrowers: Vec<Borrower> =
            self.borrowers.iter().map(|entry| entry.clone()).collect();
        borrowers.sort_by_key(|borrower| borrower.id);
        borrowers
    }

    /// Number of registered borrowers.
    pub fn len(&self) -> usize {
        self.borrowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrowers.is_empty()
    }

    /// Re-inserts a borrower from a persisted snapshot.
    pub(crate) fn restore_borrower(&self, borrower: Borrower) -> LedgerResult<()> {
        self.next_id.fetch_max(borrower.id.0 + 1, Ordering::Relaxed);
        if self.borrowers.insert(borrower.id, borrower).is_some() {
            return Err(LedgerError::Storage("duplicate borrower id in snapshot".into()));
        }
        Ok(())
    }
}

impl Default for BorrowerDirectory {
    fn default() -> Self {
        Self::new()
    }
}
