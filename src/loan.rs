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

//! Loan records.
//!
//! A loan follows a two-state machine:
//!
//! - `Issued` (returned = false) ──return──► `Returned` (returned = true)
//!
//! The returned flag is monotonic: once true it never goes back.
//! Overdue-ness is not a state, it is a read-time comparison of the due
//! date against the current date, so it cannot drift out of sync with
//! stored data.

use crate::base::{BookId, BorrowerId, LoanId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A record linking one borrower to one reserved copy for a bounded
/// time window. Append-only: loans are never deleted, only flipped to
/// returned exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub book_id: BookId,
    pub borrower_id: BorrowerId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub returned: bool,
}

impl Loan {
    /// Whether the loan is active and past its due date.
    ///
    /// Always false for returned loans, whatever their due date was.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.returned && today > self.due_date
    }

    /// Days past the due date, zero if on time or already returned.
    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_loan(returned: bool) -> Loan {
        Loan {
            id: LoanId(1),
            book_id: BookId(1),
            borrower_id: BorrowerId(1),
            issue_date: date(2025, 3, 1),
            due_date: date(2025, 3, 8),
            returned,
        }
    }

    #[test]
    fn not_overdue_before_due_date() {
        let loan = sample_loan(false);
        assert!(!loan.is_overdue(date(2025, 3, 5)));
        assert_eq!(loan.days_overdue(date(2025, 3, 5)), 0);
    }

    #[test]
    fn not_overdue_on_due_date() {
        let loan = sample_loan(false);
        assert!(!loan.is_overdue(date(2025, 3, 8)));
    }

    #[test]
    fn overdue_after_due_date() {
        let loan = sample_loan(false);
        assert!(loan.is_overdue(date(2025, 3, 10)));
        assert_eq!(loan.days_overdue(date(2025, 3, 10)), 2);
    }

    #[test]
    fn returned_loan_is_never_overdue() {
        let loan = sample_loan(true);
        assert!(!loan.is_overdue(date(2026, 1, 1)));
        assert_eq!(loan.days_overdue(date(2026, 1, 1)), 0);
    }

    #[test]
    fn serializes_dates_as_iso() {
        let loan = sample_loan(false);
        let json = serde_json::to_string(&loan).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["issue_date"], "2025-03-01");
        assert_eq!(parsed["due_date"], "2025-03-08");
        assert_eq!(parsed["returned"], false);
    }
}
