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

//! Property-based tests for the lending ledger.
//!
//! These verify invariants that must hold for any sequence of issue and
//! return operations, valid or not.

use chrono::NaiveDate;
use lending_ledger::{BookId, LendingLedger};
use proptest::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2025, 3, 1)
}

/// One step of a random workload: issue against the i-th book, or
/// return the i-th loan issued so far (possibly repeating a return).
#[derive(Debug, Clone)]
enum Step {
    Issue(usize),
    Return(usize),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0usize..8).prop_map(Step::Issue),
        (0usize..64).prop_map(Step::Return),
    ]
}

/// Builds a ledger with `book_copies.len()` books and one borrower,
/// then replays the steps, tolerating expected failures.
fn replay(book_copies: &[u32], steps: &[Step]) -> (LendingLedger, Vec<BookId>) {
    let ledger = LendingLedger::default();
    let books: Vec<BookId> = book_copies
        .iter()
        .enumerate()
        .map(|(i, &copies)| {
            ledger
                .catalog()
                .add_book(&format!("Book {i}"), "Author", None, copies)
                .unwrap()
        })
        .collect();
    let borrower = ledger.directory().add_borrower("A", None).unwrap();

    let mut issued = Vec::new();
    for step in steps {
        match step {
            Step::Issue(i) => {
                let book = books[i % books.len()];
                if let Ok(loan) = ledger.issue_loan(book, borrower, today(), 7) {
                    issued.push(loan);
                }
            }
            Step::Return(i) => {
                if !issued.is_empty() {
                    ledger.return_loan(issued[i % issued.len()]).unwrap();
                }
            }
        }
    }
    (ledger, books)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// After any workload, every book's availability equals total minus
    /// its active-loan count, and stays within [0, total].
    #[test]
    fn conservation_holds_for_any_workload(
        book_copies in prop::collection::vec(1u32..5, 1..4),
        steps in prop::collection::vec(arb_step(), 0..100),
    ) {
        let (ledger, books) = replay(&book_copies, &steps);

        for book in books {
            let snapshot = ledger.catalog().get(book).unwrap();
            let active = ledger
                .list_loans_for_book(book)
                .iter()
                .filter(|loan| !loan.returned)
                .count() as u32;

            prop_assert!(snapshot.available_copies <= snapshot.total_copies);
            prop_assert_eq!(
                snapshot.available_copies,
                snapshot.total_copies - active
            );
            prop_assert!(ledger.verify_book(book).is_ok());
        }
    }

    /// Replaying a workload with every return duplicated lands in the
    /// same final state: returns are idempotent.
    #[test]
    fn duplicated_returns_change_nothing(
        book_copies in prop::collection::vec(1u32..5, 1..4),
        steps in prop::collection::vec(arb_step(), 0..60),
    ) {
        let doubled: Vec<Step> = steps
            .iter()
            .flat_map(|step| match step {
                Step::Return(i) => vec![Step::Return(*i), Step::Return(*i)],
                other => vec![other.clone()],
            })
            .collect();

        let (once, _) = replay(&book_copies, &steps);
        let (twice, _) = replay(&book_copies, &doubled);

        prop_assert_eq!(once.catalog().list(), twice.catalog().list());
        prop_assert_eq!(once.list_loans(), twice.list_loans());
    }

    /// Issue successes against one book never exceed its copy count
    /// while no returns happen.
    #[test]
    fn issues_without_returns_bounded_by_copies(
        copies in 1u32..10,
        attempts in 1usize..30,
    ) {
        let ledger = LendingLedger::default();
        let book = ledger.catalog().add_book("Book", "Author", None, copies).unwrap();
        let borrower = ledger.directory().add_borrower("A", None).unwrap();

        let successes = (0..attempts)
            .filter(|_| ledger.issue_loan(book, borrower, today(), 7).is_ok())
            .count();

        prop_assert_eq!(successes, (attempts).min(copies as usize));
        prop_assert_eq!(
            ledger.catalog().get(book).unwrap().available_copies,
            copies - successes as u32
        );
    }

    /// Every issued loan has a due date strictly after its issue date.
    #[test]
    fn due_date_always_after_issue_date(
        duration in 1u32..3650,
    ) {
        let ledger = LendingLedger::default();
        let book = ledger.catalog().add_book("Book", "Author", None, 1).unwrap();
        let borrower = ledger.directory().add_borrower("A", None).unwrap();

        let loan_id = ledger.issue_loan(book, borrower, today(), duration).unwrap();
        let loan = ledger.get_loan(loan_id).unwrap();
        prop_assert!(loan.due_date > loan.issue_date);
        prop_assert_eq!((loan.due_date - loan.issue_date).num_days(), i64::from(duration));
    }
}
