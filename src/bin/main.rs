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

use chrono::{Local, NaiveDate};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use lending_ledger::{store, BookId, BorrowerId, LendingLedger, LoanId};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write as IoWrite};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Lending Ledger - apply operation CSV files to a library ledger
///
/// Reads operations from a CSV file, applies them to the ledger, and
/// prints the resulting books table to stdout. With --data-dir, state
/// is loaded from and saved back to a snapshot directory.
#[derive(Parser, Debug)]
#[command(name = "lending-ledger")]
#[command(about = "Applies library operations from a CSV file", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,arg1,arg2,arg3,arg4
    /// Example: cargo run -- ops.csv > books.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Directory holding the durable snapshot (books.csv, borrowers.csv,
    /// loans.csv); loaded before and saved after applying operations
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Resume from the snapshot if one exists, else start empty.
    let ledger = match &args.data_dir {
        Some(dir) if store::snapshot_exists(dir) => match store::load_ledger(dir) {
            Ok(ledger) => ledger,
            Err(e) => {
                eprintln!("Error loading snapshot from '{}': {}", dir.display(), e);
                process::exit(1);
            }
        },
        _ => LendingLedger::default(),
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let today = Local::now().date_naive();
    if let Err(e) = process_ops(&ledger, BufReader::new(file), today) {
        eprintln!("Error processing operations: {}", e);
        process::exit(1);
    }

    if let Some(dir) = &args.data_dir {
        if let Err(e) = store::save_ledger(&ledger, dir) {
            eprintln!("Error saving snapshot to '{}': {}", dir.display(), e);
            process::exit(1);
        }
    }

    if let Err(e) = write_books(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, arg1, arg2, arg3, arg4`. Which args mean what depends
/// on the op; see [`OpRecord::into_op`].
#[derive(Debug, Deserialize)]
struct OpRecord {
    op: String,
    arg1: Option<String>,
    arg2: Option<String>,
    arg3: Option<String>,
    arg4: Option<String>,
}

/// One parsed ledger operation.
#[derive(Debug)]
enum Op {
    /// `add_book,<title>,<author>,<isbn?>,<copies>`
    AddBook {
        title: String,
        author: String,
        isbn: Option<String>,
        copies: u32,
    },
    /// `add_borrower,<name>,<contact?>`
    AddBorrower { name: String, contact: Option<String> },
    /// `issue,<book_id>,<borrower_id>,<duration_days>`
    Issue {
        book: BookId,
        borrower: BorrowerId,
        days: u32,
    },
    /// `return,<loan_id>`
    Return { loan: LoanId },
}

impl OpRecord {
    /// Converts a CSV record into an operation.
    ///
    /// Returns `None` for unknown ops or missing/unparsable required
    /// fields. An empty ISBN or contact field means "absent".
    fn into_op(self) -> Option<Op> {
        match self.op.to_lowercase().as_str() {
            "add_book" => Some(Op::AddBook {
                title: self.arg1?,
                author: self.arg2?,
                isbn: self.arg3.filter(|s| !s.is_empty()),
                copies: self.arg4?.parse().ok()?,
            }),
            "add_borrower" => Some(Op::AddBorrower {
                name: self.arg1?,
                contact: self.arg2.filter(|s| !s.is_empty()),
            }),
            "issue" => Some(Op::Issue {
                book: BookId(self.arg1?.parse().ok()?),
                borrower: BorrowerId(self.arg2?.parse().ok()?),
                days: self.arg3?.parse().ok()?,
            }),
            "return" => Some(Op::Return {
                loan: LoanId(self.arg1?.parse().ok()?),
            }),
            _ => None,
        }
    }
}

/// Applies operations from a CSV reader to the ledger.
///
/// Streaming: rows are applied one at a time, so arbitrarily large
/// operation files work in constant memory. Malformed rows and failed
/// operations are logged and skipped; they never abort the run.
///
/// # CSV Format
///
/// Expected columns: `op, arg1, arg2, arg3, arg4`
///
/// ```csv
/// op,arg1,arg2,arg3,arg4
/// add_book,Dune,Frank Herbert,978-0441172719,2
/// add_borrower,Alice,alice@example.com,,
/// issue,1,1,7,
/// return,1,,,
/// ```
///
/// # Errors
///
/// Returns a CSV error only if the reader itself fails; per-row
/// failures are skipped.
pub fn process_ops<R: Read>(
    ledger: &LendingLedger,
    reader: R,
    today: NaiveDate,
) -> Result<(), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow short rows like "return,3"
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<OpRecord>() {
        match result {
            Ok(record) => {
                let Some(op) = record.into_op() else {
                    tracing::debug!("skipping invalid operation record");
                    continue;
                };
                if let Err(e) = apply_op(ledger, op, today) {
                    tracing::debug!(error = %e, "skipping failed operation");
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(())
}

fn apply_op(
    ledger: &LendingLedger,
    op: Op,
    today: NaiveDate,
) -> lending_ledger::LedgerResult<()> {
    match op {
        Op::AddBook {
            title,
            author,
            isbn,
            copies,
        } => ledger
            .catalog()
            .add_book(&title, &author, isbn.as_deref(), copies)
            .map(|_| ()),
        Op::AddBorrower { name, contact } => ledger
            .directory()
            .add_borrower(&name, contact.as_deref())
            .map(|_| ()),
        Op::Issue { book, borrower, days } => {
            ledger.issue_loan(book, borrower, today, days).map(|_| ())
        }
        Op::Return { loan } => ledger.return_loan(loan),
    }
}

/// Writes the books table to a CSV writer in id order.
///
/// Columns: `id, title, author, isbn, total_copies, available_copies`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_books<W: IoWrite>(ledger: &LendingLedger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for book in ledger.catalog().list() {
        wtr.serialize(&book)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn add_book_then_issue_and_return() {
        let csv = "op,arg1,arg2,arg3,arg4\n\
                   add_book,Dune,Frank Herbert,ISBN1,2\n\
                   add_borrower,Alice,alice@example.com,,\n\
                   issue,1,1,7,\n\
                   return,1,,,\n";
        let ledger = LendingLedger::default();

        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();

        let book = ledger.catalog().get(BookId(1)).unwrap();
        assert_eq!(book.available_copies, 2);
        assert_eq!(ledger.loan_count(), 1);
        assert!(ledger.get_loan(LoanId(1)).unwrap().returned);
    }

    #[test]
    fn issue_uses_run_date_plus_duration() {
        let csv = "op,arg1,arg2,arg3,arg4\n\
                   add_book,Dune,Frank Herbert,,1\n\
                   add_borrower,Alice,,,\n\
                   issue,1,1,7,\n";
        let ledger = LendingLedger::default();

        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();

        let loan = ledger.get_loan(LoanId(1)).unwrap();
        assert_eq!(loan.issue_date, date(2025, 3, 1));
        assert_eq!(loan.due_date, date(2025, 3, 8));
    }

    #[test]
    fn empty_isbn_means_absent() {
        let csv = "op,arg1,arg2,arg3,arg4\n\
                   add_book,Emma,Jane Austen,,1\n";
        let ledger = LendingLedger::default();

        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();
        assert_eq!(ledger.catalog().get(BookId(1)).unwrap().isbn, None);
    }

    #[test]
    fn skip_malformed_and_unknown_rows() {
        let csv = "op,arg1,arg2,arg3,arg4\n\
                   add_book,Dune,Frank Herbert,,2\n\
                   frobnicate,1,2,3,4\n\
                   add_book,NoAuthorOrCopies\n\
                   add_book,Emma,Jane Austen,,1\n";
        let ledger = LendingLedger::default();

        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();
        assert_eq!(ledger.catalog().len(), 2);
    }

    #[test]
    fn failed_operation_does_not_abort_run() {
        // Second issue exhausts the single copy; the run continues and
        // the later return still applies.
        let csv = "op,arg1,arg2,arg3,arg4\n\
                   add_book,Dune,Frank Herbert,,1\n\
                   add_borrower,Alice,,,\n\
                   issue,1,1,7,\n\
                   issue,1,1,7,\n\
                   return,1,,,\n";
        let ledger = LendingLedger::default();

        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();

        assert_eq!(ledger.loan_count(), 1);
        assert_eq!(ledger.catalog().get(BookId(1)).unwrap().available_copies, 1);
    }

    #[test]
    fn parse_with_whitespace() {
        let csv = "op,arg1,arg2,arg3,arg4\n add_book , Dune , Frank Herbert , , 1 \n";
        let ledger = LendingLedger::default();

        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();
        assert_eq!(ledger.catalog().get(BookId(1)).unwrap().title, "Dune");
    }

    #[test]
    fn write_books_emits_header_and_rows() {
        let csv = "op,arg1,arg2,arg3,arg4\n\
                   add_book,Dune,Frank Herbert,ISBN1,2\n";
        let ledger = LendingLedger::default();
        process_ops(&ledger, Cursor::new(csv), date(2025, 3, 1)).unwrap();

        let mut output = Vec::new();
        write_books(&ledger, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("id,title,author,isbn,total_copies,available_copies"));
        assert!(output.contains("1,Dune,Frank Herbert,ISBN1,2,2"));
    }
}
