//! Domain rules for enrollment and grading. Every public operation takes the
//! connection plus the acting user and enforces its own access, maintenance
//! and deadline gates; the IPC layer only parses and serializes.

pub mod access;
pub mod actor;
pub mod adddrop;
pub mod catalog;
pub mod enrollment;
pub mod error;
pub mod finals;
pub mod ledger;
pub mod maintenance;
pub mod slabs;

#[cfg(test)]
mod testutil;

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub use actor::{Actor, Role};
pub use error::EngineError;

/// Takes the write lock up front so check-then-insert sequences (seat counts,
/// slab overlap) cannot interleave across processes sharing the file.
pub(crate) fn immediate_tx(conn: &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}
