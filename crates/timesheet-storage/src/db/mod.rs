//! Database operations split into domain-specific modules.
//!
//! This module owns the `Database` struct and its constructor; each
//! sibling module implements one entity's repository methods as an
//! additional `impl Database` block.

mod compliance;
mod employer;
pub mod helpers;
mod holidays;
mod mnemonics;
mod sessions;
mod users;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;

use crate::migrations;

/// Database connection wrapper. All repository methods take `&self`;
/// thread-sharing happens via `Arc<Database>` and a single underlying
/// SQLite connection, matching rusqlite's internal-locking design.
pub struct Database {
    pub(crate) conn: Connection,
}

// SQLite serializes access at the connection level; rusqlite's Connection
// is not Sync by default because of an internal Cell. We never hand out
// concurrent &mut access and every statement runs to completion before
// returning, so sharing one Connection behind an Arc across async tasks is
// sound as long as callers do not nest transactions across suspension
// points.
unsafe impl Send for Database {}
unsafe impl Sync for Database {}

impl Database {
    /// Open (or create) the database at `db_path`, defaulting to the
    /// platform data directory when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database directory cannot be created, the
    /// connection cannot be opened, or schema initialization fails.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        migrations::init_schema(&conn)?;

        log::info!("Database initialized at: {}", path.display());

        Ok(Self { conn })
    }

    /// Open an in-memory database. Used by tests and by short-lived
    /// operator subcommands that do not need persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if schema initialization fails.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        migrations::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("timesheet");
        path.push("timesheet.db");
        path
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` / `COMMIT` pair, rolling back on
    /// error. This is the Unit-of-Work boundary: every multi-statement
    /// change (close-and-open on a toggle, a batch auto-shutdown sweep)
    /// goes through this so the "at most one active session" invariant is
    /// never observable as violated, even under a crash between
    /// statements.
    ///
    /// # Errors
    ///
    /// Returns whatever error `f` returns, or a `rusqlite` error if the
    /// transaction itself cannot be started, committed, or rolled back.
    pub fn with_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    log::error!("rollback failed after error {err}: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}
