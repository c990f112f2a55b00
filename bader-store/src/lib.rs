//! SQLite record store for the BADER licensing core.
//!
//! Persists the three record kinds the core needs — licenses, device
//! activations, and tenants — behind plain insert/get/query functions.
//! Schema migrations are handled automatically on open.
//!
//! # Concurrency
//!
//! A single connection behind a mutex serializes all access. Mutating
//! sequences run inside `BEGIN IMMEDIATE` transactions via
//! [`Database::with_tx`], so concurrent callers observe either the pre- or
//! post-state of a multi-row swap, never an interleaved state. Store
//! functions take a plain [`rusqlite::Connection`] so callers can compose
//! several of them into one transaction.

pub mod activations;
mod error;
pub mod licenses;
mod row;
mod schema;
pub mod tenants;

pub use activations::{ActivationFilter, ActivationTotals, DeviceActivation};
pub use error::{StoreError, StoreResult};
pub use licenses::License;
pub use tenants::Tenant;

// Re-exported so downstream crates can name `Connection` in helpers without
// pinning their own copy of the driver.
pub use rusqlite;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;

/// Handle to the underlying SQLite database.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (creating if needed) a database file and migrates its schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory database, for tests and ephemeral use.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs read-only work on the connection.
    pub fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| E::from(StoreError::Poisoned))?;
        f(&conn)
    }

    /// Runs work inside a `BEGIN IMMEDIATE` transaction, committing on
    /// success and rolling back when the closure errors.
    pub fn with_tx<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| E::from(StoreError::Poisoned))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| E::from(StoreError::from(e)))?;
        let value = f(&tx)?;
        tx.commit().map_err(|e| E::from(StoreError::from(e)))?;
        Ok(value)
    }
}
