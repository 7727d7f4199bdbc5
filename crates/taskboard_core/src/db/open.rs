//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas the entity store relies on.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`, so `task_users` rows can
//!   never point at a removed task or user.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DatabaseLocation, DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_at(&DatabaseLocation::File(path.as_ref().to_path_buf()))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_db_at(&DatabaseLocation::Memory)
}

/// Opens the database at `location` and applies all pending migrations.
///
/// # Side effects
/// - Creates missing parent directories for file databases.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_at(location: &DatabaseLocation) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = mode_label(location);
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect(location).and_then(|mut conn| {
        bootstrap_connection(&mut conn)?;
        Ok(conn)
    });

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }

    result
}

fn connect(location: &DatabaseLocation) -> DbResult<Connection> {
    match location {
        DatabaseLocation::Memory => Ok(Connection::open_in_memory()?),
        DatabaseLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            Ok(Connection::open(path)?)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}

fn mode_label(location: &DatabaseLocation) -> &'static str {
    match location {
        DatabaseLocation::Memory => "memory",
        DatabaseLocation::File(_) => "file",
    }
}
