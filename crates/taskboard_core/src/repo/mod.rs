//! Entity store contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Define per-entity data access contracts used by the services.
//! - Isolate SQL details from association reconciliation and validation.
//! - Provide the unit-of-work boundary every service call runs inside.
//!
//! # Invariants
//! - Assignment links live in exactly one place (`task_users`), so a link
//!   written through one side is immediately visible from the other.
//! - Uniqueness violations surface as [`RepoError::DuplicateKey`], never as a
//!   raw SQLite error.
//! - Missing rows on update/delete surface as [`RepoError::NotFound`].

pub(crate) mod columns;
pub mod link_repo;
pub mod store;
pub mod task_repo;
pub mod user_repo;

pub use link_repo::LinkRepository;
pub use store::{EntityStore, SqliteSession, SqliteStore, StoreSession};
pub use task_repo::TaskRepository;
pub use user_repo::UserRepository;

use crate::db::DbError;
use crate::model::EntityKind;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for entity store reads, writes and readiness checks.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound {
        entity: EntityKind,
        id: i64,
    },
    /// A unique column (task title, user email) already holds `key`.
    DuplicateKey {
        entity: EntityKind,
        key: String,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::DuplicateKey { entity, key } => {
                write!(f, "{entity} with key `{key}` already exists")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: expected schema version {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a failed write to `DuplicateKey` when SQLite reports a UNIQUE
/// violation; every other error passes through unchanged.
pub(crate) fn map_unique_violation(
    err: rusqlite::Error,
    entity: EntityKind,
    key: &str,
) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::DuplicateKey {
            entity,
            key: key.to_string(),
        }
    } else {
        RepoError::from(err)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, message) => {
            inner.code == ErrorCode::ConstraintViolation
                && message
                    .as_deref()
                    .is_some_and(|text| text.starts_with("UNIQUE constraint failed"))
        }
        _ => false,
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
