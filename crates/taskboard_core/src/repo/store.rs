//! Unit-of-work boundary over a SQLite connection.
//!
//! # Responsibility
//! - Hand services one [`StoreSession`] per call, backed by a single SQLite
//!   transaction.
//! - Commit when the work succeeds, roll back when it fails.
//!
//! # Invariants
//! - Write units start with `BEGIN IMMEDIATE`, so two writers on the same
//!   file serialize on the write lock instead of failing mid-transaction.
//! - No partial state of a failed unit is ever visible to later readers.

use crate::db::migrations::{current_version, latest_version};
use crate::repo::link_repo::LinkRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::{table_exists, table_has_column, RepoError, RepoResult};
use log::warn;
use rusqlite::{Connection, Transaction, TransactionBehavior};

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "tasks",
        &["id", "title", "description", "status", "deadline"],
    ),
    (
        "users",
        &["id", "first_name", "last_name", "email", "credential", "role"],
    ),
    ("task_users", &["task_id", "user_id"]),
];

/// Everything a service may do inside one unit of work.
pub trait StoreSession: TaskRepository + UserRepository + LinkRepository {}

impl<T> StoreSession for T where T: TaskRepository + UserRepository + LinkRepository {}

/// Transactional access to the entity store.
pub trait EntityStore {
    /// Runs `work` in a write transaction. Commits on `Ok`, rolls back on
    /// `Err` and returns the error unchanged.
    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn StoreSession) -> Result<T, E>;

    /// Runs `work` in a read transaction so multi-query reads see one
    /// consistent snapshot.
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn StoreSession) -> Result<T, E>;
}

/// Repository implementations bound to one connection or transaction.
pub struct SqliteSession<'conn> {
    pub(crate) conn: &'conn Connection,
}

/// SQLite-backed [`EntityStore`].
#[derive(Debug, Clone, Copy)]
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Wraps a connection returned by [`open_db`](crate::db::open_db) or a
    /// sibling opener.
    ///
    /// # Errors
    /// - [`RepoError::UninitializedConnection`] when migrations are not at
    ///   the latest version.
    /// - [`RepoError::MissingRequiredTable`] / [`RepoError::MissingRequiredColumn`]
    ///   when the schema is not the one this crate writes.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn run<T, E, F>(&self, behavior: TransactionBehavior, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn StoreSession) -> Result<T, E>,
    {
        let tx = Transaction::new_unchecked(self.conn, behavior).map_err(RepoError::from)?;
        let session = SqliteSession { conn: &tx };

        match work(&session) {
            Ok(value) => {
                tx.commit().map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("event=uow_rollback module=repo status=error error={rollback_err}");
                }
                Err(err)
            }
        }
    }
}

impl EntityStore for SqliteStore<'_> {
    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn StoreSession) -> Result<T, E>,
    {
        self.run(TransactionBehavior::Immediate, work)
    }

    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn StoreSession) -> Result<T, E>,
    {
        self.run(TransactionBehavior::Deferred, work)
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{EntityStore, SqliteStore};
    use crate::db::open_db_in_memory;
    use crate::model::task::TaskDraft;
    use crate::repo::{RepoError, TaskRepository};
    use rusqlite::Connection;

    #[test]
    fn unmigrated_connection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteStore::try_new(&conn),
            Err(RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            })
        ));
    }

    #[test]
    fn failed_unit_leaves_no_rows_behind() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteStore::try_new(&conn).unwrap();

        let result: Result<(), RepoError> = store.unit_of_work(|session| {
            session.insert_task(&TaskDraft::new("a", "b"))?;
            Err(RepoError::InvalidData("abort".to_string()))
        });
        assert!(result.is_err());

        let count: Result<u64, RepoError> = store.read(|session| session.count_tasks());
        assert_eq!(count.unwrap(), 0);
    }

    #[test]
    fn committed_unit_is_visible_to_later_reads() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteStore::try_new(&conn).unwrap();

        let id: i64 = store
            .unit_of_work(|session| session.insert_task(&TaskDraft::new("a", "b")))
            .unwrap();
        let loaded = store
            .read(|session| session.get_task(id))
            .unwrap()
            .unwrap();

        assert_eq!(loaded.title, "a");
        assert!(loaded.user_ids.is_empty());
    }
}
