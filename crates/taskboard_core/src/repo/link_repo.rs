//! Assignment link contract and SQLite implementation.
//!
//! # Responsibility
//! - Own the single `task_users` join table backing both sides of the
//!   task/user relation.
//! - Report whether a link/unlink actually changed state so callers can
//!   distinguish no-ops from conflicts.
//!
//! # Invariants
//! - A `(task_id, user_id)` pair is stored at most once.
//! - Linking requires both rows to exist (`foreign_keys=ON`).

use crate::model::task::TaskId;
use crate::model::user::UserId;
use crate::repo::columns::{placeholders, MAX_BOUND_IDS};
use crate::repo::store::SqliteSession;
use crate::repo::RepoResult;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};

pub trait LinkRepository {
    /// Links the pair. Returns `false` when it was already linked.
    fn link(&self, task_id: TaskId, user_id: UserId) -> RepoResult<bool>;
    /// Unlinks the pair. Returns `false` when it was not linked.
    fn unlink(&self, task_id: TaskId, user_id: UserId) -> RepoResult<bool>;
    /// Current assignees of one task. Listings load sets in bulk instead.
    fn user_ids_of_task(&self, task_id: TaskId) -> RepoResult<BTreeSet<UserId>>;
    /// Current tasks of one user.
    fn task_ids_of_user(&self, user_id: UserId) -> RepoResult<BTreeSet<TaskId>>;
}

impl LinkRepository for SqliteSession<'_> {
    fn link(&self, task_id: TaskId, user_id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO task_users (task_id, user_id)
             VALUES (?1, ?2)
             ON CONFLICT (task_id, user_id) DO NOTHING;",
            params![task_id, user_id],
        )?;
        Ok(changed == 1)
    }

    fn unlink(&self, task_id: TaskId, user_id: UserId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM task_users WHERE task_id = ?1 AND user_id = ?2;",
            params![task_id, user_id],
        )?;
        Ok(changed == 1)
    }

    fn user_ids_of_task(&self, task_id: TaskId) -> RepoResult<BTreeSet<UserId>> {
        let ids = BTreeSet::from([task_id]);
        Ok(load_user_ids_by_task(self.conn, &ids)?
            .remove(&task_id)
            .unwrap_or_default())
    }

    fn task_ids_of_user(&self, user_id: UserId) -> RepoResult<BTreeSet<TaskId>> {
        let ids = BTreeSet::from([user_id]);
        Ok(load_task_ids_by_user(self.conn, &ids)?
            .remove(&user_id)
            .unwrap_or_default())
    }
}

/// Loads assignment sets for many tasks, one query per [`MAX_BOUND_IDS`]
/// ids. Tasks without links
/// are absent from the map.
pub(crate) fn load_user_ids_by_task(
    conn: &Connection,
    task_ids: &BTreeSet<TaskId>,
) -> RepoResult<BTreeMap<TaskId, BTreeSet<UserId>>> {
    load_links(
        conn,
        "SELECT task_id, user_id FROM task_users WHERE task_id IN",
        task_ids,
    )
}

/// Loads assignment sets for many users, one query per [`MAX_BOUND_IDS`]
/// ids. Users without links
/// are absent from the map.
pub(crate) fn load_task_ids_by_user(
    conn: &Connection,
    user_ids: &BTreeSet<UserId>,
) -> RepoResult<BTreeMap<UserId, BTreeSet<TaskId>>> {
    load_links(
        conn,
        "SELECT user_id, task_id FROM task_users WHERE user_id IN",
        user_ids,
    )
}

fn load_links(
    conn: &Connection,
    select: &str,
    keys: &BTreeSet<i64>,
) -> RepoResult<BTreeMap<i64, BTreeSet<i64>>> {
    let mut links: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    if keys.is_empty() {
        return Ok(links);
    }

    let keys = keys.iter().copied().collect::<Vec<_>>();
    for chunk in keys.chunks(MAX_BOUND_IDS) {
        let sql = format!("{select} ({});", placeholders(chunk.len()));
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
        while let Some(row) = rows.next()? {
            let key: i64 = row.get(0)?;
            let counterpart: i64 = row.get(1)?;
            links.entry(key).or_default().insert(counterpart);
        }
    }
    Ok(links)
}
