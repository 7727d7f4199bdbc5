//! Task repository contract and SQLite implementation.
//!
//! # Invariants
//! - Every returned [`Task`] carries its full assignment set, read from
//!   `task_users` in the same session as the task row.
//! - Writes only touch scalar columns; links change through
//!   [`LinkRepository`](crate::repo::LinkRepository).

use crate::model::task::{Task, TaskDraft, TaskId};
use crate::model::EntityKind;
use crate::query::{RenderSql, TaskQuerySpec};
use crate::repo::columns::{
    deadline_to_db, parse_task_row, placeholders, task_status_to_db, MAX_BOUND_IDS,
    TASK_SELECT_SQL,
};
use crate::repo::link_repo::load_user_ids_by_task;
use crate::repo::store::SqliteSession;
use crate::repo::{map_unique_violation, RepoError, RepoResult};
use rusqlite::{params, params_from_iter, OptionalExtension};
use std::collections::BTreeSet;

/// Data access contract for task rows.
pub trait TaskRepository {
    /// Inserts the draft's scalar fields and returns the new id.
    ///
    /// `draft.user_ids` is ignored.
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId>;
    /// Overwrites the scalar fields of an existing task.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Removes the task row. Links must already be severed.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn find_task_by_title(&self, title: &str) -> RepoResult<Option<Task>>;
    /// Resolves many ids in one round trip. Unknown ids are absent from the
    /// result, which is ordered by id.
    fn find_tasks_by_ids(&self, ids: &BTreeSet<TaskId>) -> RepoResult<Vec<Task>>;
    fn query_tasks(&self, spec: &TaskQuerySpec) -> RepoResult<Vec<Task>>;
    fn count_tasks(&self) -> RepoResult<u64>;
}

impl TaskRepository for SqliteSession<'_> {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId> {
        self.conn
            .execute(
                "INSERT INTO tasks (title, description, status, deadline)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    draft.title,
                    draft.description,
                    task_status_to_db(draft.status),
                    deadline_to_db(draft.deadline),
                ],
            )
            .map_err(|err| map_unique_violation(err, EntityKind::Task, &draft.title))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE tasks
                 SET
                    title = ?2,
                    description = ?3,
                    status = ?4,
                    deadline = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task_status_to_db(task.status),
                    deadline_to_db(task.deadline),
                ],
            )
            .map_err(|err| map_unique_violation(err, EntityKind::Task, &task.title))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Task,
                id: task.id,
            });
        }
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Task,
                id,
            });
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let sql = format!("{TASK_SELECT_SQL} WHERE t.id = ?1;");
        self.find_one_task(&sql, params![id])
    }

    fn find_task_by_title(&self, title: &str) -> RepoResult<Option<Task>> {
        let sql = format!("{TASK_SELECT_SQL} WHERE t.title = ?1;");
        self.find_one_task(&sql, params![title])
    }

    fn find_tasks_by_ids(&self, ids: &BTreeSet<TaskId>) -> RepoResult<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.iter().copied().collect::<Vec<_>>();
        let mut tasks = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "{TASK_SELECT_SQL} WHERE t.id IN ({}) ORDER BY t.id ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                tasks.push(parse_task_row(row)?);
            }
        }
        self.attach_user_ids(tasks)
    }

    fn query_tasks(&self, spec: &TaskQuerySpec) -> RepoResult<Vec<Task>> {
        let clause = spec.render();
        let sql = clause.complete(TASK_SELECT_SQL);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(clause.binds.iter()))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        self.attach_user_ids(tasks)
    }

    fn count_tasks(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative task count {count}")))
    }
}

impl SqliteSession<'_> {
    fn find_one_task(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Option<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let task = stmt
            .query_row(params, |row| Ok(parse_task_row(row)))
            .optional()?
            .transpose()?;

        match task {
            Some(task) => Ok(self.attach_user_ids(vec![task])?.pop()),
            None => Ok(None),
        }
    }

    fn attach_user_ids(&self, mut tasks: Vec<Task>) -> RepoResult<Vec<Task>> {
        let ids = tasks.iter().map(|task| task.id).collect::<BTreeSet<_>>();
        let mut links = load_user_ids_by_task(self.conn, &ids)?;
        for task in &mut tasks {
            task.user_ids = links.remove(&task.id).unwrap_or_default();
        }
        Ok(tasks)
    }
}
