//! User repository contract and SQLite implementation.
//!
//! # Invariants
//! - Every returned [`User`] carries its full assignment set.
//! - `credential` is written once on insert; profile updates never touch it.

use crate::model::user::{NewUser, User, UserId};
use crate::model::EntityKind;
use crate::query::{RenderSql, UserQuerySpec};
use crate::repo::columns::{
    parse_user_row, placeholders, role_to_db, MAX_BOUND_IDS, USER_SELECT_SQL,
};
use crate::repo::link_repo::load_task_ids_by_user;
use crate::repo::store::SqliteSession;
use crate::repo::{map_unique_violation, RepoError, RepoResult};
use rusqlite::{params, params_from_iter, OptionalExtension};
use std::collections::BTreeSet;

/// Data access contract for user rows.
pub trait UserRepository {
    /// Inserts the profile, credential and role. `user.task_ids` is ignored.
    fn insert_user(&self, user: &NewUser) -> RepoResult<UserId>;
    /// Overwrites name and email of an existing user.
    fn update_user(&self, user: &User) -> RepoResult<()>;
    /// Removes the user row. Links must already be severed.
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Resolves many ids in one round trip. Unknown ids are absent from the
    /// result, which is ordered by id.
    fn find_users_by_ids(&self, ids: &BTreeSet<UserId>) -> RepoResult<Vec<User>>;
    fn query_users(&self, spec: &UserQuerySpec) -> RepoResult<Vec<User>>;
    fn count_users(&self) -> RepoResult<u64>;
}

impl UserRepository for SqliteSession<'_> {
    fn insert_user(&self, user: &NewUser) -> RepoResult<UserId> {
        self.conn
            .execute(
                "INSERT INTO users (first_name, last_name, email, credential, role)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.credential,
                    role_to_db(user.role),
                ],
            )
            .map_err(|err| map_unique_violation(err, EntityKind::User, &user.email))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_user(&self, user: &User) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users
                 SET
                    first_name = ?2,
                    last_name = ?3,
                    email = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![user.id, user.first_name, user.last_name, user.email],
            )
            .map_err(|err| map_unique_violation(err, EntityKind::User, &user.email))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::User,
                id: user.id,
            });
        }
        Ok(())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::User,
                id,
            });
        }
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE u.id = ?1;");
        self.find_one_user(&sql, params![id])
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE u.email = ?1;");
        self.find_one_user(&sql, params![email])
    }

    fn find_users_by_ids(&self, ids: &BTreeSet<UserId>) -> RepoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.iter().copied().collect::<Vec<_>>();
        let mut users = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "{USER_SELECT_SQL} WHERE u.id IN ({}) ORDER BY u.id ASC;",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                users.push(parse_user_row(row)?);
            }
        }
        self.attach_task_ids(users)
    }

    fn query_users(&self, spec: &UserQuerySpec) -> RepoResult<Vec<User>> {
        let clause = spec.render();
        let sql = clause.complete(USER_SELECT_SQL);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(clause.binds.iter()))?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        self.attach_task_ids(users)
    }

    fn count_users(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative user count {count}")))
    }
}

impl SqliteSession<'_> {
    fn find_one_user(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(sql)?;
        let user = stmt
            .query_row(params, |row| Ok(parse_user_row(row)))
            .optional()?
            .transpose()?;

        match user {
            Some(user) => Ok(self.attach_task_ids(vec![user])?.pop()),
            None => Ok(None),
        }
    }

    fn attach_task_ids(&self, mut users: Vec<User>) -> RepoResult<Vec<User>> {
        let ids = users.iter().map(|user| user.id).collect::<BTreeSet<_>>();
        let mut links = load_task_ids_by_user(self.conn, &ids)?;
        for user in &mut users {
            user.task_ids = links.remove(&user.id).unwrap_or_default();
        }
        Ok(users)
    }
}
