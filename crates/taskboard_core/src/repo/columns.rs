//! Column codecs and row parsers shared by the SQLite repositories.

use crate::model::task::{Task, TaskStatus};
use crate::model::user::{Role, User};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::Row;
use std::collections::BTreeSet;

const DEADLINE_FORMAT: &str = "%Y-%m-%d";

pub(crate) const TASK_SELECT_SQL: &str = "SELECT
    t.id AS id,
    t.title AS title,
    t.description AS description,
    t.status AS status,
    t.deadline AS deadline
FROM tasks t";

pub(crate) const USER_SELECT_SQL: &str = "SELECT
    u.id AS id,
    u.first_name AS first_name,
    u.last_name AS last_name,
    u.email AS email,
    u.credential AS credential,
    u.role AS role
FROM users u";

pub(crate) fn task_status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "TODO",
        TaskStatus::InProgress => "IN_PROGRESS",
        TaskStatus::Done => "DONE",
    }
}

fn parse_task_status(value: &str) -> Option<TaskStatus> {
    match value {
        "TODO" => Some(TaskStatus::Todo),
        "IN_PROGRESS" => Some(TaskStatus::InProgress),
        "DONE" => Some(TaskStatus::Done),
        _ => None,
    }
}

pub(crate) fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::Admin => "ADMIN",
        Role::User => "USER",
    }
}

fn parse_role(value: &str) -> Option<Role> {
    match value {
        "ADMIN" => Some(Role::Admin),
        "USER" => Some(Role::User),
        _ => None,
    }
}

pub(crate) fn deadline_to_db(deadline: Option<NaiveDate>) -> Option<String> {
    deadline.map(|value| value.format(DEADLINE_FORMAT).to_string())
}

fn parse_deadline(value: Option<String>) -> RepoResult<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, DEADLINE_FORMAT).map_err(|_| {
                RepoError::InvalidData(format!("invalid deadline `{text}` in tasks.deadline"))
            })
        })
        .transpose()
}

/// Parses one [`TASK_SELECT_SQL`] row. The assignment set starts empty.
pub(crate) fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let status_text: String = row.get("status")?;
    let status = parse_task_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        deadline: parse_deadline(row.get("deadline")?)?,
        user_ids: BTreeSet::new(),
    })
}

/// Parses one [`USER_SELECT_SQL`] row. The assignment set starts empty.
pub(crate) fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let role_text: String = row.get("role")?;
    let role = parse_role(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        credential: row.get("credential")?,
        role,
        task_ids: BTreeSet::new(),
    })
}

/// Most ids bound into a single `IN (...)` list. Larger sets are split so a
/// statement stays well under SQLite's host-parameter limit.
pub(crate) const MAX_BOUND_IDS: usize = 500;

/// `?, ?, ?` with one placeholder per bound id.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
