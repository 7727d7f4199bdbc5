//! Shallow read projections returned by the services.
//!
//! A task DTO embeds user summaries (without their tasks) and a user DTO
//! embeds task summaries (without their users), so assembling one entity never
//! walks the whole assignment graph.

use crate::model::task::{Task, TaskId, TaskStatus};
use crate::model::user::{Role, User, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            deadline: task.deadline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    /// Assigned users ordered by id.
    pub users: Vec<UserSummary>,
}

impl TaskDto {
    /// Builds the DTO from a task and its resolved assignees.
    ///
    /// Users not in `task.user_ids` are ignored.
    pub fn assemble(task: &Task, users: &[User]) -> Self {
        let mut summaries = users
            .iter()
            .filter(|user| task.is_assigned_to(user.id))
            .map(UserSummary::from)
            .collect::<Vec<_>>();
        summaries.sort_by_key(|summary| summary.id);

        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            deadline: task.deadline,
            users: summaries,
        }
    }

    pub fn user_ids(&self) -> Vec<UserId> {
        self.users.iter().map(|user| user.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    /// Assigned tasks ordered by id.
    pub tasks: Vec<TaskSummary>,
}

impl UserDto {
    /// Builds the DTO from a user and its resolved tasks.
    ///
    /// Tasks not in `user.task_ids` are ignored.
    pub fn assemble(user: &User, tasks: &[Task]) -> Self {
        let mut summaries = tasks
            .iter()
            .filter(|task| user.is_assigned_to(task.id))
            .map(TaskSummary::from)
            .collect::<Vec<_>>();
        summaries.sort_by_key(|summary| summary.id);

        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            tasks: summaries,
        }
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskDto, UserDto};
    use crate::model::task::{Task, TaskStatus};
    use crate::model::user::{Role, User};
    use std::collections::BTreeSet;

    fn user(id: i64, task_ids: &[i64]) -> User {
        User {
            id,
            first_name: format!("first{id}"),
            last_name: format!("last{id}"),
            email: format!("u{id}@example.com"),
            credential: "secret".to_string(),
            role: Role::User,
            task_ids: task_ids.iter().copied().collect(),
        }
    }

    fn task(id: i64, user_ids: &[i64]) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: "body".to_string(),
            status: TaskStatus::Todo,
            deadline: None,
            user_ids: user_ids.iter().copied().collect(),
        }
    }

    #[test]
    fn task_dto_orders_users_and_drops_strangers() {
        let t = task(1, &[3, 2]);
        let users = vec![user(3, &[1]), user(7, &[]), user(2, &[1])];

        let dto = TaskDto::assemble(&t, &users);

        assert_eq!(dto.user_ids(), vec![2, 3]);
    }

    #[test]
    fn user_dto_never_exposes_credential() {
        let u = user(5, &[1]);
        let dto = UserDto::assemble(&u, &[task(1, &[5])]);
        let json = serde_json::to_value(&dto).unwrap();

        assert!(json.get("credential").is_none());
        assert_eq!(json["role"], "USER");
        assert_eq!(json["tasks"][0]["id"], 1);
        assert!(json["tasks"][0].get("users").is_none());
        assert_eq!(u.task_ids, BTreeSet::from([1]));
    }
}
