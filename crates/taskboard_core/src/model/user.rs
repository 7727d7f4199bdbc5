//! User domain model.
//!
//! # Invariants
//! - `email` is unique across all users (enforced at write time by the store).
//! - `credential` is opaque here; it is stored as given and never projected
//!   into DTOs.
//! - `task_ids` is the user side of the assignment relation.

use crate::model::task::TaskId;
use crate::model::validation::{require_email, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Store-assigned user identifier.
pub type UserId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Persisted user together with its current assignment set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub credential: String,
    pub role: Role,
    /// Tasks this user is currently assigned to.
    pub task_ids: BTreeSet<TaskId>,
}

impl User {
    pub fn is_assigned_to(&self, task_id: TaskId) -> bool {
        self.task_ids.contains(&task_id)
    }

    /// Overwrites the profile fields an update is allowed to change.
    pub fn apply_changes(&mut self, changes: &UserChanges) {
        self.first_name = changes.first_name.clone();
        self.last_name = changes.last_name.clone();
        self.email = changes.email.clone();
    }
}

/// Input for user registration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub credential: String,
    #[serde(default)]
    pub role: Role,
    /// Tasks to assign right after creation.
    #[serde(default)]
    pub task_ids: Option<BTreeSet<TaskId>>,
}

impl NewUser {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = credential.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_tasks(mut self, task_ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.task_ids = Some(task_ids.into_iter().collect());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("first name", &self.first_name)?;
        require_text("last name", &self.last_name)?;
        require_email(&self.email)
    }
}

/// Replacement profile for an existing user. Credential and role are not
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// `None` keeps the current assignments; `Some(empty)` clears them.
    #[serde(default)]
    pub task_ids: Option<BTreeSet<TaskId>>,
}

impl UserChanges {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            task_ids: None,
        }
    }

    pub fn with_tasks(mut self, task_ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.task_ids = Some(task_ids.into_iter().collect());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("first name", &self.first_name)?;
        require_text("last name", &self.last_name)?;
        require_email(&self.email)
    }
}
