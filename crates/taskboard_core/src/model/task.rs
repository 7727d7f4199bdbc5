//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record and the draft used to create/replace it.
//! - Validate drafts before they reach the entity store.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `title` is unique across all tasks (enforced at write time by the store).
//! - `user_ids` is the task side of the assignment relation.

use crate::model::user::UserId;
use crate::model::validation::{require_storable_deadline, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Task progress. Any transition between values is allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];
}

/// Persisted task together with its current assignment set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    /// Users currently assigned to this task.
    pub user_ids: BTreeSet<UserId>,
}

impl Task {
    /// Returns whether `user_id` is in this task's assignment set.
    pub fn is_assigned_to(&self, user_id: UserId) -> bool {
        self.user_ids.contains(&user_id)
    }

    /// Overwrites every scalar field with the draft values.
    ///
    /// The assignment set is left alone; it only changes through the
    /// reconciler.
    pub fn apply_fields(&mut self, draft: &TaskDraft) {
        self.title = draft.title.clone();
        self.description = draft.description.clone();
        self.status = draft.status;
        self.deadline = draft.deadline;
    }
}

/// Full task state supplied by callers on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Desired assignment set.
    ///
    /// `None` keeps the current assignments on update; `Some(empty)` clears
    /// them.
    #[serde(default)]
    pub user_ids: Option<BTreeSet<UserId>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_users(mut self, user_ids: impl IntoIterator<Item = UserId>) -> Self {
        self.user_ids = Some(user_ids.into_iter().collect());
        self
    }

    /// Checks the rules that apply to every write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        if let Some(deadline) = self.deadline {
            require_storable_deadline(deadline)?;
        }
        Ok(())
    }

    /// Checks write rules plus the creation-only deadline rule.
    pub fn validate_for_create(&self, today: NaiveDate) -> Result<(), ValidationError> {
        self.validate()?;
        match self.deadline {
            Some(deadline) if deadline <= today => {
                Err(ValidationError::DeadlineNotInFuture { deadline, today })
            }
            _ => Ok(()),
        }
    }
}
