//! Service-level error model.
//!
//! Repository `NotFound` and `DuplicateKey` failures are lifted into the
//! caller-facing variants so callers match on one enum.

use crate::model::task::TaskId;
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use crate::model::EntityKind;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Write rejected because it contradicts current store state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Unique key (task title, user email) taken by another record.
    DuplicateKey { entity: EntityKind, key: String },
    AlreadyAttached { task_id: TaskId, user_id: UserId },
    NotAttached { task_id: TaskId, user_id: UserId },
}

impl Display for Conflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey { entity, key } => {
                write!(f, "{entity} with key `{key}` already exists")
            }
            Self::AlreadyAttached { task_id, user_id } => {
                write!(f, "user {user_id} is already assigned to task {task_id}")
            }
            Self::NotAttached { task_id, user_id } => {
                write!(f, "user {user_id} is not assigned to task {task_id}")
            }
        }
    }
}

/// Error returned by task and user service operations.
#[derive(Debug)]
pub enum ServiceError {
    NotFound { entity: EntityKind, id: i64 },
    NotFoundByKey { entity: EntityKind, key: String },
    Conflict(Conflict),
    Validation(ValidationError),
    Repo(RepoError),
    /// A record written in this unit of work could not be read back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotFoundByKey { .. })
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NotFoundByKey { entity, key } => write!(f, "{entity} not found: `{key}`"),
            Self::Conflict(conflict) => write!(f, "conflict: {conflict}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent store state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::DuplicateKey { entity, key } => {
                Self::Conflict(Conflict::DuplicateKey { entity, key })
            }
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<Conflict> for ServiceError {
    fn from(value: Conflict) -> Self {
        Self::Conflict(value)
    }
}
