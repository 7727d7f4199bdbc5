//! Domain model for tasks, users and their assignment links.
//!
//! # Responsibility
//! - Define the records the entity store persists and the services mutate.
//! - Define the shallow DTO projections returned to callers.
//!
//! # Invariants
//! - Each entity carries its association set as owned counterpart ids, never
//!   as references to the counterpart records.
//! - `u ∈ task.user_ids ⇔ t ∈ user.task_ids` for any pair loaded from the same
//!   committed store state.

pub mod dto;
pub mod task;
pub mod user;
pub mod validation;

use std::fmt::{Display, Formatter};

/// The two entity kinds on either side of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Task,
    User,
}

impl EntityKind {
    /// Kind on the other side of the assignment relation.
    pub fn counterpart(self) -> Self {
        match self {
            Self::Task => Self::User,
            Self::User => Self::Task,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::User => write!(f, "user"),
        }
    }
}
