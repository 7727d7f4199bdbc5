//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate entity store, association reconciler and query composer
//!   calls into task and user use-cases.
//! - Map store failures into [`ServiceError`] values callers can match on.
//!
//! # Invariants
//! - Every public operation runs in exactly one unit of work.

pub mod error;
pub mod reconcile;
pub mod task_service;
pub mod user_service;

pub use error::{Conflict, ServiceError};
pub use reconcile::{AssociationDelta, Reconciliation, UnknownIdPolicy};
pub use task_service::TaskService;
pub use user_service::UserService;

use std::fmt::{Display, Formatter};

/// Single-pair assignment change requested from either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAction {
    Add,
    Remove,
}

impl Display for AssignmentAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}
