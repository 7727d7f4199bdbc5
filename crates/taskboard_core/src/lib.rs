//! Core domain logic for the taskboard.
//! This crate is the single source of truth for the task/user assignment
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, LogLevel};
pub use db::{open_db, open_db_at, open_db_in_memory, DatabaseLocation, DbError};
pub use logging::{init_from_config, init_logging, logging_status, LoggingError};
pub use model::dto::{TaskDto, TaskSummary, UserDto, UserSummary};
pub use model::task::{Task, TaskDraft, TaskId, TaskStatus};
pub use model::user::{NewUser, Role, User, UserChanges, UserId};
pub use model::validation::ValidationError;
pub use model::EntityKind;
pub use query::{SortDirection, TaskCriteria, UserCriteria, PAGE_SIZE};
pub use repo::{EntityStore, RepoError, RepoResult, SqliteStore};
pub use service::{
    AssignmentAction, Conflict, ServiceError, TaskService, UnknownIdPolicy, UserService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
