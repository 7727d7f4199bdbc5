//! Listing specifications for tasks and users.
//!
//! # Responsibility
//! - Turn optional filter criteria, a sort toggle and a 1-based page number
//!   into one deterministic [`QuerySpec`].
//! - Own the canonical ordering and tie-break rules of every listing.
//!
//! # Invariants
//! - Unset filters match everything; set filters combine with AND.
//! - Page numbers `<= 0` or absent select the first page.
//! - Every ordering ends with `id ASC`, so page boundaries are stable even
//!   when the primary sort key has ties.
//! - Composition is pure: equal inputs give equal specs.

mod sql;

pub(crate) use sql::RenderSql;

use crate::model::task::{TaskId, TaskStatus};
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};

/// Rows per page for every paged listing.
pub const PAGE_SIZE: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Row window of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Zero-based page `index` of `size` rows.
    Window { index: u32, size: u32 },
    /// Whole result set in one page.
    Unbounded,
}

impl Page {
    /// Normalizes a caller-facing 1-based page number into a window of
    /// [`PAGE_SIZE`] rows.
    pub fn numbered(page: Option<i64>) -> Self {
        let index = match page {
            Some(value) if value >= 1 => u32::try_from(value - 1).unwrap_or(u32::MAX),
            _ => 0,
        };
        Self::Window {
            index,
            size: PAGE_SIZE,
        }
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        match self {
            Self::Window { index, size } => u64::from(*index) * u64::from(*size),
            Self::Unbounded => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskPredicate {
    AssignedTo(UserId),
    Status(TaskStatus),
    Unassigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserPredicate {
    AssignedTo(TaskId),
    FirstName(String),
    LastName(String),
    Unassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOrder {
    Id(SortDirection),
    /// Tasks without a deadline come last in either direction.
    Deadline(SortDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserOrder {
    Id(SortDirection),
}

/// Store-agnostic listing specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySpec<P, O> {
    pub predicates: Vec<P>,
    pub order: Vec<O>,
    pub page: Page,
}

pub type TaskQuerySpec = QuerySpec<TaskPredicate, TaskOrder>;
pub type UserQuerySpec = QuerySpec<UserPredicate, UserOrder>;

/// Recognized task filters. `None` fields match every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub assigned_to: Option<UserId>,
    pub status: Option<TaskStatus>,
    /// Restrict to tasks with an empty assignment set.
    pub unassigned: bool,
}

/// Recognized user filters. `None` fields match every user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilters {
    pub assigned_to: Option<TaskId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Restrict to users with an empty assignment set.
    pub unassigned: bool,
}

/// Caller-facing task listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCriteria {
    pub assigned_to: Option<UserId>,
    pub status: Option<TaskStatus>,
    /// 1-based page number; ignored by unbounded listings.
    pub page: Option<i64>,
    /// Order by deadline instead of id.
    pub sort: bool,
    pub direction: SortDirection,
}

impl TaskCriteria {
    pub fn filters(&self) -> TaskFilters {
        TaskFilters {
            assigned_to: self.assigned_to,
            status: self.status,
            unassigned: false,
        }
    }
}

/// Caller-facing user listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserCriteria {
    pub assigned_to: Option<TaskId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// 1-based page number; ignored by unbounded listings.
    pub page: Option<i64>,
}

impl UserCriteria {
    pub fn filters(&self) -> UserFilters {
        UserFilters {
            assigned_to: self.assigned_to,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            unassigned: false,
        }
    }
}

/// Composes a task listing spec.
///
/// With `sort` off the order is `id ASC`. With `sort` on it is `deadline` in
/// `direction` with undated tasks last, then `id ASC`.
pub fn build_task_spec(
    filters: &TaskFilters,
    page: Page,
    sort: bool,
    direction: SortDirection,
) -> TaskQuerySpec {
    let mut predicates = Vec::new();
    if let Some(user_id) = filters.assigned_to {
        predicates.push(TaskPredicate::AssignedTo(user_id));
    }
    if let Some(status) = filters.status {
        predicates.push(TaskPredicate::Status(status));
    }
    if filters.unassigned {
        predicates.push(TaskPredicate::Unassigned);
    }

    let order = if sort {
        vec![
            TaskOrder::Deadline(direction),
            TaskOrder::Id(SortDirection::Asc),
        ]
    } else {
        vec![TaskOrder::Id(SortDirection::Asc)]
    };

    QuerySpec {
        predicates,
        order,
        page,
    }
}

/// Composes a user listing spec ordered by `id ASC`.
pub fn build_user_spec(filters: &UserFilters, page: Page) -> UserQuerySpec {
    let mut predicates = Vec::new();
    if let Some(task_id) = filters.assigned_to {
        predicates.push(UserPredicate::AssignedTo(task_id));
    }
    if let Some(first_name) = filters.first_name.as_ref() {
        predicates.push(UserPredicate::FirstName(first_name.clone()));
    }
    if let Some(last_name) = filters.last_name.as_ref() {
        predicates.push(UserPredicate::LastName(last_name.clone()));
    }
    if filters.unassigned {
        predicates.push(UserPredicate::Unassigned);
    }

    QuerySpec {
        predicates,
        order: vec![UserOrder::Id(SortDirection::Asc)],
        page,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_task_spec, build_user_spec, Page, SortDirection, TaskFilters, TaskOrder,
        TaskPredicate, UserFilters, UserPredicate, PAGE_SIZE,
    };
    use crate::model::task::TaskStatus;

    #[test]
    fn page_numbers_are_one_based_and_clamped() {
        assert_eq!(
            Page::numbered(None),
            Page::Window {
                index: 0,
                size: PAGE_SIZE
            }
        );
        assert_eq!(Page::numbered(Some(0)), Page::numbered(None));
        assert_eq!(Page::numbered(Some(-4)), Page::numbered(None));
        assert_eq!(
            Page::numbered(Some(3)),
            Page::Window {
                index: 2,
                size: PAGE_SIZE
            }
        );
        assert_eq!(Page::numbered(Some(3)).offset(), 4);
        assert_eq!(Page::Unbounded.offset(), 0);
    }

    #[test]
    fn unset_filters_produce_no_predicates() {
        let spec = build_task_spec(
            &TaskFilters::default(),
            Page::Unbounded,
            false,
            SortDirection::Desc,
        );
        assert!(spec.predicates.is_empty());
        assert_eq!(spec.order, vec![TaskOrder::Id(SortDirection::Asc)]);
    }

    #[test]
    fn sorted_task_spec_breaks_deadline_ties_by_id() {
        let filters = TaskFilters {
            assigned_to: Some(7),
            status: Some(TaskStatus::Done),
            unassigned: false,
        };
        let spec = build_task_spec(&filters, Page::numbered(Some(2)), true, SortDirection::Desc);

        assert_eq!(
            spec.predicates,
            vec![
                TaskPredicate::AssignedTo(7),
                TaskPredicate::Status(TaskStatus::Done)
            ]
        );
        assert_eq!(
            spec.order,
            vec![
                TaskOrder::Deadline(SortDirection::Desc),
                TaskOrder::Id(SortDirection::Asc)
            ]
        );
    }

    #[test]
    fn composing_twice_yields_equal_specs() {
        let filters = UserFilters {
            assigned_to: None,
            first_name: Some("alex".to_string()),
            last_name: Some("smith".to_string()),
            unassigned: true,
        };
        let first = build_user_spec(&filters, Page::numbered(Some(1)));
        let second = build_user_spec(&filters, Page::numbered(Some(1)));

        assert_eq!(first, second);
        assert_eq!(
            first.predicates,
            vec![
                UserPredicate::FirstName("alex".to_string()),
                UserPredicate::LastName("smith".to_string()),
                UserPredicate::Unassigned,
            ]
        );
    }
}
