//! Association reconciliation between tasks and users.
//!
//! # Responsibility
//! - Compute the minimal link/unlink delta that moves one entity's
//!   association set to a requested target ([`AssociationDelta::between`]).
//! - Apply a delta, a single attach/detach, or a full sever through
//!   [`LinkRepository`] only.
//!
//! # Invariants
//! - Counterparts outside `current ∪ desired` are never touched.
//! - Under [`UnknownIdPolicy::Reject`] an unknown id fails the call before any
//!   link is written.
//! - Applying the same target twice performs no link/unlink calls the second
//!   time.

use crate::model::task::TaskId;
use crate::model::user::UserId;
use crate::model::EntityKind;
use crate::repo::LinkRepository;
use crate::service::error::{Conflict, ServiceError};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How bulk reconciliation treats requested counterpart ids that do not
/// resolve to a stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownIdPolicy {
    /// Fail the whole call with `NotFound` naming the first unknown id.
    #[default]
    Reject,
    /// Drop unknown ids from the target and report them.
    Skip,
}

impl Display for UnknownIdPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for UnknownIdPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "skip" => Ok(Self::Skip),
            other => Err(other.to_string()),
        }
    }
}

/// Entity whose association set is being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Task(TaskId),
    User(UserId),
}

impl Owner {
    pub fn kind(self) -> EntityKind {
        match self {
            Self::Task(_) => EntityKind::Task,
            Self::User(_) => EntityKind::User,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Task(id) | Self::User(id) => id,
        }
    }

    /// `(task_id, user_id)` of the link between this owner and `counterpart`.
    fn pair(self, counterpart: i64) -> (TaskId, UserId) {
        match self {
            Self::Task(task_id) => (task_id, counterpart),
            Self::User(user_id) => (counterpart, user_id),
        }
    }
}

/// Link changes needed to reach a target association set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDelta {
    pub to_add: BTreeSet<i64>,
    pub to_remove: BTreeSet<i64>,
}

impl AssociationDelta {
    /// `desired = None` keeps the current set; `Some(empty)` clears it.
    pub fn between(current: &BTreeSet<i64>, desired: Option<&BTreeSet<i64>>) -> Self {
        match desired {
            None => Self::default(),
            Some(desired) => Self {
                to_add: desired.difference(current).copied().collect(),
                to_remove: current.difference(desired).copied().collect(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Outcome of applying a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub added: BTreeSet<i64>,
    pub removed: BTreeSet<i64>,
    /// Unknown ids dropped under [`UnknownIdPolicy::Skip`].
    pub skipped: BTreeSet<i64>,
}

/// Applies `delta` for `owner`.
///
/// `resolved` holds the ids of `delta.to_add` that exist in the store, found
/// by the caller with one bulk lookup.
pub fn apply_delta<L>(
    links: &L,
    owner: Owner,
    delta: &AssociationDelta,
    resolved: &BTreeSet<i64>,
    policy: UnknownIdPolicy,
) -> Result<Reconciliation, ServiceError>
where
    L: LinkRepository + ?Sized,
{
    let unknown = delta
        .to_add
        .difference(resolved)
        .copied()
        .collect::<BTreeSet<_>>();
    if let Some(&first) = unknown.iter().next() {
        match policy {
            UnknownIdPolicy::Reject => {
                return Err(ServiceError::NotFound {
                    entity: owner.kind().counterpart(),
                    id: first,
                })
            }
            UnknownIdPolicy::Skip => warn!(
                "event=reconcile module=service status=skipped owner={} owner_id={} unknown={:?}",
                owner.kind(),
                owner.id(),
                unknown
            ),
        }
    }

    let mut outcome = Reconciliation {
        skipped: unknown,
        ..Reconciliation::default()
    };
    for &counterpart in &delta.to_remove {
        let (task_id, user_id) = owner.pair(counterpart);
        if links.unlink(task_id, user_id)? {
            outcome.removed.insert(counterpart);
        }
    }
    for &counterpart in delta.to_add.intersection(resolved) {
        let (task_id, user_id) = owner.pair(counterpart);
        if links.link(task_id, user_id)? {
            outcome.added.insert(counterpart);
        }
    }

    debug!(
        "event=reconcile module=service status=ok owner={} owner_id={} added={} removed={}",
        owner.kind(),
        owner.id(),
        outcome.added.len(),
        outcome.removed.len()
    );
    Ok(outcome)
}

/// Links one pair. Both records must already be known to exist.
pub fn attach<L>(links: &L, task_id: TaskId, user_id: UserId) -> Result<(), ServiceError>
where
    L: LinkRepository + ?Sized,
{
    if !links.link(task_id, user_id)? {
        return Err(Conflict::AlreadyAttached { task_id, user_id }.into());
    }
    Ok(())
}

/// Unlinks one pair. Both records must already be known to exist.
pub fn detach<L>(links: &L, task_id: TaskId, user_id: UserId) -> Result<(), ServiceError>
where
    L: LinkRepository + ?Sized,
{
    if !links.unlink(task_id, user_id)? {
        return Err(Conflict::NotAttached { task_id, user_id }.into());
    }
    Ok(())
}

/// Unlinks `owner` from every counterpart currently linked to it, one pair at
/// a time. Returns how many links were removed.
pub fn sever_all<L>(links: &L, owner: Owner) -> Result<usize, ServiceError>
where
    L: LinkRepository + ?Sized,
{
    let current = match owner {
        Owner::Task(task_id) => links.user_ids_of_task(task_id)?,
        Owner::User(user_id) => links.task_ids_of_user(user_id)?,
    };
    let mut removed = 0;
    for counterpart in current {
        let (task_id, user_id) = owner.pair(counterpart);
        if links.unlink(task_id, user_id)? {
            removed += 1;
        }
    }
    Ok(removed)
}
