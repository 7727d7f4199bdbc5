//! Task use-case service.
//!
//! # Responsibility
//! - Validate task drafts, enforce title uniqueness and reconcile the user
//!   assignment set inside one unit of work per call.
//! - Serve paged, filtered and sorted task listings.
//!
//! # Invariants
//! - A failed call leaves scalar fields and links exactly as they were.
//! - Returned DTOs are read back from the store after the write.

use crate::model::dto::{TaskDto, TaskSummary};
use crate::model::task::{Task, TaskDraft, TaskId, TaskStatus};
use crate::model::user::UserId;
use crate::model::EntityKind;
use crate::query::{
    build_task_spec, Page, SortDirection, TaskCriteria, TaskFilters, TaskQuerySpec,
};
use crate::repo::{EntityStore, StoreSession, TaskRepository, UserRepository};
use crate::service::error::{Conflict, ServiceError};
use crate::service::reconcile::{
    apply_delta, attach, detach, sever_all, AssociationDelta, Owner, Reconciliation,
    UnknownIdPolicy,
};
use crate::service::AssignmentAction;
use chrono::{Local, NaiveDate};
use log::{error, info};
use std::collections::BTreeSet;

/// Task service facade over an [`EntityStore`].
pub struct TaskService<S: EntityStore> {
    store: S,
    unknown_ids: UnknownIdPolicy,
}

impl<S: EntityStore> TaskService<S> {
    /// Creates a service that rejects unknown user ids.
    pub fn new(store: S) -> Self {
        Self {
            store,
            unknown_ids: UnknownIdPolicy::Reject,
        }
    }

    pub fn with_unknown_id_policy(mut self, policy: UnknownIdPolicy) -> Self {
        self.unknown_ids = policy;
        self
    }

    /// Creates a task and assigns the requested users.
    ///
    /// The deadline, when set, must be after today's local date.
    pub fn create(&self, draft: &TaskDraft) -> Result<TaskDto, ServiceError> {
        self.create_on(draft, Local::now().date_naive())
    }

    /// [`create`](Self::create) with an explicit notion of today.
    pub fn create_on(&self, draft: &TaskDraft, today: NaiveDate) -> Result<TaskDto, ServiceError> {
        let result = draft
            .validate_for_create(today)
            .map_err(ServiceError::from)
            .and_then(|()| {
                self.store
                    .unit_of_work(|session| create_task(session, draft, self.unknown_ids))
            });

        match &result {
            Ok(dto) => info!(
                "event=task_create module=service status=ok task_id={} users={}",
                dto.id,
                dto.users.len()
            ),
            Err(err) => error!("event=task_create module=service status=error error={err}"),
        }
        result
    }

    /// Replaces every scalar field and reconciles `draft.user_ids`.
    pub fn update(&self, id: TaskId, draft: &TaskDraft) -> Result<TaskDto, ServiceError> {
        let result = draft
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| {
                self.store
                    .unit_of_work(|session| update_task(session, id, draft, self.unknown_ids))
            });

        match &result {
            Ok((dto, reconciliation)) => info!(
                "event=task_update module=service status=ok task_id={} added={} removed={} skipped={}",
                dto.id,
                reconciliation.added.len(),
                reconciliation.removed.len(),
                reconciliation.skipped.len()
            ),
            Err(err) => {
                error!("event=task_update module=service status=error task_id={id} error={err}")
            }
        }
        result.map(|(dto, _)| dto)
    }

    pub fn change_status(&self, id: TaskId, status: TaskStatus) -> Result<TaskDto, ServiceError> {
        let result = self.store.unit_of_work(|session| {
            let mut task = require_task(session, id)?;
            task.status = status;
            session.update_task(&task)?;
            assemble(session, &task)
        });

        if let Err(err) = &result {
            error!("event=task_status module=service status=error task_id={id} error={err}");
        }
        result
    }

    /// Adds or removes one user from the task.
    ///
    /// # Errors
    /// - `NotFound` when the task or the user does not exist.
    /// - `Conflict::AlreadyAttached` / `Conflict::NotAttached` when the pair
    ///   is already in the requested state.
    pub fn modify_user_assignment(
        &self,
        id: TaskId,
        user_id: UserId,
        action: AssignmentAction,
    ) -> Result<TaskDto, ServiceError> {
        let result = self.store.unit_of_work(|session| {
            require_task(session, id)?;
            if session.get_user(user_id)?.is_none() {
                return Err(ServiceError::NotFound {
                    entity: EntityKind::User,
                    id: user_id,
                });
            }
            match action {
                AssignmentAction::Add => attach(session, id, user_id)?,
                AssignmentAction::Remove => detach(session, id, user_id)?,
            }
            let task = require_task(session, id)?;
            assemble(session, &task)
        });

        match &result {
            Ok(_) => info!(
                "event=task_assign module=service status=ok task_id={id} user_id={user_id} action={action}"
            ),
            Err(err) => error!(
                "event=task_assign module=service status=error task_id={id} user_id={user_id} action={action} error={err}"
            ),
        }
        result
    }

    /// Unassigns every user, then removes the task.
    pub fn delete(&self, id: TaskId) -> Result<(), ServiceError> {
        let result = self.store.unit_of_work(|session| {
            require_task(session, id)?;
            let severed = sever_all(session, Owner::Task(id))?;
            session.delete_task(id)?;
            Ok::<_, ServiceError>(severed)
        });

        match &result {
            Ok(severed) => {
                info!("event=task_delete module=service status=ok task_id={id} severed={severed}")
            }
            Err(err) => {
                error!("event=task_delete module=service status=error task_id={id} error={err}")
            }
        }
        result.map(|_| ())
    }

    pub fn find_by_id(&self, id: TaskId) -> Result<TaskDto, ServiceError> {
        self.store.read(|session| {
            let task = require_task(session, id)?;
            assemble(session, &task)
        })
    }

    pub fn find_by_title(&self, title: &str) -> Result<TaskDto, ServiceError> {
        self.store.read(|session| {
            let task =
                session
                    .find_task_by_title(title)?
                    .ok_or_else(|| ServiceError::NotFoundByKey {
                        entity: EntityKind::Task,
                        key: title.to_string(),
                    })?;
            assemble(session, &task)
        })
    }

    /// One page of tasks with their assignees.
    pub fn find_all_detailed(&self, criteria: &TaskCriteria) -> Result<Vec<TaskDto>, ServiceError> {
        let spec = build_task_spec(
            &criteria.filters(),
            Page::numbered(criteria.page),
            criteria.sort,
            criteria.direction,
        );
        self.store.read(|session| {
            let tasks = session.query_tasks(&spec)?;
            assemble_many(session, &tasks)
        })
    }

    /// Every matching task, without assignees.
    pub fn find_all_basic(&self, criteria: &TaskCriteria) -> Result<Vec<TaskSummary>, ServiceError> {
        let spec = build_task_spec(
            &criteria.filters(),
            Page::Unbounded,
            criteria.sort,
            criteria.direction,
        );
        self.store.read(|session| summarize(session, &spec))
    }

    /// One page of tasks nobody is assigned to.
    pub fn find_unassigned(
        &self,
        page: Option<i64>,
        sort: bool,
        direction: SortDirection,
    ) -> Result<Vec<TaskSummary>, ServiceError> {
        let filters = TaskFilters {
            unassigned: true,
            ..TaskFilters::default()
        };
        let spec = build_task_spec(&filters, Page::numbered(page), sort, direction);
        self.store.read(|session| summarize(session, &spec))
    }

    pub fn count(&self) -> Result<u64, ServiceError> {
        self.store
            .read(|session| session.count_tasks().map_err(ServiceError::from))
    }
}

fn create_task(
    session: &dyn StoreSession,
    draft: &TaskDraft,
    policy: UnknownIdPolicy,
) -> Result<TaskDto, ServiceError> {
    if session.find_task_by_title(&draft.title)?.is_some() {
        return Err(Conflict::DuplicateKey {
            entity: EntityKind::Task,
            key: draft.title.clone(),
        }
        .into());
    }

    let id = session.insert_task(draft)?;
    let delta = AssociationDelta::between(&BTreeSet::new(), draft.user_ids.as_ref());
    reconcile_users(session, id, &delta, policy)?;

    let task = session
        .get_task(id)?
        .ok_or(ServiceError::InconsistentState(
            "created task not found in read-back",
        ))?;
    assemble(session, &task)
}

fn update_task(
    session: &dyn StoreSession,
    id: TaskId,
    draft: &TaskDraft,
    policy: UnknownIdPolicy,
) -> Result<(TaskDto, Reconciliation), ServiceError> {
    let mut task = require_task(session, id)?;
    if let Some(other) = session.find_task_by_title(&draft.title)? {
        if other.id != id {
            return Err(Conflict::DuplicateKey {
                entity: EntityKind::Task,
                key: draft.title.clone(),
            }
            .into());
        }
    }

    let delta = AssociationDelta::between(&task.user_ids, draft.user_ids.as_ref());
    let reconciliation = reconcile_users(session, id, &delta, policy)?;

    task.apply_fields(draft);
    session.update_task(&task)?;

    let task = require_task(session, id)?;
    Ok((assemble(session, &task)?, reconciliation))
}

fn reconcile_users(
    session: &dyn StoreSession,
    id: TaskId,
    delta: &AssociationDelta,
    policy: UnknownIdPolicy,
) -> Result<Reconciliation, ServiceError> {
    if delta.is_empty() {
        return Ok(Reconciliation::default());
    }
    let resolved = session
        .find_users_by_ids(&delta.to_add)?
        .into_iter()
        .map(|user| user.id)
        .collect::<BTreeSet<_>>();
    apply_delta(session, Owner::Task(id), delta, &resolved, policy)
}

fn require_task(session: &dyn StoreSession, id: TaskId) -> Result<Task, ServiceError> {
    session.get_task(id)?.ok_or(ServiceError::NotFound {
        entity: EntityKind::Task,
        id,
    })
}

fn assemble(session: &dyn StoreSession, task: &Task) -> Result<TaskDto, ServiceError> {
    let users = session.find_users_by_ids(&task.user_ids)?;
    Ok(TaskDto::assemble(task, &users))
}

/// Resolves the assignees of every task with one bulk lookup.
fn assemble_many(session: &dyn StoreSession, tasks: &[Task]) -> Result<Vec<TaskDto>, ServiceError> {
    let user_ids = tasks
        .iter()
        .flat_map(|task| task.user_ids.iter().copied())
        .collect::<BTreeSet<_>>();
    let users = session.find_users_by_ids(&user_ids)?;
    Ok(tasks
        .iter()
        .map(|task| TaskDto::assemble(task, &users))
        .collect())
}

fn summarize(
    session: &dyn StoreSession,
    spec: &TaskQuerySpec,
) -> Result<Vec<TaskSummary>, ServiceError> {
    Ok(session
        .query_tasks(spec)?
        .iter()
        .map(TaskSummary::from)
        .collect())
}
