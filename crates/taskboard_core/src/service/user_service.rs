//! User use-case service.
//!
//! Mirrors [`TaskService`](crate::service::TaskService) from the user side:
//! the same unit-of-work shape, the same reconciler, the same conflict rules.
//! Credential and role are set on creation and never changed here.

use crate::model::dto::{UserDto, UserSummary};
use crate::model::task::TaskId;
use crate::model::user::{NewUser, User, UserChanges, UserId};
use crate::model::EntityKind;
use crate::query::{build_user_spec, Page, UserCriteria, UserFilters, UserQuerySpec};
use crate::repo::{EntityStore, StoreSession, TaskRepository, UserRepository};
use crate::service::error::{Conflict, ServiceError};
use crate::service::reconcile::{
    apply_delta, attach, detach, sever_all, AssociationDelta, Owner, Reconciliation,
    UnknownIdPolicy,
};
use crate::service::AssignmentAction;
use log::{error, info};
use std::collections::BTreeSet;

pub struct UserService<S: EntityStore> {
    store: S,
    unknown_ids: UnknownIdPolicy,
}

impl<S: EntityStore> UserService<S> {
    /// Creates a service that rejects unknown task ids.
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

    /// Registers a user and assigns the requested tasks.
    pub fn create(&self, user: &NewUser) -> Result<UserDto, ServiceError> {
        let result = user.validate().map_err(ServiceError::from).and_then(|()| {
            self.store
                .unit_of_work(|session| create_user(session, user, self.unknown_ids))
        });

        match &result {
            Ok(dto) => info!(
                "event=user_create module=service status=ok user_id={} tasks={}",
                dto.id,
                dto.tasks.len()
            ),
            Err(err) => error!("event=user_create module=service status=error error={err}"),
        }
        result
    }

    /// Replaces name and email and reconciles `changes.task_ids`.
    pub fn update(&self, id: UserId, changes: &UserChanges) -> Result<UserDto, ServiceError> {
        let result = changes
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| {
                self.store
                    .unit_of_work(|session| update_user(session, id, changes, self.unknown_ids))
            });

        match &result {
            Ok((dto, reconciliation)) => info!(
                "event=user_update module=service status=ok user_id={} added={} removed={} skipped={}",
                dto.id,
                reconciliation.added.len(),
                reconciliation.removed.len(),
                reconciliation.skipped.len()
            ),
            Err(err) => {
                error!("event=user_update module=service status=error user_id={id} error={err}")
            }
        }
        result.map(|(dto, _)| dto)
    }

    /// Adds or removes one task from the user.
    pub fn modify_task_assignment(
        &self,
        id: UserId,
        task_id: TaskId,
        action: AssignmentAction,
    ) -> Result<UserDto, ServiceError> {
        let result = self.store.unit_of_work(|session| {
            require_user(session, id)?;
            if session.get_task(task_id)?.is_none() {
                return Err(ServiceError::NotFound {
                    entity: EntityKind::Task,
                    id: task_id,
                });
            }
            match action {
                AssignmentAction::Add => attach(session, task_id, id)?,
                AssignmentAction::Remove => detach(session, task_id, id)?,
            }
            let user = require_user(session, id)?;
            assemble(session, &user)
        });

        match &result {
            Ok(_) => info!(
                "event=user_assign module=service status=ok user_id={id} task_id={task_id} action={action}"
            ),
            Err(err) => error!(
                "event=user_assign module=service status=error user_id={id} task_id={task_id} action={action} error={err}"
            ),
        }
        result
    }

    /// Unassigns every task, then removes the user.
    pub fn delete(&self, id: UserId) -> Result<(), ServiceError> {
        let result = self.store.unit_of_work(|session| {
            require_user(session, id)?;
            let severed = sever_all(session, Owner::User(id))?;
            session.delete_user(id)?;
            Ok::<_, ServiceError>(severed)
        });

        match &result {
            Ok(severed) => {
                info!("event=user_delete module=service status=ok user_id={id} severed={severed}")
            }
            Err(err) => {
                error!("event=user_delete module=service status=error user_id={id} error={err}")
            }
        }
        result.map(|_| ())
    }

    pub fn find_by_id(&self, id: UserId) -> Result<UserDto, ServiceError> {
        self.store.read(|session| {
            let user = require_user(session, id)?;
            assemble(session, &user)
        })
    }

    pub fn find_by_email(&self, email: &str) -> Result<UserDto, ServiceError> {
        self.store.read(|session| {
            let user =
                session
                    .find_user_by_email(email)?
                    .ok_or_else(|| ServiceError::NotFoundByKey {
                        entity: EntityKind::User,
                        key: email.to_string(),
                    })?;
            assemble(session, &user)
        })
    }

    /// One page of users with their tasks.
    pub fn find_all_detailed(&self, criteria: &UserCriteria) -> Result<Vec<UserDto>, ServiceError> {
        let spec = build_user_spec(&criteria.filters(), Page::numbered(criteria.page));
        self.store.read(|session| {
            let users = session.query_users(&spec)?;
            assemble_many(session, &users)
        })
    }

    /// Every matching user, without tasks.
    pub fn find_all_basic(&self, criteria: &UserCriteria) -> Result<Vec<UserSummary>, ServiceError> {
        let spec = build_user_spec(&criteria.filters(), Page::Unbounded);
        self.store.read(|session| summarize(session, &spec))
    }

    /// One page of users without any task.
    pub fn find_unassigned(&self, page: Option<i64>) -> Result<Vec<UserSummary>, ServiceError> {
        let filters = UserFilters {
            unassigned: true,
            ..UserFilters::default()
        };
        let spec = build_user_spec(&filters, Page::numbered(page));
        self.store.read(|session| summarize(session, &spec))
    }

    pub fn count(&self) -> Result<u64, ServiceError> {
        self.store
            .read(|session| session.count_users().map_err(ServiceError::from))
    }
}

fn create_user(
    session: &dyn StoreSession,
    user: &NewUser,
    policy: UnknownIdPolicy,
) -> Result<UserDto, ServiceError> {
    if session.find_user_by_email(&user.email)?.is_some() {
        return Err(Conflict::DuplicateKey {
            entity: EntityKind::User,
            key: user.email.clone(),
        }
        .into());
    }

    let id = session.insert_user(user)?;
    let delta = AssociationDelta::between(&BTreeSet::new(), user.task_ids.as_ref());
    reconcile_tasks(session, id, &delta, policy)?;

    let created = session
        .get_user(id)?
        .ok_or(ServiceError::InconsistentState(
            "created user not found in read-back",
        ))?;
    assemble(session, &created)
}

fn update_user(
    session: &dyn StoreSession,
    id: UserId,
    changes: &UserChanges,
    policy: UnknownIdPolicy,
) -> Result<(UserDto, Reconciliation), ServiceError> {
    let mut user = require_user(session, id)?;
    if let Some(other) = session.find_user_by_email(&changes.email)? {
        if other.id != id {
            return Err(Conflict::DuplicateKey {
                entity: EntityKind::User,
                key: changes.email.clone(),
            }
            .into());
        }
    }

    let delta = AssociationDelta::between(&user.task_ids, changes.task_ids.as_ref());
    let reconciliation = reconcile_tasks(session, id, &delta, policy)?;

    user.apply_changes(changes);
    session.update_user(&user)?;

    let user = require_user(session, id)?;
    Ok((assemble(session, &user)?, reconciliation))
}

fn reconcile_tasks(
    session: &dyn StoreSession,
    id: UserId,
    delta: &AssociationDelta,
    policy: UnknownIdPolicy,
) -> Result<Reconciliation, ServiceError> {
    if delta.is_empty() {
        return Ok(Reconciliation::default());
    }
    let resolved = session
        .find_tasks_by_ids(&delta.to_add)?
        .into_iter()
        .map(|task| task.id)
        .collect::<BTreeSet<_>>();
    apply_delta(session, Owner::User(id), delta, &resolved, policy)
}

fn require_user(session: &dyn StoreSession, id: UserId) -> Result<User, ServiceError> {
    session.get_user(id)?.ok_or(ServiceError::NotFound {
        entity: EntityKind::User,
        id,
    })
}

fn assemble(session: &dyn StoreSession, user: &User) -> Result<UserDto, ServiceError> {
    let tasks = session.find_tasks_by_ids(&user.task_ids)?;
    Ok(UserDto::assemble(user, &tasks))
}

fn assemble_many(session: &dyn StoreSession, users: &[User]) -> Result<Vec<UserDto>, ServiceError> {
    let task_ids = users
        .iter()
        .flat_map(|user| user.task_ids.iter().copied())
        .collect::<BTreeSet<_>>();
    let tasks = session.find_tasks_by_ids(&task_ids)?;
    Ok(users
        .iter()
        .map(|user| UserDto::assemble(user, &tasks))
        .collect())
}

fn summarize(
    session: &dyn StoreSession,
    spec: &UserQuerySpec,
) -> Result<Vec<UserSummary>, ServiceError> {
    Ok(session
        .query_users(spec)?
        .iter()
        .map(UserSummary::from)
        .collect())
}
