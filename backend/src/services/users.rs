//! Admin-only user listing and the manager toggle.

use log::info;

use super::{Reply, ServiceResult, Status, NOT_AUTHENTICATED, NOT_FOUND, PERMISSION_DENIED};
use crate::api::{NewUser, User, UserId, UserRelations};
use crate::auth::permissions::is_admin_user;
use crate::auth::{hash_password, Requester};
use crate::db::repository::FullRepository;

/// A user with the ids of everything they relate to.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user: User,
    pub relations: UserRelations,
}

/// Result of the manager toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerOutcome {
    pub message: &'static str,
    pub is_staff: bool,
}

/// 401 for anonymous requesters, 403 for non-staff, `None` for admins.
fn deny_non_admin<T>(requester: &Requester) -> Option<Reply<T>> {
    if !requester.is_authenticated() {
        return Some(Reply::unauthorized(NOT_AUTHENTICATED));
    }
    if !is_admin_user(requester) {
        return Some(Reply::forbidden(PERMISSION_DENIED));
    }
    None
}

async fn load_profile<R: FullRepository + ?Sized>(repo: &R, user: User) -> ServiceResult<UserProfile> {
    let relations = repo.user_relations(user.id).await?;
    Ok(UserProfile { user, relations })
}

pub async fn list_users<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
) -> ServiceResult<Reply<Vec<UserProfile>>> {
    if let Some(denied) = deny_non_admin(requester) {
        return Ok(denied);
    }

    let users = repo.list_users().await?;
    let mut profiles = Vec::with_capacity(users.len());
    for user in users {
        profiles.push(load_profile(repo, user).await?);
    }
    Ok(Reply::ok(profiles))
}

pub async fn retrieve_user<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    user_id: UserId,
) -> ServiceResult<Reply<UserProfile>> {
    if let Some(denied) = deny_non_admin(requester) {
        return Ok(denied);
    }

    let user = match repo.get_user(user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => return Ok(Reply::not_found(NOT_FOUND)),
        Err(e) => return Err(e.into()),
    };
    Ok(Reply::ok(load_profile(repo, user).await?))
}

/// Flip the target's staff flag and persist it.
///
/// Only superusers may toggle; refusals and a missing target are reported with
/// status 200 and an `error` body.
pub async fn add_remove_manager<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    user_id: UserId,
) -> ServiceResult<Reply<ManagerOutcome>> {
    if let Some(denied) = deny_non_admin(requester) {
        return Ok(denied);
    }

    if !requester.is_superuser() {
        return Ok(Reply::error(Status::Ok, "Access is not allowed"));
    }

    let mut user = match repo.get_user(user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            return Ok(Reply::error(Status::Ok, "User does not exist"));
        }
        Err(e) => return Err(e.into()),
    };

    user.is_staff = !user.is_staff;
    let user = repo.update_user(&user).await?;
    info!("User {} is_staff set to {}", user.id, user.is_staff);

    let message = if user.is_staff {
        "User added to manager list"
    } else {
        "User removed from manager list"
    };
    Ok(Reply::ok(ManagerOutcome {
        message,
        is_staff: user.is_staff,
    }))
}

/// Create a superuser unless the username is already taken.
///
/// Returns the existing account untouched when it exists.
pub async fn ensure_superuser<R: FullRepository + ?Sized>(
    repo: &R,
    username: &str,
    email: &str,
    password: &str,
) -> ServiceResult<User> {
    if let Some(existing) = repo.find_user_by_username(username).await? {
        return Ok(existing);
    }

    let hash = hash_password(password)?;
    let user = repo
        .create_user(NewUser::superuser(username, email, hash))
        .await?;
    info!("Created superuser '{}' (id={})", user.username, user.id);
    Ok(user)
}
