//! Access-control predicates.
//!
//! Each predicate is a pure function of the requester, the action being
//! performed and, for object-level checks, the target's author. Callers branch
//! on the returned `bool`.

use super::Requester;
use crate::api::{Relation, UserId};

/// Handler actions subject to permission checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    LikeToggle,
    SaveToggle,
    SavedPosts,
    CommentsForPost,
    GetById,
    AddRemoveManager,
}

impl Action {
    /// Read-only actions (served for GET requests).
    pub fn is_safe(self) -> bool {
        matches!(
            self,
            Action::List
                | Action::Retrieve
                | Action::SavedPosts
                | Action::CommentsForPost
                | Action::GetById
        )
    }

    /// The toggle action for a membership relation.
    pub fn toggle(relation: Relation) -> Self {
        match relation {
            Relation::Like => Action::LikeToggle,
            Relation::Save => Action::SaveToggle,
        }
    }
}

/// Reads and membership toggles are open; every other write is author-only.
pub fn is_author_or_read_only(requester: &Requester, action: Action, author: UserId) -> bool {
    if action.is_safe() {
        return true;
    }

    if matches!(action, Action::LikeToggle | Action::SaveToggle) {
        return true;
    }

    requester.user_id() == Some(author)
}

/// The requester wrote the target, or is staff.
pub fn is_author(requester: &Requester, author: UserId) -> bool {
    requester.user_id() == Some(author) || requester.is_staff()
}

/// Writes need an authenticated requester.
pub fn is_authenticated_or_read_only(requester: &Requester, action: Action) -> bool {
    action.is_safe() || requester.is_authenticated()
}

/// Authenticated staff only.
pub fn is_admin_user(requester: &Requester) -> bool {
    requester.is_authenticated() && requester.is_staff()
}
