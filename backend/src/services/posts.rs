//! Post operations, including the like/save toggles.

use log::debug;

use super::{Reply, ServiceResult, NOT_AUTHENTICATED, NOT_FOUND, PERMISSION_DENIED};
use crate::api::{validate_content, Comment, NewPost, Post, PostId, Relation};
use crate::auth::permissions::{is_author, is_author_or_read_only, is_authenticated_or_read_only};
use crate::auth::{Action, Requester};
use crate::db::repository::FullRepository;

pub const POST_DOES_NOT_EXIST: &str = "Post does not exist";
pub const PERMISSION_NOT_FOUND: &str = "Permission not found";

/// Result of a like or save toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub relation: Relation,
    pub message: &'static str,
    /// Membership after the toggle.
    pub active: bool,
    /// Size of the relation after the toggle.
    pub count: usize,
}

/// Validate `content` from a write body, naming the field in the message.
///
/// Surrounding whitespace is dropped before the length check and the returned
/// slice is what gets stored.
pub(crate) fn check_content(content: Option<&str>) -> Result<&str, String> {
    let content = content
        .ok_or_else(|| "content: This field is required.".to_string())?
        .trim();
    validate_content(content).map_err(|e| format!("content: {}", e))?;
    Ok(content)
}

/// All posts, newest first.
pub async fn list_posts<R: FullRepository + ?Sized>(repo: &R) -> ServiceResult<Reply<Vec<Post>>> {
    Ok(Reply::ok(repo.list_posts().await?))
}

pub async fn retrieve_post<R: FullRepository + ?Sized>(
    repo: &R,
    post_id: PostId,
) -> ServiceResult<Reply<Post>> {
    if !repo.post_exists(post_id).await? {
        return Ok(Reply::not_found(NOT_FOUND));
    }
    Ok(Reply::ok(repo.get_post(post_id).await?))
}

/// Create a post authored by the requester.
pub async fn create_post<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    content: Option<&str>,
) -> ServiceResult<Reply<Post>> {
    let Some(user) = requester.user() else {
        return Ok(Reply::unauthorized(NOT_AUTHENTICATED));
    };

    let content = match check_content(content) {
        Ok(content) => content,
        Err(message) => return Ok(Reply::bad_request(message)),
    };

    let post = repo
        .create_post(NewPost {
            author: user.id,
            content: content.to_string(),
        })
        .await?;
    debug!("User {} created post {}", user.id, post.id);
    Ok(Reply::created(post))
}

/// Resolve the target of an update or delete and run the author checks.
///
/// Returns the post when every check passes, or the reply to send.
async fn authorize_write<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    post_id: PostId,
    action: Action,
) -> ServiceResult<Result<Post, Reply<Post>>> {
    if !is_authenticated_or_read_only(requester, action) {
        return Ok(Err(Reply::unauthorized(NOT_AUTHENTICATED)));
    }

    if !repo.post_exists(post_id).await? {
        return Ok(Err(Reply::not_found(POST_DOES_NOT_EXIST)));
    }

    let post = repo.get_post(post_id).await?;

    if !is_author(requester, post.author) {
        return Ok(Err(Reply::forbidden(PERMISSION_NOT_FOUND)));
    }

    if !is_author_or_read_only(requester, action, post.author) {
        return Ok(Err(Reply::forbidden(PERMISSION_DENIED)));
    }

    Ok(Ok(post))
}

/// Replace (`partial == false`) or patch a post's content.
///
/// A full update requires `content`; a partial update without it keeps the
/// content and only bumps `updated`.
pub async fn update_post<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    post_id: PostId,
    content: Option<&str>,
    partial: bool,
) -> ServiceResult<Reply<Post>> {
    let action = if partial {
        Action::PartialUpdate
    } else {
        Action::Update
    };

    let post = match authorize_write(repo, requester, post_id, action).await? {
        Ok(post) => post,
        Err(reply) => return Ok(reply),
    };

    if partial && content.is_none() {
        return Ok(Reply::ok(
            repo.update_post_content(post_id, &post.content).await?,
        ));
    }

    let content = match check_content(content) {
        Ok(content) => content,
        Err(message) => return Ok(Reply::bad_request(message)),
    };

    Ok(Reply::ok(repo.update_post_content(post_id, content).await?))
}

pub async fn delete_post<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    post_id: PostId,
) -> ServiceResult<Reply<()>> {
    if let Err(reply) = authorize_write(repo, requester, post_id, Action::Destroy).await? {
        return Ok(reply.map(|_| ()));
    }

    if !repo.delete_post(post_id).await? {
        return Ok(Reply::not_found(POST_DOES_NOT_EXIST));
    }
    debug!("Deleted post {}", post_id);
    Ok(Reply::no_content())
}

fn own_post_message(relation: Relation) -> &'static str {
    match relation {
        Relation::Like => "You cannot like your own post",
        Relation::Save => "You cannot save your own post",
    }
}

fn toggled_message(relation: Relation, active: bool) -> &'static str {
    match (relation, active) {
        (Relation::Like, true) => "Post liked successfully",
        (Relation::Like, false) => "Post unliked successfully",
        (Relation::Save, true) => "Post saved successfully",
        (Relation::Save, false) => "Post deleted from saved successfully",
    }
}

/// Add the requester to a post's relation, or remove them if already present.
///
/// Anonymous requesters, missing posts and the post's own author all get 404.
pub async fn toggle_membership<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    post_id: PostId,
    relation: Relation,
) -> ServiceResult<Reply<ToggleOutcome>> {
    let Some(user) = requester.user() else {
        // Both toggles share the like wording.
        return Ok(Reply::not_found("You must be logged in to like a post"));
    };

    if !repo.post_exists(post_id).await? {
        return Ok(Reply::not_found(POST_DOES_NOT_EXIST));
    }

    let post = repo.get_post(post_id).await?;

    if post.author == user.id {
        return Ok(Reply::not_found(own_post_message(relation)));
    }

    if !is_author_or_read_only(requester, Action::toggle(relation), post.author) {
        return Ok(Reply::forbidden(PERMISSION_DENIED));
    }

    let active = if repo.is_member(post_id, relation, user.id).await? {
        repo.remove_member(post_id, relation, user.id).await?;
        false
    } else {
        repo.add_member(post_id, relation, user.id).await?;
        true
    };
    let count = repo.member_count(post_id, relation).await?;
    debug!(
        "User {} toggled {} on post {}: active={} count={}",
        user.id, relation, post_id, active, count
    );

    Ok(Reply::ok(ToggleOutcome {
        relation,
        message: toggled_message(relation, active),
        active,
        count,
    }))
}

pub async fn like_toggle<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    post_id: PostId,
) -> ServiceResult<Reply<ToggleOutcome>> {
    toggle_membership(repo, requester, post_id, Relation::Like).await
}

pub async fn save_toggle<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    post_id: PostId,
) -> ServiceResult<Reply<ToggleOutcome>> {
    toggle_membership(repo, requester, post_id, Relation::Save).await
}

/// Posts the requester has saved, newest first. Empty for anonymous requesters.
pub async fn saved_posts<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
) -> ServiceResult<Reply<Vec<Post>>> {
    let Some(user_id) = requester.user_id() else {
        return Ok(Reply::ok(Vec::new()));
    };
    Ok(Reply::ok(
        repo.list_posts_with_member(Relation::Save, user_id).await?,
    ))
}

/// Comments on a post, newest first.
pub async fn comments_for_post<R: FullRepository + ?Sized>(
    repo: &R,
    post_id: PostId,
) -> ServiceResult<Reply<Vec<Comment>>> {
    if !repo.post_exists(post_id).await? {
        return Ok(Reply::not_found(POST_DOES_NOT_EXIST));
    }
    Ok(Reply::ok(repo.list_comments_for_post(post_id).await?))
}

pub async fn get_by_id<R: FullRepository + ?Sized>(
    repo: &R,
    post_id: PostId,
) -> ServiceResult<Reply<Post>> {
    if !repo.post_exists(post_id).await? {
        return Ok(Reply::not_found(POST_DOES_NOT_EXIST));
    }
    Ok(Reply::ok(repo.get_post(post_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{NewComment, UserId};
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{CommentRepository, PostRepository, UserRepository};
    use crate::services::test_support::{acting, make_user};
    use crate::services::Status;

    async fn seeded() -> (LocalRepository, Requester, Requester, Post) {
        let repo = LocalRepository::new();
        let amy = make_user(&repo, "amy").await;
        let bob = make_user(&repo, "bob").await;
        let post = create_post(&repo, &acting(&amy), Some("hello"))
            .await
            .unwrap()
            .into_data()
            .unwrap();
        (repo, acting(&amy), acting(&bob), post)
    }

    #[tokio::test]
    async fn test_create_post_forces_author() {
        let (_repo, amy, _bob, post) = seeded().await;
        assert_eq!(Some(post.author), amy.user_id());
        assert_eq!(post.content, "hello");
        assert!(post.liked_by.is_empty());
        assert!(post.saved_by.is_empty());
    }

    #[tokio::test]
    async fn test_create_post_requires_login_and_valid_content() {
        let (repo, amy, _bob, _post) = seeded().await;

        let reply = create_post(&repo, &Requester::Anonymous, Some("hi")).await.unwrap();
        assert_eq!(reply.status, Status::Unauthorized);

        let reply = create_post(&repo, &amy, None).await.unwrap();
        assert_eq!(reply.status, Status::BadRequest);

        let long = "x".repeat(141);
        let reply = create_post(&repo, &amy, Some(&long)).await.unwrap();
        assert_eq!(reply.status, Status::BadRequest);
        assert_eq!(repo.post_count(), 1);
    }

    #[tokio::test]
    async fn test_like_toggle_twice_restores_state() {
        let (repo, _amy, bob, post) = seeded().await;

        let first = like_toggle(&repo, &bob, post.id).await.unwrap();
        let first = first.data().unwrap();
        assert!(first.active);
        assert_eq!(first.count, 1);
        assert_eq!(first.message, "Post liked successfully");

        let second = like_toggle(&repo, &bob, post.id).await.unwrap();
        let second = second.data().unwrap();
        assert!(!second.active);
        assert_eq!(second.count, 0);
        assert_eq!(second.message, "Post unliked successfully");

        assert!(repo.get_post(post.id).await.unwrap().liked_by.is_empty());
    }

    #[tokio::test]
    async fn test_save_toggle_messages() {
        let (repo, _amy, bob, post) = seeded().await;

        let saved = save_toggle(&repo, &bob, post.id).await.unwrap();
        assert_eq!(saved.data().unwrap().message, "Post saved successfully");
        let unsaved = save_toggle(&repo, &bob, post.id).await.unwrap();
        assert_eq!(
            unsaved.data().unwrap().message,
            "Post deleted from saved successfully"
        );
    }

    #[tokio::test]
    async fn test_toggle_rejections_are_404() {
        let (repo, amy, bob, post) = seeded().await;

        let reply = like_toggle(&repo, &Requester::Anonymous, post.id).await.unwrap();
        assert_eq!(reply.status, Status::NotFound);
        assert_eq!(reply.error_message(), Some("You must be logged in to like a post"));

        let reply = save_toggle(&repo, &bob, PostId(999)).await.unwrap();
        assert_eq!(reply.error_message(), Some(POST_DOES_NOT_EXIST));

        let reply = like_toggle(&repo, &amy, post.id).await.unwrap();
        assert_eq!(reply.status, Status::NotFound);
        assert_eq!(reply.error_message(), Some("You cannot like your own post"));

        let reply = save_toggle(&repo, &amy, post.id).await.unwrap();
        assert_eq!(reply.error_message(), Some("You cannot save your own post"));

        let post = repo.get_post(post.id).await.unwrap();
        assert!(post.liked_by.is_empty());
        assert!(post.saved_by.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_permissions() {
        let (repo, amy, bob, post) = seeded().await;

        let reply = update_post(&repo, &Requester::Anonymous, post.id, Some("x"), false)
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Unauthorized);

        let reply = update_post(&repo, &bob, post.id, Some("x"), false).await.unwrap();
        assert_eq!(reply.status, Status::Forbidden);
        assert_eq!(reply.error_message(), Some(PERMISSION_NOT_FOUND));

        let reply = delete_post(&repo, &bob, post.id).await.unwrap();
        assert_eq!(reply.status, Status::Forbidden);

        let reply = update_post(&repo, &amy, post.id, Some("edited"), false)
            .await
            .unwrap();
        assert_eq!(reply.data().unwrap().content, "edited");

        let reply = delete_post(&repo, &amy, post.id).await.unwrap();
        assert_eq!(reply.status, Status::NoContent);
        assert!(!repo.post_exists(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_staff_non_author_passes_is_author_but_not_object_check() {
        let (repo, _amy, _bob, post) = seeded().await;
        let mut staff = make_user(&repo, "mod").await;
        staff.is_staff = true;
        let staff = repo.update_user(&staff).await.unwrap();

        let reply = delete_post(&repo, &acting(&staff), post.id).await.unwrap();
        assert_eq!(reply.status, Status::Forbidden);
        assert_eq!(reply.error_message(), Some(PERMISSION_DENIED));
        assert!(repo.post_exists(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_full_update_requires_content_partial_does_not() {
        let (repo, amy, _bob, post) = seeded().await;

        let reply = update_post(&repo, &amy, post.id, None, false).await.unwrap();
        assert_eq!(reply.status, Status::BadRequest);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let reply = update_post(&repo, &amy, post.id, None, true).await.unwrap();
        assert_eq!(reply.status, Status::Ok);
        let patched = reply.into_data().unwrap();
        assert_eq!(patched.content, "hello");
        assert!(patched.updated > post.updated);
        assert_eq!(patched.created, post.created);
    }

    #[tokio::test]
    async fn test_content_is_trimmed_before_checks_and_storage() {
        let (repo, amy, _bob, post) = seeded().await;

        let created = create_post(&repo, &amy, Some("  padded \n"))
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(created.content, "padded");

        let at_limit = format!("{}\n", "x".repeat(140));
        let reply = create_post(&repo, &amy, Some(&at_limit)).await.unwrap();
        assert_eq!(reply.status, Status::Created);
        assert_eq!(reply.data().unwrap().content.chars().count(), 140);

        let reply = create_post(&repo, &amy, Some(" \t ")).await.unwrap();
        assert_eq!(reply.status, Status::BadRequest);

        let reply = update_post(&repo, &amy, post.id, Some(" edited "), false)
            .await
            .unwrap();
        assert_eq!(reply.data().unwrap().content, "edited");
    }

    #[tokio::test]
    async fn test_missing_post_paths() {
        let (repo, amy, _bob, _post) = seeded().await;
        let missing = PostId(404);

        let reply = delete_post(&repo, &amy, missing).await.unwrap();
        assert_eq!(reply.status, Status::NotFound);
        assert_eq!(reply.error_message(), Some(POST_DOES_NOT_EXIST));

        let reply = update_post(&repo, &amy, missing, Some("x"), true).await.unwrap();
        assert_eq!(reply.error_message(), Some(POST_DOES_NOT_EXIST));

        let reply = get_by_id(&repo, missing).await.unwrap();
        assert_eq!(reply.error_message(), Some(POST_DOES_NOT_EXIST));

        let reply = comments_for_post(&repo, missing).await.unwrap();
        assert_eq!(reply.status, Status::NotFound);

        let reply = retrieve_post(&repo, missing).await.unwrap();
        assert_eq!(reply.error_message(), Some(NOT_FOUND));
    }

    #[tokio::test]
    async fn test_saved_posts_for_requester() {
        let (repo, amy, bob, post) = seeded().await;
        let other = create_post(&repo, &amy, Some("second"))
            .await
            .unwrap()
            .into_data()
            .unwrap();
        save_toggle(&repo, &bob, post.id).await.unwrap();
        save_toggle(&repo, &bob, other.id).await.unwrap();

        let saved = saved_posts(&repo, &bob).await.unwrap().into_data().unwrap();
        let ids: Vec<PostId> = saved.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![other.id, post.id]);

        let anonymous = saved_posts(&repo, &Requester::Anonymous)
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert!(anonymous.is_empty());
    }

    #[tokio::test]
    async fn test_comments_for_post_newest_first() {
        let (repo, _amy, bob, post) = seeded().await;
        let author = bob.user_id().unwrap_or(UserId(0));
        for text in ["one", "two"] {
            repo.create_comment(NewComment {
                post: post.id,
                author,
                content: text.to_string(),
            })
            .await
            .unwrap();
        }

        let comments = comments_for_post(&repo, post.id)
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "two");
        assert_eq!(comments[0].author_username, "bob");
    }
}
