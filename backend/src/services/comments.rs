//! Comment operations.

use log::debug;

use super::posts::{check_content, PERMISSION_NOT_FOUND};
use super::{Reply, ServiceResult, NOT_AUTHENTICATED, NOT_FOUND, PERMISSION_DENIED};
use crate::api::{Comment, CommentId, NewComment, PostId};
use crate::auth::permissions::{is_author, is_author_or_read_only, is_authenticated_or_read_only};
use crate::auth::{Action, Requester};
use crate::db::repository::FullRepository;

pub const COMMENT_DOES_NOT_EXIST: &str = "Comment does not exist";

/// Writable comment fields. `post` is only read on create.
#[derive(Debug, Clone, Default)]
pub struct CommentInput {
    pub post: Option<PostId>,
    pub content: Option<String>,
}

/// All comments, newest first.
pub async fn list_comments<R: FullRepository + ?Sized>(
    repo: &R,
) -> ServiceResult<Reply<Vec<Comment>>> {
    Ok(Reply::ok(repo.list_comments().await?))
}

pub async fn retrieve_comment<R: FullRepository + ?Sized>(
    repo: &R,
    comment_id: CommentId,
) -> ServiceResult<Reply<Comment>> {
    if !repo.comment_exists(comment_id).await? {
        return Ok(Reply::not_found(NOT_FOUND));
    }
    Ok(Reply::ok(repo.get_comment(comment_id).await?))
}

/// Create a comment on an existing post, authored by the requester.
pub async fn create_comment<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    input: CommentInput,
) -> ServiceResult<Reply<Comment>> {
    let Some(user) = requester.user() else {
        return Ok(Reply::unauthorized(NOT_AUTHENTICATED));
    };

    let Some(post_id) = input.post else {
        return Ok(Reply::bad_request("post: This field is required."));
    };

    let content = match check_content(input.content.as_deref()) {
        Ok(content) => content.to_string(),
        Err(message) => return Ok(Reply::bad_request(message)),
    };

    if !repo.post_exists(post_id).await? {
        return Ok(Reply::bad_request(format!(
            "post: Invalid pk \"{}\" - object does not exist.",
            post_id
        )));
    }

    let comment = repo
        .create_comment(NewComment {
            post: post_id,
            author: user.id,
            content,
        })
        .await?;
    debug!("User {} commented {} on post {}", user.id, comment.id, post_id);
    Ok(Reply::created(comment))
}

/// Replace or patch a comment's content. Author only.
pub async fn update_comment<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    comment_id: CommentId,
    content: Option<&str>,
    partial: bool,
) -> ServiceResult<Reply<Comment>> {
    let action = if partial {
        Action::PartialUpdate
    } else {
        Action::Update
    };

    if !is_authenticated_or_read_only(requester, action) {
        return Ok(Reply::unauthorized(NOT_AUTHENTICATED));
    }

    if !repo.comment_exists(comment_id).await? {
        return Ok(Reply::not_found(NOT_FOUND));
    }

    let comment = repo.get_comment(comment_id).await?;

    if !is_author_or_read_only(requester, action, comment.author) {
        return Ok(Reply::forbidden(PERMISSION_DENIED));
    }

    // A bare PATCH still saves, refreshing `updated`
    if partial && content.is_none() {
        return Ok(Reply::ok(
            repo.update_comment_content(comment_id, &comment.content).await?,
        ));
    }

    let content = match check_content(content) {
        Ok(content) => content,
        Err(message) => return Ok(Reply::bad_request(message)),
    };

    Ok(Reply::ok(
        repo.update_comment_content(comment_id, content).await?,
    ))
}

pub async fn delete_comment<R: FullRepository + ?Sized>(
    repo: &R,
    requester: &Requester,
    comment_id: CommentId,
) -> ServiceResult<Reply<()>> {
    if !is_authenticated_or_read_only(requester, Action::Destroy) {
        return Ok(Reply::unauthorized(NOT_AUTHENTICATED));
    }

    if !repo.comment_exists(comment_id).await? {
        return Ok(Reply::not_found(COMMENT_DOES_NOT_EXIST));
    }

    let comment = repo.get_comment(comment_id).await?;

    if !is_author(requester, comment.author) {
        return Ok(Reply::forbidden(PERMISSION_NOT_FOUND));
    }

    if !is_author_or_read_only(requester, Action::Destroy, comment.author) {
        return Ok(Reply::forbidden(PERMISSION_DENIED));
    }

    if !repo.delete_comment(comment_id).await? {
        return Ok(Reply::not_found(COMMENT_DOES_NOT_EXIST));
    }
    Ok(Reply::no_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::services::posts::create_post;
    use crate::services::test_support::{acting, make_user};
    use crate::services::Status;

    async fn seeded() -> (LocalRepository, Requester, Requester, PostId) {
        let repo = LocalRepository::new();
        let amy = acting(&make_user(&repo, "amy").await);
        let bob = acting(&make_user(&repo, "bob").await);
        let post = create_post(&repo, &amy, Some("hello"))
            .await
            .unwrap()
            .into_data()
            .unwrap();
        (repo, amy, bob, post.id)
    }

    fn input(post: PostId, content: &str) -> CommentInput {
        CommentInput {
            post: Some(post),
            content: Some(content.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_comment_forces_author() {
        let (repo, _amy, bob, post) = seeded().await;
        let reply = create_comment(&repo, &bob, input(post, "nice")).await.unwrap();
        assert_eq!(reply.status, Status::Created);
        let comment = reply.into_data().unwrap();
        assert_eq!(comment.author_username, "bob");
        assert_eq!(comment.post, post);
    }

    #[tokio::test]
    async fn test_create_comment_validation() {
        let (repo, _amy, bob, post) = seeded().await;

        let reply = create_comment(&repo, &Requester::Anonymous, input(post, "x"))
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Unauthorized);

        let reply = create_comment(&repo, &bob, input(PostId(77), "x")).await.unwrap();
        assert_eq!(reply.status, Status::BadRequest);

        let reply = create_comment(
            &repo,
            &bob,
            CommentInput {
                post: Some(post),
                content: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(reply.status, Status::BadRequest);
        assert_eq!(repo.comment_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_comment_paths() {
        let (repo, amy, bob, post) = seeded().await;
        let comment = create_comment(&repo, &bob, input(post, "mine"))
            .await
            .unwrap()
            .into_data()
            .unwrap();

        let reply = delete_comment(&repo, &bob, CommentId(999)).await.unwrap();
        assert_eq!(reply.error_message(), Some(COMMENT_DOES_NOT_EXIST));

        let reply = delete_comment(&repo, &amy, comment.id).await.unwrap();
        assert_eq!(reply.status, Status::Forbidden);
        assert_eq!(reply.error_message(), Some(PERMISSION_NOT_FOUND));

        let reply = delete_comment(&repo, &bob, comment.id).await.unwrap();
        assert_eq!(reply.status, Status::NoContent);
        assert_eq!(repo.comment_count(), 0);
    }

    #[tokio::test]
    async fn test_update_comment_author_only() {
        let (repo, amy, bob, post) = seeded().await;
        let comment = create_comment(&repo, &bob, input(post, "first"))
            .await
            .unwrap()
            .into_data()
            .unwrap();

        let reply = update_comment(&repo, &amy, comment.id, Some("hijack"), false)
            .await
            .unwrap();
        assert_eq!(reply.status, Status::Forbidden);

        let reply = update_comment(&repo, &bob, comment.id, Some("second"), true)
            .await
            .unwrap();
        assert_eq!(reply.data().unwrap().content, "second");

        let reply = retrieve_comment(&repo, comment.id).await.unwrap();
        assert_eq!(reply.data().unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_bare_patch_refreshes_updated() {
        let (repo, _amy, bob, post) = seeded().await;
        let comment = create_comment(&repo, &bob, input(post, "  spaced  "))
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(comment.content, "spaced");

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let patched = update_comment(&repo, &bob, comment.id, None, true)
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(patched.content, "spaced");
        assert!(patched.updated > comment.updated);

        let reply = update_comment(&repo, &bob, comment.id, None, false)
            .await
            .unwrap();
        assert_eq!(reply.status, Status::BadRequest);
    }
}
