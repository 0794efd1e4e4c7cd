//! HTTP contract tests driving the router with `oneshot`.

#![cfg(feature = "http-server")]

mod support;

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::{json, Value};

use support::http::{
    create_post, register_and_login, request_json, send, superuser_token, test_app,
};

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("array body")
        .iter()
        .map(|item| item["id"].as_i64().expect("id"))
        .collect()
}

#[tokio::test]
async fn test_root_and_health() {
    let (app, _repo) = test_app();

    let (status, body) = request_json(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"], "/posts/");

    let (status, body) = request_json(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_create_then_like_twice() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let bob = register_and_login(&app, "bob").await;

    let post = create_post(&app, &amy, "hello").await;
    assert_eq!(post["content"], "hello");
    assert_eq!(post["liked_by"], json!([]));
    assert_eq!(post["saved_by"], json!([]));
    let post_id = post["id"].as_i64().unwrap();
    let uri = format!("/posts/{}/like_toggle/", post_id);

    let (status, body) = request_json(&app, "POST", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": "Post liked successfully", "liked": true, "likes_count": 1})
    );

    let (status, body) = request_json(&app, "POST", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": "Post unliked successfully", "liked": false, "likes_count": 0})
    );
}

#[tokio::test]
async fn test_author_cannot_toggle_own_post() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let post_id = create_post(&app, &amy, "mine").await["id"].as_i64().unwrap();

    let uri = format!("/posts/{}/like_toggle/", post_id);
    let (status, body) = request_json(&app, "POST", &uri, Some(&amy), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "You cannot like your own post"}));

    let uri = format!("/posts/{}/save_toggle/", post_id);
    let (status, body) = request_json(&app, "POST", &uri, Some(&amy), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "You cannot save your own post"}));

    let (_, post) = request_json(&app, "GET", &format!("/posts/{}/", post_id), None, None).await;
    assert_eq!(post["liked_by"], json!([]));
    assert_eq!(post["saved_by"], json!([]));
}

#[tokio::test]
async fn test_anonymous_toggle_is_404() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let post_id = create_post(&app, &amy, "hi").await["id"].as_i64().unwrap();

    let uri = format!("/posts/{}/save_toggle/", post_id);
    let (status, body) = request_json(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "You must be logged in to like a post");
}

#[tokio::test]
async fn test_saved_posts_lists_requesters_saves() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let bob = register_and_login(&app, "bob").await;
    let first = create_post(&app, &amy, "first").await["id"].as_i64().unwrap();
    let second = create_post(&app, &amy, "second").await["id"].as_i64().unwrap();

    for id in [first, second] {
        let uri = format!("/posts/{}/save_toggle/", id);
        let (status, body) = request_json(&app, "POST", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["saved"], true);
    }

    let (status, body) = request_json(&app, "GET", "/posts/saved_posts/", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![second, first]);

    let (_, body) = request_json(&app, "GET", "/posts/saved_posts/", None, None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_list_posts_newest_first_after_update() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let a = create_post(&app, &amy, "a").await["id"].as_i64().unwrap();
    let b = create_post(&app, &amy, "b").await["id"].as_i64().unwrap();
    let c = create_post(&app, &amy, "c").await["id"].as_i64().unwrap();

    let (status, _) = request_json(
        &app,
        "PATCH",
        &format!("/posts/{}/", a),
        Some(&amy),
        Some(json!({"content": "a, edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request_json(&app, "GET", "/posts/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![c, b, a]);
}

#[tokio::test]
async fn test_update_and_delete_permissions() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let bob = register_and_login(&app, "bob").await;
    let post_id = create_post(&app, &amy, "original").await["id"].as_i64().unwrap();
    let uri = format!("/posts/{}/", post_id);

    let (status, _) = request_json(&app, "PUT", &uri, None, Some(json!({"content": "x"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        request_json(&app, "PUT", &uri, Some(&bob), Some(json!({"content": "x"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Permission not found");

    let (status, body) = request_json(&app, "PUT", &uri, Some(&amy), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("required"));

    let (status, body) =
        request_json(&app, "PUT", &uri, Some(&amy), Some(json!({"content": "new"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "new");

    let (status, _) = request_json(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request_json(&app, "DELETE", &uri, Some(&amy), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_delete_missing_post_is_404() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;

    let (status, body) = request_json(&app, "DELETE", "/posts/4242/", Some(&amy), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Post does not exist"}));
}

#[tokio::test]
async fn test_content_limit() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/posts/",
        Some(&amy),
        Some(json!({"content": "x".repeat(141)})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("140"));

    // A trailing newline does not count toward the limit and is not stored
    let padded = format!("{}\n", "x".repeat(140));
    let body = create_post(&app, &amy, &padded).await;
    assert_eq!(body["content"], "x".repeat(140));
}

#[tokio::test]
async fn test_comments_flow() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let bob = register_and_login(&app, "bob").await;
    let post_id = create_post(&app, &amy, "talk to me").await["id"].as_i64().unwrap();

    let mut comment_ids = Vec::new();
    for text in ["first!", "second"] {
        let (status, body) = request_json(
            &app,
            "POST",
            "/comments/",
            Some(&bob),
            Some(json!({"post": post_id, "content": text})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["author"], "bob");
        comment_ids.push(body["id"].as_i64().unwrap());
    }

    let uri = format!("/posts/{}/get_comment_by_post_id/", post_id);
    let (status, body) = request_json(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![comment_ids[1], comment_ids[0]]);

    let uri = format!("/comments/{}/", comment_ids[0]);
    let (status, body) = request_json(&app, "DELETE", &uri, Some(&amy), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Permission not found");

    let (status, _) = request_json(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = request_json(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Comment does not exist");

    // Deleting the post takes its comments with it
    let (status, _) =
        request_json(&app, "DELETE", &format!("/posts/{}/", post_id), Some(&amy), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = request_json(&app, "GET", "/comments/", None, None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_get_by_id_and_missing_comment_listing() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let post = create_post(&app, &amy, "by id").await;
    let post_id = post["id"].as_i64().unwrap();

    let (status, body) =
        request_json(&app, "GET", &format!("/posts/{}/get_by_id/", post_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, post);

    let (status, body) = request_json(&app, "GET", "/posts/999/get_by_id/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post does not exist");

    let (status, body) =
        request_json(&app, "GET", "/posts/999/get_comment_by_post_id/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Post does not exist");
}

#[tokio::test]
async fn test_registration_contract() {
    let (app, _repo) = test_app();

    let (status, body) = request_json(
        &app,
        "POST",
        "/register/",
        None,
        Some(json!({
            "username": "amy",
            "password": "one",
            "confirm_password": "two",
            "email": "amy@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Password do not match."}));

    // The mismatched attempt created nothing
    let (status, body) = request_json(
        &app,
        "POST",
        "/login/",
        None,
        Some(json!({"username": "amy", "password": "one"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unable to log in with provided credentials.");

    let (status, body) = request_json(
        &app,
        "POST",
        "/register/",
        None,
        Some(json!({"username": "amy"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User credentials are not valid");

    register_and_login(&app, "amy").await;
    let (status, body) = request_json(
        &app,
        "POST",
        "/register/",
        None,
        Some(json!({
            "username": "amy",
            "password": "pw",
            "confirm_password": "pw",
            "email": "fresh@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "Username is already taken");
}

#[tokio::test]
async fn test_token_header_handling() {
    let (app, _repo) = test_app();

    let (status, body) =
        request_json(&app, "POST", "/posts/", Some("not-a-real-key"), Some(json!({"content": "x"})))
            .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token.");

    let request = Request::builder()
        .method("POST")
        .uri("/posts/")
        .header("authorization", "Basic dXNlcjpwdw==")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"content": "x"}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication credentials were not provided.");

    let amy = register_and_login(&app, "amy").await;
    let request = Request::builder()
        .method("POST")
        .uri("/posts/")
        .header("authorization", format!("Bearer {}", amy))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"content": "via bearer"}"#))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_json_is_400_with_error_body() {
    let (app, _repo) = test_app();
    let amy = register_and_login(&app, "amy").await;

    let request = Request::builder()
        .method("POST")
        .uri("/posts/")
        .header("authorization", format!("Token {}", amy))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_users_endpoints_and_manager_toggle() {
    let (app, repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let root = superuser_token(&app, &repo, "root").await;

    let (status, _) = request_json(&app, "GET", "/users/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = request_json(&app, "GET", "/users/", Some(&amy), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = request_json(&app, "GET", "/users/", Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    let amy_json = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "amy")
        .cloned()
        .unwrap();
    assert!(amy_json.get("password_hash").is_none());
    assert!(amy_json.get("password").is_none());
    assert_eq!(amy_json["is_staff"], false);
    let amy_id = amy_json["id"].as_i64().unwrap();

    let uri = format!("/users/{}/add_remove_manager/", amy_id);
    let (status, body) = request_json(&app, "PUT", &uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": "User added to manager list", "is_staff": true})
    );

    // The flag is persisted: amy is now staff and can list users
    let (status, detail) =
        request_json(&app, "GET", &format!("/users/{}/", amy_id), Some(&amy), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["is_staff"], true);

    // Staff but not superuser
    let (status, body) = request_json(&app, "PUT", &uri, Some(&amy), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Access is not allowed"}));

    let (status, body) =
        request_json(&app, "PUT", "/users/9999/add_remove_manager/", Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "User does not exist"}));
}

#[tokio::test]
async fn test_user_relations_are_listed() {
    let (app, repo) = test_app();
    let amy = register_and_login(&app, "amy").await;
    let bob = register_and_login(&app, "bob").await;
    let root = superuser_token(&app, &repo, "root").await;
    let post_id = create_post(&app, &amy, "hi").await["id"].as_i64().unwrap();

    request_json(&app, "POST", &format!("/posts/{}/like_toggle/", post_id), Some(&bob), None)
        .await;
    request_json(&app, "POST", &format!("/posts/{}/save_toggle/", post_id), Some(&bob), None)
        .await;

    let (_, users) = request_json(&app, "GET", "/users/", Some(&root), None).await;
    let bob_json = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "bob")
        .cloned()
        .unwrap();
    assert_eq!(bob_json["likes"], json!([post_id]));
    assert_eq!(bob_json["saved"], json!([post_id]));
    assert_eq!(bob_json["posts"], json!([]));
}

#[tokio::test]
async fn test_unknown_route_and_bad_id() {
    let (app, _repo) = test_app();

    let (status, body) = request_json(&app, "GET", "/nope/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found.");

    let (status, body) = request_json(&app, "GET", "/posts/abc/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found.");
}
