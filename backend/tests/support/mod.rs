#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Router-level helpers for HTTP contract tests.
#[cfg(feature = "http-server")]
pub mod http {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use microblog::db::{FullRepository, LocalRepository};
    use microblog::http::{create_router, AppState};
    use microblog::services;

    pub fn test_app() -> (Router, Arc<LocalRepository>) {
        let repo = Arc::new(LocalRepository::new());
        let app = create_router(AppState::new(
            Arc::clone(&repo) as Arc<dyn FullRepository>
        ));
        (app, repo)
    }

    pub async fn request_json(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Token {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        send(app, request).await
    }

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should serve request");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();

        if body.is_empty() {
            return (status, Value::Null);
        }

        let value = serde_json::from_slice(&body).expect("body should be valid json");
        (status, value)
    }

    /// Register through the API and log in, returning the token key.
    pub async fn register_and_login(app: &Router, username: &str) -> String {
        let (status, body) = request_json(
            app,
            "POST",
            "/register/",
            None,
            Some(json!({
                "username": username,
                "password": "pa55word",
                "confirm_password": "pa55word",
                "email": format!("{}@example.com", username),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        let (status, body) = request_json(
            app,
            "POST",
            "/login/",
            None,
            Some(json!({"username": username, "password": "pa55word"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"]
            .as_str()
            .expect("login returns a token")
            .to_string()
    }

    /// Create a superuser directly in storage and log in as them.
    pub async fn superuser_token(app: &Router, repo: &LocalRepository, username: &str) -> String {
        services::ensure_superuser(
            repo,
            username,
            &format!("{}@example.com", username),
            "r00t-pass",
        )
        .await
        .expect("superuser should be created");

        let (status, body) = request_json(
            app,
            "POST",
            "/login/",
            None,
            Some(json!({"username": username, "password": "r00t-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn create_post(app: &Router, token: &str, content: &str) -> Value {
        let (status, body) = request_json(
            app,
            "POST",
            "/posts/",
            Some(token),
            Some(json!({ "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {}", body);
        body
    }
}
