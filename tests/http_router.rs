//! Router-level tests over in-memory repositories.
//!
//! The Postgres pool is constructed lazily and never touched: every
//! exercised path goes through the repository traits instead.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use bytes::Bytes;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use rivista::application::auth::{AuthService, SESSION_COOKIE};
use rivista::application::comments::CommentService;
use rivista::application::feed::FeedService;
use rivista::application::follows::FollowService;
use rivista::application::pagination::Paginator;
use rivista::application::posts::PostService;
use rivista::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, SessionsRepo, UsersRepo,
};
use rivista::cache::{CacheState, CachedPage, PageCacheConfig, PageKey};
use rivista::infra::db::PostgresRepositories;
use rivista::infra::http::{build_router, HttpState};
use rivista::infra::uploads::UploadStorage;

use common::InMemoryRepos;

const BOUNDARY: &str = "rivista-test-boundary";

struct Fixture {
    repos: Arc<InMemoryRepos>,
    state: HttpState,
    // Held so the upload directory survives until the test ends.
    _uploads_dir: tempfile::TempDir,
}

impl Fixture {
    fn new(upload_body_limit: usize, cache: Option<CacheState>) -> Self {
        let repos = Arc::new(InMemoryRepos::default());
        let posts_repo: Arc<dyn PostsRepo> = Arc::clone(&repos) as _;
        let writes_repo: Arc<dyn PostsWriteRepo> = Arc::clone(&repos) as _;
        let groups_repo: Arc<dyn GroupsRepo> = Arc::clone(&repos) as _;
        let users_repo: Arc<dyn UsersRepo> = Arc::clone(&repos) as _;
        let comments_repo: Arc<dyn CommentsRepo> = Arc::clone(&repos) as _;
        let follows_repo: Arc<dyn FollowsRepo> = Arc::clone(&repos) as _;
        let sessions_repo: Arc<dyn SessionsRepo> = Arc::clone(&repos) as _;

        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://rivista@127.0.0.1:5432/rivista")
            .expect("lazy pool should build without connecting");

        let uploads_dir = tempfile::tempdir().expect("tempdir");
        let upload_storage =
            UploadStorage::new(uploads_dir.path().to_path_buf()).expect("storage");

        let state = HttpState {
            feed: Arc::new(FeedService::new(
                Arc::clone(&posts_repo),
                Arc::clone(&groups_repo),
                Arc::clone(&users_repo),
                Arc::clone(&comments_repo),
                Arc::clone(&follows_repo),
                Paginator::new(10),
            )),
            posts: Arc::new(PostService::new(
                posts_repo,
                writes_repo,
                Arc::clone(&groups_repo),
            )),
            comments: Arc::new(CommentService::new(
                comments_repo,
                Arc::clone(&repos) as _,
            )),
            follows: Arc::new(FollowService::new(follows_repo, Arc::clone(&users_repo))),
            auth: Arc::new(AuthService::new(users_repo, sessions_repo)),
            groups: groups_repo,
            db: Arc::new(PostgresRepositories::new(pool)),
            upload_storage: Arc::new(upload_storage),
            upload_body_limit,
            cache,
        };

        Self {
            repos,
            state,
            _uploads_dir: uploads_dir,
        }
    }

    fn signed_in_user(&self, username: &str, token: &str) {
        let user = self.repos.add_user(username);
        self.repos.add_session(user.id, token);
    }

    fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }
}

fn text_field_body(text: &str) -> Body {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n--{BOUNDARY}--\r\n"
    );
    Body::from(body)
}

fn post_new(session: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/new")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    builder.body(body).expect("request should build")
}

#[tokio::test]
async fn uploads_over_the_configured_limit_are_rejected() {
    let fx = Fixture::new(1024, None);
    fx.signed_in_user("leo", "token-1");

    let oversized = "x".repeat(4 * 1024);
    let response = fx
        .router()
        .oneshot(post_new(Some("token-1"), text_field_body(&oversized)))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(fx.repos.state.lock().unwrap().posts.is_empty());
}

#[tokio::test]
async fn uploads_within_the_limit_create_the_post() {
    let fx = Fixture::new(1024 * 1024, None);
    fx.signed_in_user("leo", "token-1");

    let response = fx
        .router()
        .oneshot(post_new(Some("token-1"), text_field_body("a short post")))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/")
    );
    let state = fx.repos.state.lock().unwrap();
    assert_eq!(state.posts.len(), 1);
    assert_eq!(state.posts[0].text, "a short post");
}

#[tokio::test]
async fn anonymous_posting_redirects_to_login() {
    let fx = Fixture::new(1024 * 1024, None);

    let response = fx
        .router()
        .oneshot(post_new(None, text_field_body("hello")))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some("/auth/login?next=/new")
    );
}

#[tokio::test]
async fn cache_clear_requires_a_session() {
    let cache = CacheState::new(PageCacheConfig {
        enabled: true,
        response_limit: 8,
        ttl_secs: 60,
    });
    cache.store.set(
        PageKey::new("/", ""),
        CachedPage::new(200, vec![], Bytes::from_static(b"cached feed")),
    );

    let fx = Fixture::new(1024 * 1024, Some(cache.clone()));
    fx.signed_in_user("leo", "token-1");

    let anonymous = Request::builder()
        .method(Method::POST)
        .uri("/_cache/clear")
        .body(Body::empty())
        .expect("request should build");
    let response = fx
        .router()
        .oneshot(anonymous)
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!cache.store.is_empty());

    let signed_in = Request::builder()
        .method(Method::POST)
        .uri("/_cache/clear")
        .header(header::COOKIE, format!("{SESSION_COOKIE}=token-1"))
        .body(Body::empty())
        .expect("request should build");
    let response = fx
        .router()
        .oneshot(signed_in)
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(cache.store.is_empty());
}
