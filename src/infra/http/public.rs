use std::{io::ErrorKind, sync::Arc};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Extension, Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderValue, Request, StatusCode,
    },
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{
        auth::AuthService,
        comments::CommentService,
        error::{ErrorReport, HttpError},
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{GroupsRepo, RepoError},
    },
    cache::{response_cache_layer, CacheState},
    infra::{
        db::PostgresRepositories,
        uploads::{UploadStorage, UploadStorageError},
    },
    presentation::views::{
        render_not_found_response, render_server_error_response, render_template_response,
        AboutAuthorTemplate, AboutTechTemplate, FeedContext, FollowTemplate, GroupTemplate,
        IndexTemplate, LayoutContext, PostDetailContext, PostDetailTemplate, ProfileContext,
        ProfileTemplate, StaticPageContext, ViewerView,
    },
};

use super::{
    auth, db_health_response, engage,
    middleware::{load_current_user, log_responses, set_request_context, CurrentUser},
    posts,
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub auth: Arc<AuthService>,
    pub groups: Arc<dyn GroupsRepo>,
    pub db: Arc<PostgresRepositories>,
    pub upload_storage: Arc<UploadStorage>,
    pub upload_body_limit: usize,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState) -> Router {
    // The home feed is the only page behind the response cache.
    let cached_routes = Router::new().route("/", get(index));
    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    // Multipart routes take the configured upload limit instead of the
    // axum default.
    let upload_routes = Router::new()
        .route("/new", get(posts::new_post_form).post(posts::create_post))
        .route(
            "/{username}/{post_id}/edit",
            get(posts::edit_post_form).post(posts::update_post),
        )
        .layer(DefaultBodyLimit::max(state.upload_body_limit));

    // Static segments are matched before the `{username}` capture.
    let routes = Router::new()
        .route("/group/{slug}", get(group_index))
        .route("/follow", get(follow_index))
        .route("/about/author", get(about_author))
        .route("/about/tech", get(about_tech))
        .route("/auth/signup", get(auth::signup_form).post(auth::signup))
        .route("/auth/login", get(auth::login_form).post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health))
        .route("/_cache/clear", post(clear_cache))
        .route("/{username}", get(profile))
        .route("/{username}/follow", post(engage::follow_author))
        .route("/{username}/unfollow", post(engage::unfollow_author))
        .route("/{username}/{post_id}", get(post_detail))
        .route("/{username}/{post_id}/comment", post(engage::add_comment))
        .fallback(fallback);

    cached_routes
        .merge(upload_routes)
        .merge(routes)
        .with_state(state.clone())
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(state, load_current_user))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

pub(super) fn viewer_view(user: Option<&CurrentUser>) -> Option<ViewerView> {
    user.map(|user| ViewerView {
        username: user.username.clone(),
    })
}

pub(super) fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("/auth/login?next={next}")).into_response()
}

pub(super) fn repo_error_page(
    source: &'static str,
    err: RepoError,
    viewer: Option<ViewerView>,
) -> Response {
    let mut response = render_server_error_response(viewer);
    ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, &err).attach(&mut response);
    response
}

pub(super) fn parse_post_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

async fn index(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = viewer_view(user.as_deref());
    match state.feed.global_page(query.page.as_deref()).await {
        Ok(page) => {
            let content = FeedContext::new(
                "Latest updates",
                "Recent posts from every author.",
                &page,
            );
            let view = LayoutContext::new("Rivista", viewer, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => repo_error_page("infra::http::public::index", err, viewer),
    }
}

async fn group_index(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = viewer_view(user.as_deref());
    match state.feed.group_page(&slug, query.page.as_deref()).await {
        Ok(Some((group, page))) => {
            let content = FeedContext::new(group.title.clone(), group.description.clone(), &page);
            let view = LayoutContext::new(group.title, viewer, content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(viewer),
        Err(err) => repo_error_page("infra::http::public::group_index", err, viewer),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<PageQuery>,
) -> Response {
    let Some(Extension(user)) = user else {
        return login_redirect("/follow");
    };
    let viewer = viewer_view(Some(&user));
    match state
        .feed
        .following_page(user.id, query.page.as_deref())
        .await
    {
        Ok(page) => {
            let content = FeedContext::new(
                "Your subscriptions",
                "Posts by the authors you follow.",
                &page,
            );
            let view = LayoutContext::new("Subscriptions", viewer, content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => repo_error_page("infra::http::public::follow_index", err, viewer),
    }
}

async fn profile(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = viewer_view(user.as_deref());
    let viewer_id = user.as_deref().map(|user| user.id);
    match state
        .feed
        .profile_page(&username, viewer_id, query.page.as_deref())
        .await
    {
        Ok(Some((author, stats, page))) => {
            let content = ProfileContext::new(
                &author.username,
                &stats,
                viewer.as_ref().map(|v| v.username.as_str()),
                &page,
            );
            let view = LayoutContext::new(author.username.clone(), viewer, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(viewer),
        Err(err) => repo_error_page("infra::http::public::profile", err, viewer),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let viewer = viewer_view(user.as_deref());
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(viewer);
    };
    match state.feed.post_thread(&username, post_id).await {
        Ok(Some(thread)) => {
            let content = PostDetailContext::new(
                &thread,
                viewer.as_ref().map(|v| v.username.as_str()),
            );
            let title = format!("Post by {username}");
            let view = LayoutContext::new(title, viewer, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(viewer),
        Err(err) => repo_error_page("infra::http::public::post_detail", err, viewer),
    }
}

async fn about_author(user: Option<Extension<CurrentUser>>) -> Response {
    let view = LayoutContext::new(
        "About the author",
        viewer_view(user.as_deref()),
        StaticPageContext,
    );
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

async fn about_tech(user: Option<Extension<CurrentUser>>) -> Response {
    let view = LayoutContext::new(
        "Technology",
        viewer_view(user.as_deref()),
        StaticPageContext,
    );
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Image not found",
            "The requested image is not available",
        )
        .into_response(),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Image not found",
            "The requested image is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read image",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));
    response
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

/// Drop every cached page immediately, ahead of the TTL.
///
/// Only signed-in users may clear; anonymous callers get the 404 page as
/// if the route did not exist.
async fn clear_cache(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    if user.is_none() {
        return render_not_found_response(None);
    }
    if let Some(cache) = state.cache.as_ref() {
        cache.store.clear();
        metrics::counter!("rivista_page_cache_clears_total").increment(1);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn fallback(user: Option<Extension<CurrentUser>>, _request: Request<Body>) -> Response {
    render_not_found_response(viewer_view(user.as_deref()))
}
