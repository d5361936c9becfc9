//! Comment and follow handlers.

use axum::{
    extract::{Extension, Form, Path, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::application::comments::CommentActionError;
use crate::application::follows::{FollowError, FollowOutcome};
use crate::presentation::views::render_not_found_response;

use super::forms::CommentForm;
use super::middleware::CurrentUser;
use super::public::{login_redirect, parse_post_id, viewer_view, HttpState};
use super::repo_error_to_http;

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let detail_href = format!("/{username}/{post_id}");
    let Some(Extension(user)) = user else {
        return login_redirect(&detail_href);
    };
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(viewer_view(Some(&user)));
    };

    match state.comments.add(user.id, post_id, &form.text).await {
        Ok(_) => {
            metrics::counter!("rivista_comments_created_total").increment(1);
            Redirect::to(&detail_href).into_response()
        }
        // A blank submission stores nothing and lands back on the thread.
        Err(CommentActionError::Empty) => Redirect::to(&detail_href).into_response(),
        Err(CommentActionError::PostMissing) => {
            render_not_found_response(viewer_view(Some(&user)))
        }
        Err(CommentActionError::Repo(err)) => {
            repo_error_to_http("infra::http::engage::add_comment", err).into_response()
        }
    }
}

pub(super) async fn follow_author(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path(username): Path<String>,
) -> Response {
    let profile_href = format!("/{username}");
    let Some(Extension(user)) = user else {
        return login_redirect(&profile_href);
    };

    match state.follows.follow(user.id, &username).await {
        Ok(outcome) => {
            if outcome == FollowOutcome::Created {
                metrics::counter!("rivista_follows_created_total").increment(1);
            }
            Redirect::to(&profile_href).into_response()
        }
        Err(FollowError::UnknownAuthor { .. }) => {
            render_not_found_response(viewer_view(Some(&user)))
        }
        Err(FollowError::Repo(err)) => {
            repo_error_to_http("infra::http::engage::follow_author", err).into_response()
        }
    }
}

pub(super) async fn unfollow_author(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path(username): Path<String>,
) -> Response {
    let profile_href = format!("/{username}");
    let Some(Extension(user)) = user else {
        return login_redirect(&profile_href);
    };

    match state.follows.unfollow(user.id, &username).await {
        Ok(_) => Redirect::to(&profile_href).into_response(),
        Err(FollowError::UnknownAuthor { .. }) => {
            render_not_found_response(viewer_view(Some(&user)))
        }
        Err(FollowError::Repo(err)) => {
            repo_error_to_http("infra::http::engage::unfollow_author", err).into_response()
        }
    }
}
