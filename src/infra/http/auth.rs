//! Signup, login and logout handlers.

use axum::{
    extract::{Extension, Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::application::auth::{AuthError, SESSION_COOKIE};
use crate::presentation::views::{
    render_template_response, LayoutContext, LoginContext, LoginTemplate, SignupContext,
    SignupTemplate,
};

use super::forms::{sanitize_next, LoginForm, SignupForm};
use super::middleware::CurrentUser;
use super::public::HttpState;
use super::repo_error_to_http;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    next: Option<String>,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

pub(super) async fn signup_form(user: Option<Extension<CurrentUser>>) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let view = LayoutContext::new("Sign up", None, SignupContext::default());
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(super) async fn signup(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    match state.auth.signup(&form.username, &form.password).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.token));
            (jar, Redirect::to("/")).into_response()
        }
        Err(AuthError::UsernameTaken) => signup_error_response("That username is already taken."),
        Err(AuthError::InvalidInput(message)) => signup_error_response(message),
        Err(AuthError::Repo(err)) => {
            repo_error_to_http("infra::http::auth::signup", err).into_response()
        }
        Err(err) => {
            let view = LayoutContext::new("Sign up", None, SignupContext::default());
            let mut response =
                render_template_response(SignupTemplate { view }, StatusCode::INTERNAL_SERVER_ERROR);
            crate::application::error::ErrorReport::from_error(
                "infra::http::auth::signup",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

fn signup_error_response(message: &str) -> Response {
    let content = SignupContext {
        error: Some(message.to_owned()),
    };
    let view = LayoutContext::new("Sign up", None, content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub(super) async fn login_form(
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    let content = LoginContext {
        error: None,
        next: sanitize_next(query.next.as_deref()).map(str::to_owned),
    };
    let view = LayoutContext::new("Log in", None, content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(super) async fn login(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = sanitize_next(form.next.as_deref()).unwrap_or("/").to_owned();
    match state.auth.login(&form.username, &form.password).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(session.token));
            (jar, Redirect::to(&next)).into_response()
        }
        Err(AuthError::BadCredentials) => {
            let content = LoginContext {
                error: Some("Incorrect username or password.".to_owned()),
                next: form.next,
            };
            let view = LayoutContext::new("Log in", None, content);
            render_template_response(LoginTemplate { view }, StatusCode::OK)
        }
        Err(AuthError::Repo(err)) => {
            repo_error_to_http("infra::http::auth::login", err).into_response()
        }
        Err(err) => {
            let view = LayoutContext::new("Log in", None, LoginContext::default());
            let mut response =
                render_template_response(LoginTemplate { view }, StatusCode::INTERNAL_SERVER_ERROR);
            crate::application::error::ErrorReport::from_error(
                "infra::http::auth::login",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    jar: CookieJar,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_owned();
        if let Err(err) = state.auth.logout(&token).await {
            tracing::warn!(
                target = "rivista::http::auth",
                error = %err,
                username = user
                    .as_deref()
                    .map(|user| user.username.as_str())
                    .unwrap_or(""),
                "failed to delete session on logout"
            );
        }
    }
    let jar = jar.remove(removal_cookie());
    (jar, Redirect::to("/")).into_response()
}
