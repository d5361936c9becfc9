//! Post create and edit handlers.

use axum::{
    extract::{multipart::Multipart, Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::application::error::HttpError;
use crate::application::posts::{PostActionError, PostInput};
use crate::infra::uploads::UploadStorageError;
use crate::presentation::views::{
    render_not_found_response, render_template_response, LayoutContext, PostFormContext,
    PostFormTemplate,
};

use super::middleware::CurrentUser;
use super::public::{login_redirect, parse_post_id, repo_error_page, viewer_view, HttpState};
use super::{forms, repo_error_to_http};

pub(super) async fn new_post_form(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(user)) = user else {
        return login_redirect("/new");
    };
    let viewer = viewer_view(Some(&user));
    let groups = match state.groups.list_all().await {
        Ok(groups) => groups,
        Err(err) => return repo_error_page("infra::http::posts::new_post_form", err, viewer),
    };
    let view = LayoutContext::new("New post", viewer, PostFormContext::create(&groups));
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    multipart: Multipart,
) -> Response {
    let Some(Extension(user)) = user else {
        return login_redirect("/new");
    };
    let viewer = viewer_view(Some(&user));

    let form = match forms::read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let image_path = match store_image(&state, &form).await {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    let input = PostInput {
        text: form.text.clone(),
        group_slug: form.group_slug.clone(),
        image_path,
    };
    match state.posts.create(user.id, input).await {
        Ok(_) => {
            metrics::counter!("rivista_posts_created_total").increment(1);
            Redirect::to("/").into_response()
        }
        Err(PostActionError::Invalid(errors)) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_page("infra::http::posts::create_post", err, viewer),
            };
            let content = PostFormContext::create(&groups)
                .with_input(form.text, form.group_slug.as_deref())
                .with_errors(&errors);
            let view = LayoutContext::new("New post", viewer, content);
            render_template_response(PostFormTemplate { view }, StatusCode::OK)
        }
        Err(PostActionError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::create_post", err).into_response()
        }
        Err(PostActionError::NotFound) | Err(PostActionError::NotAuthor) => {
            render_not_found_response(viewer)
        }
    }
}

pub(super) async fn edit_post_form(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let detail_href = format!("/{username}/{post_id}");
    let Some(Extension(user)) = user else {
        return login_redirect(&format!("{detail_href}/edit"));
    };
    let viewer = viewer_view(Some(&user));
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(viewer);
    };

    match state.posts.editable_post(user.id, post_id).await {
        Ok(post) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => {
                    return repo_error_page("infra::http::posts::edit_post_form", err, viewer)
                }
            };
            let content = PostFormContext::edit(
                format!("{detail_href}/edit"),
                post.text,
                &groups,
                post.group_id,
                post.image_path.is_some(),
            );
            let view = LayoutContext::new("Edit post", viewer, content);
            render_template_response(PostFormTemplate { view }, StatusCode::OK)
        }
        // Non-authors are bounced to the detail page without an error.
        Err(PostActionError::NotAuthor) => Redirect::to(&detail_href).into_response(),
        Err(PostActionError::NotFound) => render_not_found_response(viewer),
        Err(PostActionError::Invalid(_)) => render_not_found_response(viewer),
        Err(PostActionError::Repo(err)) => {
            repo_error_page("infra::http::posts::edit_post_form", err, viewer)
        }
    }
}

pub(super) async fn update_post(
    State(state): State<HttpState>,
    user: Option<Extension<CurrentUser>>,
    Path((username, post_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Response {
    let detail_href = format!("/{username}/{post_id}");
    let Some(Extension(user)) = user else {
        return login_redirect(&format!("{detail_href}/edit"));
    };
    let viewer = viewer_view(Some(&user));
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(viewer);
    };

    let form = match forms::read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let image_path = match store_image(&state, &form).await {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    let input = PostInput {
        text: form.text.clone(),
        group_slug: form.group_slug.clone(),
        image_path,
    };
    match state.posts.edit(user.id, post_id, input).await {
        Ok(_) => Redirect::to(&detail_href).into_response(),
        Err(PostActionError::NotAuthor) => Redirect::to(&detail_href).into_response(),
        Err(PostActionError::NotFound) => render_not_found_response(viewer),
        Err(PostActionError::Invalid(errors)) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_page("infra::http::posts::update_post", err, viewer),
            };
            let content = PostFormContext::edit(
                format!("{detail_href}/edit"),
                String::new(),
                &groups,
                None,
                false,
            )
            .with_input(form.text, form.group_slug.as_deref())
            .with_errors(&errors);
            let view = LayoutContext::new("Edit post", viewer, content);
            render_template_response(PostFormTemplate { view }, StatusCode::OK)
        }
        Err(PostActionError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::update_post", err).into_response()
        }
    }
}

async fn store_image(
    state: &HttpState,
    form: &forms::PostFormData,
) -> Result<Option<String>, HttpError> {
    const SOURCE: &str = "infra::http::posts::store_image";

    let Some(image) = form.image.as_ref() else {
        return Ok(None);
    };
    match state
        .upload_storage
        .store(&image.file_name, image.data.clone())
        .await
    {
        Ok(stored) => Ok(Some(stored.stored_path)),
        Err(UploadStorageError::EmptyPayload) => Ok(None),
        Err(err) => Err(HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store uploaded image",
            &err,
        )),
    }
}
