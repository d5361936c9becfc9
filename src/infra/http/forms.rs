//! Form payloads submitted by the HTML surfaces.

use axum::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use serde::Deserialize;

use crate::application::error::HttpError;

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            next: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

/// Parsed multipart post form: text, optional group, optional image upload.
#[derive(Debug, Default)]
pub struct PostFormData {
    pub text: String,
    pub group_slug: Option<String>,
    pub image: Option<UploadedImage>,
}

#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Bytes,
}

// Keeps the multipart error's own status: an over-limit body stays a 413
// rather than collapsing into a 400.
fn multipart_error(err: MultipartError) -> HttpError {
    HttpError::from_error(
        "infra::http::forms::read_post_form",
        err.status(),
        "Could not read form data",
        &err,
    )
}

pub async fn read_post_form(mut multipart: Multipart) -> Result<PostFormData, HttpError> {
    let mut form = PostFormData::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("text") => {
                form.text = field.text().await.map_err(multipart_error)?;
            }
            Some("group") => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim().to_owned();
                form.group_slug = (!value.is_empty()).then_some(value);
            }
            Some("image") => {
                let file_name = field.file_name().map(str::to_owned);
                let data = field.bytes().await.map_err(multipart_error)?;
                // A file input submitted without a selection arrives as an
                // empty part.
                if let Some(file_name) = file_name {
                    if !data.is_empty() {
                        form.image = Some(UploadedImage { file_name, data });
                    }
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Restrict post-login redirects to site-local paths.
pub fn sanitize_next(raw: Option<&str>) -> Option<&str> {
    raw.filter(|next| next.starts_with('/') && !next.starts_with("//"))
}
