//! Post authoring: create and edit with author-only access.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

/// Raw form input for the post create/edit forms.
#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub text: String,
    /// Group slug as submitted; empty selects no group.
    pub group_slug: Option<String>,
    /// Stored media path for an uploaded image, if any.
    pub image_path: Option<String>,
}

/// Per-field messages re-rendered next to the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFieldErrors {
    pub text: Option<&'static str>,
    pub group: Option<&'static str>,
}

impl PostFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none()
    }
}

#[derive(Debug, Error)]
pub enum PostActionError {
    #[error("post form validation failed")]
    Invalid(PostFieldErrors),
    /// The acting user is not the author. Callers redirect without
    /// surfacing an error to the client.
    #[error("acting user is not the post author")]
    NotAuthor,
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writes: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writes: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            posts,
            writes,
            groups,
        }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostActionError> {
        let (text, group_id) = self.validate(&input).await?;
        let post = self
            .writes
            .create_post(CreatePostParams {
                text,
                author_id,
                group_id,
                image_path: input.image_path,
            })
            .await?;
        Ok(post)
    }

    /// Edit an existing post. Only the author may change it; anyone else
    /// gets `NotAuthor` and the post stays untouched.
    pub async fn edit(
        &self,
        acting_user: Uuid,
        post_id: Uuid,
        input: PostInput,
    ) -> Result<PostRecord, PostActionError> {
        let Some(existing) = self.posts.find_by_id(post_id).await? else {
            return Err(PostActionError::NotFound);
        };
        if existing.author_id != acting_user {
            return Err(PostActionError::NotAuthor);
        }
        let (text, group_id) = self.validate(&input).await?;
        // A form submitted without a new upload keeps the stored image.
        let image_path = input.image_path.or(existing.image_path);
        let post = self
            .writes
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                group_id,
                image_path,
            })
            .await?;
        Ok(post)
    }

    /// The post a form is editing, with authorship already checked.
    pub async fn editable_post(
        &self,
        acting_user: Uuid,
        post_id: Uuid,
    ) -> Result<PostRecord, PostActionError> {
        let Some(existing) = self.posts.find_by_id(post_id).await? else {
            return Err(PostActionError::NotFound);
        };
        if existing.author_id != acting_user {
            return Err(PostActionError::NotAuthor);
        }
        Ok(existing)
    }

    async fn validate(&self, input: &PostInput) -> Result<(String, Option<Uuid>), PostActionError> {
        let mut errors = PostFieldErrors::default();

        let text = input.text.trim().to_owned();
        if text.is_empty() {
            errors.text = Some("This field is required.");
        }

        let slug = input
            .group_slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty());
        let group_id = match slug {
            Some(slug) => match self.groups.find_by_slug(slug).await? {
                Some(group) => Some(group.id),
                None => {
                    errors.group = Some("Select a valid choice.");
                    None
                }
            },
            None => None,
        };

        if errors.is_empty() {
            Ok((text, group_id))
        } else {
            Err(PostActionError::Invalid(errors))
        }
    }
}
