//! Comment submission on post detail pages.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::domain::entities::CommentRecord;

#[derive(Debug, Error)]
pub enum CommentActionError {
    /// Blank comments never reach the database.
    #[error("comment text is empty")]
    Empty,
    #[error("post not found")]
    PostMissing,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
    posts: Arc<dyn PostsRepo>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentsRepo>, posts: Arc<dyn PostsRepo>) -> Self {
        Self { comments, posts }
    }

    pub async fn add(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        text: &str,
    ) -> Result<CommentRecord, CommentActionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentActionError::Empty);
        }
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(CommentActionError::PostMissing);
        }
        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: text.to_owned(),
            })
            .await?;
        Ok(comment)
    }
}
