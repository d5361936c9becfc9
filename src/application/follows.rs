//! Follow edges between readers and authors.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};

/// What a follow or unfollow request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    Removed,
    /// The edge was already in the requested state, or the user targeted
    /// themselves. Nothing changed.
    Unchanged,
}

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{username}`")]
    UnknownAuthor { username: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Follow the author named in the URL. Self-follows are ignored.
    pub async fn follow(
        &self,
        user_id: Uuid,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.resolve_author(author_username).await?;
        if author == user_id {
            return Ok(FollowOutcome::Unchanged);
        }
        let created = self.follows.follow(user_id, author).await?;
        Ok(if created {
            FollowOutcome::Created
        } else {
            FollowOutcome::Unchanged
        })
    }

    /// Remove the edge if present. Repeated unfollows are no-ops.
    pub async fn unfollow(
        &self,
        user_id: Uuid,
        author_username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.resolve_author(author_username).await?;
        if author == user_id {
            return Ok(FollowOutcome::Unchanged);
        }
        let was_following = self.follows.is_following(user_id, author).await?;
        self.follows.unfollow(user_id, author).await?;
        Ok(if was_following {
            FollowOutcome::Removed
        } else {
            FollowOutcome::Unchanged
        })
    }

    async fn resolve_author(&self, username: &str) -> Result<Uuid, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| FollowError::UnknownAuthor {
                username: username.to_owned(),
            })
    }
}
