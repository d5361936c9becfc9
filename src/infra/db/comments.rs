use async_trait::async_trait;
use sqlx::query_as;
use uuid::Uuid;

use crate::application::repos::{
    CommentWithAuthor, CommentsRepo, CreateCommentParams, RepoError,
};
use crate::domain::entities::CommentRecord;

use super::{map_sqlx_error, PostgresRepositories};

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        query_as::<_, CommentWithAuthor>(
            "SELECT c.id, u.username AS author_username, c.text, c.created_at \
             FROM comments c \
             INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        query_as::<_, CommentRecord>(
            "INSERT INTO comments (id, post_id, author_id, text) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, post_id, author_id, text, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.text)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
