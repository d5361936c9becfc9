use async_trait::async_trait;
use sqlx::{query, query_scalar};
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError};

use super::{map_sqlx_error, PostgresRepositories};

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        // ON CONFLICT makes concurrent duplicate follows a no-op instead
        // of a unique violation.
        let result = query(
            "INSERT INTO follows (id, user_id, author_id) VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT follows_user_author_key DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(author_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }
}
