use async_trait::async_trait;
use sqlx::{query, query_as};
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo};
use crate::domain::entities::UserRecord;

use super::{map_sqlx_error, PostgresRepositories};

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn insert_session(&self, token: &str, user_id: Uuid) -> Result<(), RepoError> {
        query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<UserRecord>, RepoError> {
        query_as::<_, UserRecord>(
            "SELECT u.id, u.username, u.password_hash, u.created_at \
             FROM sessions s \
             INNER JOIN users u ON u.id = s.user_id \
             WHERE s.token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn delete_session(&self, token: &str) -> Result<(), RepoError> {
        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
