use async_trait::async_trait;
use sqlx::query_as;

use crate::application::repos::{GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;

use super::{map_sqlx_error, PostgresRepositories};

#[async_trait]
impl GroupsRepo for PostgresRepositories {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        query_as::<_, GroupRecord>(
            "SELECT id, title, slug, description, created_at FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        query_as::<_, GroupRecord>(
            "SELECT id, title, slug, description, created_at FROM groups ORDER BY title ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
