//! Post listing and authoring queries.

use async_trait::async_trait;
use sqlx::{query_as, QueryBuilder};
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    CreatePostParams, FeedPostRecord, FeedScope, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{map_sqlx_error, PostgresRepositories};

const FEED_SELECT: &str = "SELECT p.id, p.text, p.author_id, u.username AS author_username, \
    g.slug AS group_slug, g.title AS group_title, p.image_path, p.created_at, \
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
    FROM posts p \
    INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN groups g ON g.id = p.group_id \
    WHERE TRUE";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: FeedScope,
        page: PageRequest,
    ) -> Result<Vec<FeedPostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(FEED_SELECT);
        Self::apply_scope_conditions(&mut qb, scope);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

        qb.build_query_as::<FeedPostRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_posts(&self, scope: FeedScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE TRUE");
        Self::apply_scope_conditions(&mut qb, scope);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        query_as::<_, PostRecord>(
            "SELECT id, text, author_id, group_id, image_path, created_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<FeedPostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(FEED_SELECT);
        qb.push(" AND p.id = ");
        qb.push_bind(id);

        qb.build_query_as::<FeedPostRecord>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        query_as::<_, PostRecord>(
            "INSERT INTO posts (id, text, author_id, group_id, image_path) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, text, author_id, group_id, image_path, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&params.text)
        .bind(params.author_id)
        .bind(params.group_id)
        .bind(&params.image_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        query_as::<_, PostRecord>(
            "UPDATE posts SET text = $2, group_id = $3, image_path = $4 \
             WHERE id = $1 \
             RETURNING id, text, author_id, group_id, image_path, created_at",
        )
        .bind(params.id)
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image_path)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
