//! Feed assembly: paginated, reverse-chronological post listings.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::pagination::{PageSlice, Paginator};
use crate::application::repos::{
    CommentWithAuthor, CommentsRepo, FeedPostRecord, FeedScope, FollowsRepo, GroupsRepo,
    PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};

/// Profile header numbers next to the author's feed.
#[derive(Debug, Clone, Copy)]
pub struct ProfileStats {
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    /// Whether the acting user already follows this author.
    pub viewer_follows: bool,
}

/// A post detail together with its comment thread.
#[derive(Debug, Clone)]
pub struct PostThread {
    pub post: FeedPostRecord,
    pub comments: Vec<CommentWithAuthor>,
    pub author_post_count: u64,
}

pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    comments: Arc<dyn CommentsRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        comments: Arc<dyn CommentsRepo>,
        follows: Arc<dyn FollowsRepo>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            comments,
            follows,
            paginator,
        }
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    async fn scoped_page(
        &self,
        scope: FeedScope,
        raw_page: Option<&str>,
    ) -> Result<PageSlice<FeedPostRecord>, RepoError> {
        let total = self.posts.count_posts(scope).await?;
        let page = self.paginator.resolve(raw_page, total);
        let items = self
            .posts
            .list_posts(scope, self.paginator.window(page))
            .await?;
        Ok(self.paginator.slice(items, page, total))
    }

    /// Global feed: every post, newest first.
    pub async fn global_page(
        &self,
        raw_page: Option<&str>,
    ) -> Result<PageSlice<FeedPostRecord>, RepoError> {
        self.scoped_page(FeedScope::All, raw_page).await
    }

    /// Per-group feed; `None` when the slug is unknown.
    pub async fn group_page(
        &self,
        slug: &str,
        raw_page: Option<&str>,
    ) -> Result<Option<(GroupRecord, PageSlice<FeedPostRecord>)>, RepoError> {
        let Some(group) = self.groups.find_by_slug(slug).await? else {
            return Ok(None);
        };
        let page = self.scoped_page(FeedScope::Group(group.id), raw_page).await?;
        Ok(Some((group, page)))
    }

    /// Author profile feed; `None` when the username is unknown.
    pub async fn profile_page(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        raw_page: Option<&str>,
    ) -> Result<Option<(UserRecord, ProfileStats, PageSlice<FeedPostRecord>)>, RepoError> {
        let Some(author) = self.users.find_by_username(username).await? else {
            return Ok(None);
        };
        let page = self
            .scoped_page(FeedScope::Author(author.id), raw_page)
            .await?;
        let stats = self.profile_stats(&author, viewer, page.total_items).await?;
        Ok(Some((author, stats, page)))
    }

    /// Feed of posts by the authors the user follows.
    pub async fn following_page(
        &self,
        user_id: Uuid,
        raw_page: Option<&str>,
    ) -> Result<PageSlice<FeedPostRecord>, RepoError> {
        self.scoped_page(FeedScope::FollowedBy(user_id), raw_page)
            .await
    }

    /// Post detail plus comments, addressed by author username and post id.
    ///
    /// The username in the URL must match the post author; a mismatch is
    /// treated as a missing resource.
    pub async fn post_thread(
        &self,
        username: &str,
        post_id: Uuid,
    ) -> Result<Option<PostThread>, RepoError> {
        let Some(post) = self.posts.find_detail(post_id).await? else {
            return Ok(None);
        };
        if post.author_username != username {
            return Ok(None);
        }
        let comments = self.comments.list_for_post(post.id).await?;
        let author_post_count = self
            .posts
            .count_posts(FeedScope::Author(post.author_id))
            .await?;
        Ok(Some(PostThread {
            post,
            comments,
            author_post_count,
        }))
    }

    async fn profile_stats(
        &self,
        author: &UserRecord,
        viewer: Option<Uuid>,
        post_count: u64,
    ) -> Result<ProfileStats, RepoError> {
        let follower_count = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;
        let viewer_follows = match viewer {
            Some(viewer_id) if viewer_id != author.id => {
                self.follows.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };
        Ok(ProfileStats {
            post_count,
            follower_count,
            following_count,
            viewer_follows,
        })
    }
}
