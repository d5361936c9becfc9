//! In-memory repository fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use rivista::application::pagination::PageRequest;
use rivista::application::repos::{
    CommentWithAuthor, CommentsRepo, CreateCommentParams, CreatePostParams, CreateUserParams,
    FeedPostRecord, FeedScope, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, RepoError,
    SessionsRepo, UpdatePostParams, UsersRepo,
};
use rivista::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Default)]
pub struct State {
    pub users: Vec<UserRecord>,
    pub groups: Vec<GroupRecord>,
    pub posts: Vec<PostRecord>,
    pub comments: Vec<CommentRecord>,
    pub follows: Vec<(Uuid, Uuid)>,
    pub sessions: Vec<(String, Uuid)>,
    ticks: i64,
}

impl State {
    fn next_instant(&mut self) -> OffsetDateTime {
        self.ticks += 1;
        OffsetDateTime::UNIX_EPOCH + Duration::seconds(self.ticks)
    }
}

#[derive(Default)]
pub struct InMemoryRepos {
    pub state: Mutex<State>,
}

impl InMemoryRepos {
    pub fn add_user(&self, username: &str) -> UserRecord {
        let mut state = self.state.lock().unwrap();
        let created_at = state.next_instant();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: String::new(),
            created_at,
        };
        state.users.push(user.clone());
        user
    }

    pub fn add_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut state = self.state.lock().unwrap();
        let created_at = state.next_instant();
        let group = GroupRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            created_at,
        };
        state.groups.push(group.clone());
        group
    }

    pub fn add_session(&self, user_id: Uuid, token: &str) {
        let mut state = self.state.lock().unwrap();
        state.sessions.push((token.to_string(), user_id));
    }

    fn scope_matches(state: &State, scope: FeedScope, post: &PostRecord) -> bool {
        match scope {
            FeedScope::All => true,
            FeedScope::Group(group_id) => post.group_id == Some(group_id),
            FeedScope::Author(author_id) => post.author_id == author_id,
            FeedScope::FollowedBy(user_id) => state
                .follows
                .iter()
                .any(|(follower, author)| *follower == user_id && *author == post.author_id),
        }
    }

    fn feed_record(state: &State, post: &PostRecord) -> FeedPostRecord {
        let author = state
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .expect("post author should exist");
        let group = post
            .group_id
            .and_then(|id| state.groups.iter().find(|group| group.id == id));
        FeedPostRecord {
            id: post.id,
            text: post.text.clone(),
            author_id: post.author_id,
            author_username: author.username.clone(),
            group_slug: group.map(|group| group.slug.clone()),
            group_title: group.map(|group| group.title.clone()),
            image_path: post.image_path.clone(),
            created_at: post.created_at,
            comment_count: state
                .comments
                .iter()
                .filter(|comment| comment.post_id == post.id)
                .count() as i64,
        }
    }

    fn sorted_scope_posts(state: &State, scope: FeedScope) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = state
            .posts
            .iter()
            .filter(|post| Self::scope_matches(state, scope, post))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

#[async_trait]
impl PostsRepo for InMemoryRepos {
    async fn list_posts(
        &self,
        scope: FeedScope,
        page: PageRequest,
    ) -> Result<Vec<FeedPostRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(Self::sorted_scope_posts(&state, scope)
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|post| Self::feed_record(&state, &post))
            .collect())
    }

    async fn count_posts(&self, scope: FeedScope) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(Self::sorted_scope_posts(&state, scope).len() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn find_detail(&self, id: Uuid) -> Result<Option<FeedPostRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| Self::feed_record(&state, post)))
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let created_at = state.next_instant();
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: params.text,
            author_id: params.author_id,
            group_id: params.group_id,
            image_path: params.image_path,
            created_at,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image_path = params.image_path;
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for InMemoryRepos {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let state = self.state.lock().unwrap();
        let mut comments: Vec<&CommentRecord> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments
            .into_iter()
            .map(|comment| CommentWithAuthor {
                id: comment.id,
                author_username: state
                    .users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .map(|user| user.username.clone())
                    .unwrap_or_default(),
                text: comment.text.clone(),
                created_at: comment.created_at,
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let created_at = state.next_instant();
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl GroupsRepo for InMemoryRepos {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.groups.clone())
    }
}

#[async_trait]
impl UsersRepo for InMemoryRepos {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|user| user.id == id).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let created_at = state.next_instant();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            password_hash: params.password_hash,
            created_at,
        };
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl FollowsRepo for InMemoryRepos {
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.follows.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        state.follows.push((user_id, author_id));
        Ok(true)
    }

    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.follows.retain(|edge| *edge != (user_id, author_id));
        Ok(())
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state.follows.contains(&(user_id, author_id)))
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .follows
            .iter()
            .filter(|(_, author)| *author == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl SessionsRepo for InMemoryRepos {
    async fn insert_session(&self, token: &str, user_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.sessions.push((token.to_string(), user_id));
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<UserRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        let user_id = state
            .sessions
            .iter()
            .find(|(stored, _)| stored == token)
            .map(|(_, user_id)| *user_id);
        Ok(user_id.and_then(|id| state.users.iter().find(|user| user.id == id).cloned()))
    }

    async fn delete_session(&self, token: &str) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.sessions.retain(|(stored, _)| stored != token);
        Ok(())
    }
}
