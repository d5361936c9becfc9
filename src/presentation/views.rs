use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{PostThread, ProfileStats};
use crate::application::pagination::PageSlice;
use crate::application::posts::PostFieldErrors;
use crate::application::repos::{CommentWithAuthor, FeedPostRecord};
use crate::domain::entities::GroupRecord;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<ViewerView>) -> Response {
    let view = LayoutContext::new("Page not found", viewer, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

pub fn render_server_error_response(viewer: Option<ViewerView>) -> Response {
    let view = LayoutContext::new("Server error", viewer, ErrorPageView::server_error());
    render_template_response(ErrorTemplate { view }, StatusCode::INTERNAL_SERVER_ERROR)
}

/// The signed-in user shown in the page chrome.
#[derive(Debug, Clone)]
pub struct ViewerView {
    pub username: String,
}

pub struct LayoutContext<T> {
    pub title: String,
    pub viewer: Option<ViewerView>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: impl Into<String>, viewer: Option<ViewerView>, content: T) -> Self {
        Self {
            title: title.into(),
            viewer,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCardView {
    pub id: Uuid,
    pub author_username: String,
    pub author_href: String,
    pub detail_href: String,
    pub group: Option<GroupLinkView>,
    pub text: String,
    pub image_href: Option<String>,
    pub published: String,
    pub comment_count: i64,
}

impl PostCardView {
    pub fn from_record(record: &FeedPostRecord) -> Self {
        let group = match (&record.group_slug, &record.group_title) {
            (Some(slug), Some(title)) => Some(GroupLinkView {
                title: title.clone(),
                href: format!("/group/{slug}"),
            }),
            _ => None,
        };
        Self {
            id: record.id,
            author_username: record.author_username.clone(),
            author_href: format!("/{}", record.author_username),
            detail_href: format!("/{}/{}", record.author_username, record.id),
            group,
            text: record.text.clone(),
            image_href: record
                .image_path
                .as_ref()
                .map(|path| format!("/media/{path}")),
            published: record
                .created_at
                .format(&DATE_FORMAT)
                .unwrap_or_default(),
            comment_count: record.comment_count,
        }
    }
}

/// Page selector rendered under a feed.
#[derive(Clone)]
pub struct PaginationView {
    pub number: u32,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_href: String,
    pub next_href: String,
}

impl PaginationView {
    pub fn from_slice<T>(slice: &PageSlice<T>) -> Self {
        Self {
            number: slice.number,
            total_pages: slice.total_pages,
            has_previous: slice.has_previous(),
            has_next: slice.has_next(),
            previous_href: format!("?page={}", slice.number.saturating_sub(1).max(1)),
            next_href: format!("?page={}", slice.number + 1),
        }
    }
}

pub struct FeedContext {
    pub heading: String,
    pub description: String,
    pub posts: Vec<PostCardView>,
    pub pagination: PaginationView,
    pub has_results: bool,
}

impl FeedContext {
    pub fn new(
        heading: impl Into<String>,
        description: impl Into<String>,
        page: &PageSlice<FeedPostRecord>,
    ) -> Self {
        let posts: Vec<PostCardView> = page.items.iter().map(PostCardView::from_record).collect();
        Self {
            heading: heading.into(),
            description: description.into(),
            has_results: !posts.is_empty(),
            posts,
            pagination: PaginationView::from_slice(page),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedContext>,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<FeedContext>,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedContext>,
}

/// Profile header above the author feed.
pub struct ProfileContext {
    pub username: String,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub viewer_follows: bool,
    pub is_own_profile: bool,
    pub can_follow: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub feed: FeedContext,
}

impl ProfileContext {
    pub fn new(
        username: &str,
        stats: &ProfileStats,
        viewer: Option<&str>,
        page: &PageSlice<FeedPostRecord>,
    ) -> Self {
        let is_own_profile = viewer == Some(username);
        Self {
            username: username.to_owned(),
            post_count: stats.post_count,
            follower_count: stats.follower_count,
            following_count: stats.following_count,
            viewer_follows: stats.viewer_follows,
            is_own_profile,
            can_follow: viewer.is_some() && !is_own_profile,
            follow_href: format!("/{username}/follow"),
            unfollow_href: format!("/{username}/unfollow"),
            feed: FeedContext::new(
                format!("Posts by {username}"),
                String::new(),
                page,
            ),
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
}

impl CommentView {
    fn from_record(record: &CommentWithAuthor) -> Self {
        Self {
            author_username: record.author_username.clone(),
            author_href: format!("/{}", record.author_username),
            text: record.text.clone(),
            published: record
                .created_at
                .format(&DATE_FORMAT)
                .unwrap_or_default(),
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCardView,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub comment_href: String,
    pub edit_href: String,
    pub viewer_is_author: bool,
    pub viewer_signed_in: bool,
}

impl PostDetailContext {
    pub fn new(thread: &PostThread, viewer: Option<&str>) -> Self {
        let post = PostCardView::from_record(&thread.post);
        let viewer_is_author = viewer == Some(thread.post.author_username.as_str());
        Self {
            comment_href: format!(
                "/{}/{}/comment",
                thread.post.author_username, thread.post.id
            ),
            edit_href: format!("/{}/{}/edit", thread.post.author_username, thread.post.id),
            post,
            author_post_count: thread.author_post_count,
            comments: thread.comments.iter().map(CommentView::from_record).collect(),
            viewer_is_author,
            viewer_signed_in: viewer.is_some(),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone)]
pub struct GroupChoiceView {
    pub slug: String,
    pub title: String,
    pub selected: bool,
}

/// Create/edit form with re-rendered values and field errors.
pub struct PostFormContext {
    pub heading: String,
    pub submit_label: String,
    pub action_href: String,
    pub text: String,
    pub groups: Vec<GroupChoiceView>,
    pub text_error: Option<String>,
    pub group_error: Option<String>,
    pub has_image: bool,
}

impl PostFormContext {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self {
            heading: "New post".to_string(),
            submit_label: "Publish".to_string(),
            action_href: "/new".to_string(),
            text: String::new(),
            groups: group_choices(groups, None),
            text_error: None,
            group_error: None,
            has_image: false,
        }
    }

    pub fn edit(
        action_href: String,
        text: String,
        groups: &[GroupRecord],
        selected: Option<Uuid>,
        has_image: bool,
    ) -> Self {
        Self {
            heading: "Edit post".to_string(),
            submit_label: "Save".to_string(),
            action_href,
            text,
            groups: group_choices(groups, selected),
            text_error: None,
            group_error: None,
            has_image,
        }
    }

    pub fn with_errors(mut self, errors: &PostFieldErrors) -> Self {
        self.text_error = errors.text.map(str::to_owned);
        self.group_error = errors.group.map(str::to_owned);
        self
    }

    pub fn with_input(mut self, text: String, group_slug: Option<&str>) -> Self {
        self.text = text;
        for choice in &mut self.groups {
            choice.selected = Some(choice.slug.as_str()) == group_slug;
        }
        self
    }
}

fn group_choices(groups: &[GroupRecord], selected: Option<Uuid>) -> Vec<GroupChoiceView> {
    groups
        .iter()
        .map(|group| GroupChoiceView {
            slug: group.slug.clone(),
            title: group.title.clone(),
            selected: selected == Some(group.id),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

#[derive(Default)]
pub struct LoginContext {
    pub error: Option<String>,
    pub next: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

#[derive(Default)]
pub struct SignupContext {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

pub struct StaticPageContext;

#[derive(Template)]
#[template(path = "about_author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<StaticPageContext>,
}

#[derive(Template)]
#[template(path = "about_tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<StaticPageContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist. Try returning to the home feed."
                .to_string(),
        }
    }

    pub fn server_error() -> Self {
        Self {
            title: "Something went wrong".to_string(),
            message: "An internal error occurred. Please try again later.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
