/// Storage layer
///
/// `BlogRepository` is the seam between services and storage. `PgBlogRepository`
/// backs production; `InMemoryBlogRepository` backs tests and local demos.
mod memory;
mod postgres;

pub use memory::InMemoryBlogRepository;
pub use postgres::PgBlogRepository;

use crate::error::Result;
use crate::models::{Comment, CommentView, Group, Post, PostView, User};

/// Embedded migrations, applied by `main` on startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i64,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Full replacement of the editable post columns.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(i64),
    /// Posts by every author the given user follows
    FollowedBy(i64),
}

/// Repository over users, groups, posts, comments and follows.
///
/// Listings are ordered newest first (`pub_date DESC, id DESC`).
#[async_trait::async_trait]
pub trait BlogRepository: Send + Sync {
    // Users

    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Case-insensitive email lookup; several accounts may share an address.
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>>;

    async fn set_password(&self, user_id: i64, password_hash: &str) -> Result<()>;

    /// Removes the user with their posts, comments and follows.
    async fn delete_user(&self, user_id: i64) -> Result<bool>;

    // Groups

    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn find_group_by_id(&self, id: i64) -> Result<Option<Group>>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// Removes the group; its posts stay with no group.
    async fn delete_group(&self, group_id: i64) -> Result<bool>;

    // Posts

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Post>;

    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>>;

    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;

    async fn list_posts(&self, filter: PostFilter, limit: i64, offset: i64)
        -> Result<Vec<PostView>>;

    /// Removes the post with its comments.
    async fn delete_post(&self, post_id: i64) -> Result<bool>;

    // Comments

    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Newest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>>;

    // Follows

    /// Returns `false` when the pair already existed.
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Number of authors `user_id` follows.
    async fn count_following(&self, user_id: i64) -> Result<i64>;

    /// Cheap round-trip for readiness probes.
    async fn health_check(&self) -> Result<()>;
}
