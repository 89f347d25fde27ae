/// Database access layer
///
/// Handlers talk to the stores through these traits; the PostgreSQL
/// implementations live in the submodules.
use crate::error::Result;
use crate::models::{NewPost, Post, PostChanges, PostPage, User, UserCredentials};
use async_trait::async_trait;

pub mod post_repo;
pub mod user_repo;

pub use post_repo::PgPostRepository;
pub use user_repo::PgUserRepository;

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post; `created_at` is assigned by the store
    async fn create(&self, author_id: i64, post: NewPost) -> Result<Post>;

    /// Newest-first page, optionally restricted to an exact category slug
    async fn list(&self, category: Option<&str>, limit: i64, offset: i64) -> Result<PostPage>;

    async fn get(&self, id: i64) -> Result<Option<Post>>;

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>>;

    /// Returns false when no post had that id
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `AppError::Conflict` when the username is taken
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<User>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserCredentials>>;

    /// Return the user's existing token, or store `candidate_key` as their token
    async fn get_or_create_token(&self, user_id: i64, candidate_key: &str) -> Result<String>;

    async fn user_for_token(&self, key: &str) -> Result<Option<User>>;
}
