//! Record storage for accounts, posts and sessions.
//!
//! The rest of the crate talks to a [`Store`] and never to a database driver directly.
//! [`PgStore`] is the production implementation; [`MemoryStore`] backs local development
//! without a database and the test-suite. Both enforce the same unique constraints,
//! orderings and delete cascades.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::accounts::{Account, AccountId, ProfileChanges, Session};
use crate::password::PasswordDigest;
use crate::posts::{Post, PostChanges, PostId, PostOrder};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const USERS_EMAIL_UNIQUE: &str = "uq_users_email";
pub const USERS_USERNAME_UNIQUE: &str = "uq_users_username";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },
    #[error("database is unavailable")]
    Unavailable(#[source] sqlx::Error),
    #[error("database query failed")]
    Query(#[source] sqlx::Error),
}

impl StoreError {
    /// Failures that say nothing about the request itself; retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err),
            other => StoreError::Query(other),
        }
    }
}

/// A validated account ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub name: String,
    pub email: String,
    pub favorite_color: Option<String>,
    pub about_author: Option<String>,
    pub password_hash: PasswordDigest,
}

/// A validated post ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: AccountId,
    pub title: String,
    pub content: String,
    pub slug: String,
}

/// Result of a conditional post update.
#[derive(Debug, Clone)]
pub enum PostUpdate {
    Updated(Post),
    Missing,
    /// The stored version no longer matches the one the editor started from.
    Stale { current_version: i32 },
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Accounts ordered by creation time, oldest first.
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn update_account(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Option<Account>, StoreError>;

    async fn set_profile_pic(
        &self,
        id: AccountId,
        profile_pic: Option<&str>,
    ) -> Result<Option<Account>, StoreError>;

    /// Removes the account and its sessions. Posts it authored keep existing with no author.
    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError>;

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn post_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError>;

    async fn update_post(
        &self,
        id: PostId,
        changes: &PostChanges,
    ) -> Result<PostUpdate, StoreError>;

    async fn delete_post(&self, id: PostId) -> Result<bool, StoreError>;

    async fn list_posts(&self, order: PostOrder) -> Result<Vec<Post>, StoreError>;

    async fn posts_by_author(&self, author_id: AccountId) -> Result<Vec<Post>, StoreError>;

    /// Case-sensitive substring match on the title, ordered by title then id.
    async fn posts_with_title_containing(&self, needle: &str) -> Result<Vec<Post>, StoreError>;

    async fn insert_session(
        &self,
        account_id: AccountId,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError>;

    async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>, StoreError>;

    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError>;
}
