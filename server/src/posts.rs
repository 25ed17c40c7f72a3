use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accounts::AccountId;
use crate::errors::AppError;
use crate::store::{NewPost, PostUpdate, Store};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A blog post
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub date_posted: DateTime<Utc>,
    /// Set at creation. Only becomes `None` when the author deletes their account.
    pub author_id: Option<AccountId>,
    /// Display name of the author, joined in for rendering
    pub author_name: Option<String>,
    /// Bumped on every edit
    pub version: i32,
}

/// Input for [`ContentStore::create_post`].
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub slug: String,
}

/// Post fields to change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub slug: Option<String>,
    /// When set, the edit only applies if the stored version still matches.
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    DatePosted,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

/// Ordering for post listings. Ties are always broken by ascending id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostOrder {
    pub field: SortField,
    pub direction: Direction,
}

impl PostOrder {
    pub fn newest_first() -> Self {
        Self::default()
    }

    pub fn by_title() -> Self {
        Self {
            field: SortField::Title,
            direction: Direction::Ascending,
        }
    }

    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let by_field = match self.field {
            SortField::DatePosted => a.date_posted.cmp(&b.date_posted),
            SortField::Title => a.title.as_bytes().cmp(b.title.as_bytes()),
        };

        let by_field = match self.direction {
            Direction::Ascending => by_field,
            Direction::Descending => by_field.reverse(),
        };

        by_field.then_with(|| a.id.cmp(&b.id))
    }
}

/// A finite, ordered snapshot of posts. Iterating it again yields the same sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostListing {
    posts: Vec<Post>,
}

impl PostListing {
    pub fn iter(&self) -> std::slice::Iter<'_, Post> {
        self.posts.iter()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl From<Vec<Post>> for PostListing {
    fn from(posts: Vec<Post>) -> Self {
        Self { posts }
    }
}

impl<'a> IntoIterator for &'a PostListing {
    type Item = &'a Post;
    type IntoIter = std::slice::Iter<'a, Post>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.iter()
    }
}

impl IntoIterator for PostListing {
    type Item = Post;
    type IntoIter = std::vec::IntoIter<Post>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.into_iter()
    }
}

/// Owns posts and enforces that only their author (or the super-user) changes them.
#[derive(Clone)]
pub struct ContentStore {
    store: Arc<dyn Store>,
    super_user_id: Option<AccountId>,
}

impl ContentStore {
    pub fn new(store: Arc<dyn Store>, super_user_id: Option<AccountId>) -> Self {
        Self {
            store,
            super_user_id,
        }
    }

    pub fn is_super_user(&self, account_id: AccountId) -> bool {
        self.super_user_id == Some(account_id)
    }

    /// The ownership rule shared by edit and delete
    pub fn may_modify(&self, post: &Post, requesting_account_id: AccountId) -> bool {
        post.author_id == Some(requesting_account_id) || self.is_super_user(requesting_account_id)
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_post(&self, author_id: AccountId, draft: PostDraft) -> Result<Post, AppError> {
        if self.store.account_by_id(author_id).await?.is_none() {
            return Err(AppError::account_not_found(author_id));
        }

        let post = self
            .store
            .insert_post(NewPost {
                author_id,
                title: draft.title,
                content: draft.content,
                slug: draft.slug,
            })
            .await?;

        info!("Account {} created post {}", author_id, post.id);
        Ok(post)
    }

    pub async fn get_post(&self, id: PostId) -> Result<Post, AppError> {
        self.store
            .post_by_id(id)
            .await?
            .ok_or_else(|| AppError::post_not_found(id))
    }

    #[tracing::instrument(skip(self, changes))]
    pub async fn edit_post(
        &self,
        id: PostId,
        requesting_account_id: AccountId,
        changes: PostChanges,
    ) -> Result<Post, AppError> {
        let post = self.get_post(id).await?;
        self.ensure_may_modify(&post, requesting_account_id)?;

        match self.store.update_post(id, &changes).await? {
            PostUpdate::Updated(post) => {
                info!("Account {} edited post {}", requesting_account_id, id);
                Ok(post)
            }
            PostUpdate::Missing => Err(AppError::post_not_found(id)),
            PostUpdate::Stale { current_version } => {
                warn!(
                    "Rejected stale edit of post {} (expected version {:?}, current {})",
                    id, changes.expected_version, current_version
                );
                Err(AppError::Conflict(id))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_post(
        &self,
        id: PostId,
        requesting_account_id: AccountId,
    ) -> Result<(), AppError> {
        let post = self.get_post(id).await?;
        self.ensure_may_modify(&post, requesting_account_id)?;

        if !self.store.delete_post(id).await? {
            return Err(AppError::post_not_found(id));
        }

        info!("Account {} deleted post {}", requesting_account_id, id);
        Ok(())
    }

    pub async fn list_posts(&self, order: PostOrder) -> Result<PostListing, AppError> {
        Ok(self.store.list_posts(order).await?.into())
    }

    pub async fn posts_by_author(&self, author_id: AccountId) -> Result<PostListing, AppError> {
        Ok(self.store.posts_by_author(author_id).await?.into())
    }

    /// Posts whose title contains `title_substring` (case-sensitive), ordered by title.
    pub async fn search(&self, title_substring: &str) -> Result<PostListing, AppError> {
        if title_substring.is_empty() {
            return Err(AppError::Validation(
                "Enter something to search for".to_string(),
            ));
        }

        Ok(self
            .store
            .posts_with_title_containing(title_substring)
            .await?
            .into())
    }

    fn ensure_may_modify(&self, post: &Post, requesting_account_id: AccountId) -> Result<(), AppError> {
        if self.may_modify(post, requesting_account_id) {
            return Ok(());
        }

        warn!(
            "Account {} attempted to modify post {} owned by {:?}",
            requesting_account_id, post.id, post.author_id
        );
        Err(AppError::Permission {
            requester: requesting_account_id,
            target: format!("post {}", post.id),
        })
    }
}
