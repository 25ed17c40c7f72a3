use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewAccount, NewPost, PostUpdate, Store, StoreError, USERS_EMAIL_UNIQUE, USERS_USERNAME_UNIQUE};
use crate::accounts::{Account, AccountId, ProfileChanges, Session};
use crate::posts::{Post, PostChanges, PostId, PostOrder};

/// Process-local store used when no database is configured, and by the tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<AccountId, Account>,
    posts: BTreeMap<PostId, Post>,
    sessions: HashMap<Uuid, Session>,
    last_account_id: i64,
    last_post_id: i64,
}

impl Tables {
    fn check_unique(
        &self,
        id: Option<AccountId>,
        username: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        for other in self.accounts.values().filter(|a| Some(a.id) != id) {
            if other.email == email {
                return Err(StoreError::UniqueViolation {
                    constraint: USERS_EMAIL_UNIQUE.to_string(),
                });
            }
            if other.username == username {
                return Err(StoreError::UniqueViolation {
                    constraint: USERS_USERNAME_UNIQUE.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Posts as the database would return them, with the author's name joined in
    fn joined(&self, post: &Post) -> Post {
        let mut post = post.clone();
        post.author_name = post
            .author_id
            .and_then(|id| self.accounts.get(&id))
            .map(|account| account.name.clone());
        post
    }

    fn sorted(&self, posts: impl Iterator<Item = Post>, order: PostOrder) -> Vec<Post> {
        let mut posts: Vec<Post> = posts.map(|post| self.joined(&post)).collect();
        posts.sort_by(|a, b| order.compare(a, b));
        posts
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(None, &account.username, &account.email)?;

        tables.last_account_id += 1;
        let id = AccountId(tables.last_account_id);

        let account = Account {
            id,
            username: account.username,
            name: account.name,
            email: account.email,
            favorite_color: account.favorite_color,
            about_author: account.about_author,
            profile_pic: None,
            password_hash: account.password_hash,
            date_added: Utc::now(),
        };
        tables.accounts.insert(id, account.clone());

        Ok(account)
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<Account> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.date_added.cmp(&b.date_added).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }

    async fn update_account(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Option<Account>, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(current) = tables.accounts.get(&id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        if let Some(name) = &changes.name {
            updated.name = name.clone();
        }
        if let Some(username) = &changes.username {
            updated.username = username.clone();
        }
        if let Some(email) = &changes.email {
            updated.email = email.clone();
        }
        if let Some(favorite_color) = &changes.favorite_color {
            updated.favorite_color = favorite_color.clone();
        }
        if let Some(about_author) = &changes.about_author {
            updated.about_author = about_author.clone();
        }

        tables.check_unique(Some(id), &updated.username, &updated.email)?;
        tables.accounts.insert(id, updated.clone());

        Ok(Some(updated))
    }

    async fn set_profile_pic(
        &self,
        id: AccountId,
        profile_pic: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables.accounts.get_mut(&id).map(|account| {
            account.profile_pic = profile_pic.map(str::to_string);
            account.clone()
        }))
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.accounts.remove(&id).is_none() {
            return Ok(false);
        }

        for post in tables.posts.values_mut() {
            if post.author_id == Some(id) {
                post.author_id = None;
            }
        }
        tables.sessions.retain(|_, session| session.account_id != id);

        Ok(true)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;

        tables.last_post_id += 1;
        let id = PostId(tables.last_post_id);

        let post = Post {
            id,
            title: post.title,
            content: post.content,
            slug: post.slug,
            date_posted: Utc::now(),
            author_id: Some(post.author_id),
            author_name: None,
            version: 1,
        };
        tables.posts.insert(id, post.clone());

        Ok(tables.joined(&post))
    }

    async fn post_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|post| tables.joined(post)))
    }

    async fn update_post(
        &self,
        id: PostId,
        changes: &PostChanges,
    ) -> Result<PostUpdate, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(post) = tables.posts.get_mut(&id) else {
            return Ok(PostUpdate::Missing);
        };

        if let Some(expected) = changes.expected_version {
            if expected != post.version {
                return Ok(PostUpdate::Stale {
                    current_version: post.version,
                });
            }
        }

        if let Some(title) = &changes.title {
            post.title = title.clone();
        }
        if let Some(content) = &changes.content {
            post.content = content.clone();
        }
        if let Some(slug) = &changes.slug {
            post.slug = slug.clone();
        }
        post.version += 1;

        let post = post.clone();
        Ok(PostUpdate::Updated(tables.joined(&post)))
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.posts.remove(&id).is_some())
    }

    async fn list_posts(&self, order: PostOrder) -> Result<Vec<Post>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.sorted(tables.posts.values().cloned(), order))
    }

    async fn posts_by_author(&self, author_id: AccountId) -> Result<Vec<Post>, StoreError> {
        let tables = self.tables.read().await;
        let posts = tables
            .posts
            .values()
            .filter(|post| post.author_id == Some(author_id))
            .cloned();
        Ok(tables.sorted(posts, PostOrder::newest_first()))
    }

    async fn posts_with_title_containing(&self, needle: &str) -> Result<Vec<Post>, StoreError> {
        let tables = self.tables.read().await;
        let posts = tables
            .posts
            .values()
            .filter(|post| post.title.contains(needle))
            .cloned();
        Ok(tables.sorted(posts, PostOrder::by_title()))
    }

    async fn insert_session(
        &self,
        account_id: AccountId,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let session = Session {
            session_id: Uuid::new_v4(),
            account_id,
            expires_at,
            is_active: true,
            created_at: Utc::now(),
        };

        self.tables
            .write()
            .await
            .sessions
            .insert(session.session_id, session.clone());

        Ok(session)
    }

    async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(session) = self.tables.write().await.sessions.get_mut(&id) {
            session.is_active = false;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordDigest;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            name: username.to_string(),
            email: email.to_string(),
            favorite_color: None,
            about_author: None,
            password_hash: PasswordDigest::from_phc("$argon2id$test"),
        }
    }

    #[tokio::test]
    async fn test_unique_constraints_name_the_column() {
        let store = MemoryStore::default();
        store
            .insert_account(new_account("ada", "ada@example.com"))
            .await
            .unwrap();

        let email = store
            .insert_account(new_account("other", "ada@example.com"))
            .await;
        assert!(matches!(
            email,
            Err(StoreError::UniqueViolation { constraint }) if constraint == USERS_EMAIL_UNIQUE
        ));

        let username = store
            .insert_account(new_account("ada", "other@example.com"))
            .await;
        assert!(matches!(
            username,
            Err(StoreError::UniqueViolation { constraint }) if constraint == USERS_USERNAME_UNIQUE
        ));
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let store = MemoryStore::default();
        let first = store
            .insert_account(new_account("ada", "ada@example.com"))
            .await
            .unwrap();
        store.delete_account(first.id).await.unwrap();

        let second = store
            .insert_account(new_account("ada", "ada@example.com"))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_account_can_keep_its_own_email() {
        let store = MemoryStore::default();
        let ada = store
            .insert_account(new_account("ada", "ada@example.com"))
            .await
            .unwrap();

        let updated = store
            .update_account(
                ada.id,
                &ProfileChanges {
                    email: Some("ada@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.email, "ada@example.com");
    }
}
