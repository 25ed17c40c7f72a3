use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewAccount, NewPost, PostUpdate, Store, StoreError};
use crate::accounts::{Account, AccountId, ProfileChanges, Session};
use crate::posts::{Direction, Post, PostChanges, PostId, PostOrder, SortField};

const ACCOUNT_COLUMNS: &str = r#"
    id, username, name, email, favorite_color, about_author, profile_pic, password_hash, date_added
"#;

const SESSION_COLUMNS: &str = r#"
    id AS session_id, user_id AS account_id, expires_at, is_active, created_at
"#;

/// Selects posts from a relation named `p` with the author's name joined in
const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.slug, p.date_posted,
           p.poster_id AS author_id, u.name AS author_name, p.version
    FROM p
    LEFT JOIN users u ON u.id = p.poster_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// `WITH p AS (<source>) SELECT ...` so inserts and updates return joined posts too
fn posts_from(source: &str, tail: &str) -> String {
    format!("WITH p AS ({}) {} {}", source, POST_SELECT, tail)
}

fn order_clause(order: PostOrder) -> &'static str {
    match (order.field, order.direction) {
        (SortField::DatePosted, Direction::Descending) => "ORDER BY p.date_posted DESC, p.id ASC",
        (SortField::DatePosted, Direction::Ascending) => "ORDER BY p.date_posted ASC, p.id ASC",
        (SortField::Title, Direction::Descending) => {
            r#"ORDER BY p.title COLLATE "C" DESC, p.id ASC"#
        }
        (SortField::Title, Direction::Ascending) => r#"ORDER BY p.title COLLATE "C" ASC, p.id ASC"#,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (username, name, email, favorite_color, about_author, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(account.username)
            .bind(account.name)
            .bind(account.email)
            .bind(account.favorite_color)
            .bind(account.about_author)
            .bind(account.password_hash)
            .fetch_one(&self.pool)
            .await?;

        Ok(account)
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS);

        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE username = $1", ACCOUNT_COLUMNS);

        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", ACCOUNT_COLUMNS);

        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let query = format!(
            "SELECT {} FROM users ORDER BY date_added ASC, id ASC",
            ACCOUNT_COLUMNS
        );

        Ok(sqlx::query_as::<_, Account>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_account(
        &self,
        id: AccountId,
        changes: &ProfileChanges,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                favorite_color = CASE WHEN $5 THEN $6 ELSE favorite_color END,
                about_author = CASE WHEN $7 THEN $8 ELSE about_author END
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.username.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.favorite_color.is_some())
            .bind(changes.favorite_color.clone().flatten())
            .bind(changes.about_author.is_some())
            .bind(changes.about_author.clone().flatten())
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn set_profile_pic(
        &self,
        id: AccountId,
        profile_pic: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE users SET profile_pic = $2 WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );

        Ok(sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(profile_pic)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
        // Posts lose their author through ON DELETE SET NULL, sessions go with ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let query = posts_from(
            r#"
            INSERT INTO posts (title, content, slug, poster_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
            "",
        );

        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(post.title)
            .bind(post.content)
            .bind(post.slug)
            .bind(post.author_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn post_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        let query = posts_from("SELECT * FROM posts WHERE id = $1", "");

        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_post(
        &self,
        id: PostId,
        changes: &PostChanges,
    ) -> Result<PostUpdate, StoreError> {
        let query = posts_from(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                slug = COALESCE($4, slug),
                version = version + 1
            WHERE id = $1 AND ($5::INTEGER IS NULL OR version = $5)
            RETURNING *
            "#,
            "",
        );

        let updated = sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .bind(changes.title.as_deref())
            .bind(changes.content.as_deref())
            .bind(changes.slug.as_deref())
            .bind(changes.expected_version)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(post) = updated {
            return Ok(PostUpdate::Updated(post));
        }

        let current_version =
            sqlx::query_scalar::<_, i32>("SELECT version FROM posts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match current_version {
            Some(current_version) => PostUpdate::Stale { current_version },
            None => PostUpdate::Missing,
        })
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_posts(&self, order: PostOrder) -> Result<Vec<Post>, StoreError> {
        let query = posts_from("SELECT * FROM posts", order_clause(order));

        Ok(sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn posts_by_author(&self, author_id: AccountId) -> Result<Vec<Post>, StoreError> {
        let query = posts_from(
            "SELECT * FROM posts WHERE poster_id = $1",
            order_clause(PostOrder::newest_first()),
        );

        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn posts_with_title_containing(&self, needle: &str) -> Result<Vec<Post>, StoreError> {
        // strpos keeps % and _ literal, unlike LIKE
        let query = posts_from(
            "SELECT * FROM posts WHERE strpos(title, $1) > 0",
            order_clause(PostOrder::by_title()),
        );

        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(needle)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_session(
        &self,
        account_id: AccountId,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let query = format!(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        Ok(sqlx::query_as::<_, Session>(&query)
            .bind(Uuid::new_v4())
            .bind(account_id)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn session_by_id(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let query = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);

        Ok(sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn deactivate_session(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordDigest;
    use crate::store::USERS_EMAIL_UNIQUE;

    #[test]
    fn test_posts_from_wraps_source() {
        let query = posts_from("SELECT * FROM posts", order_clause(PostOrder::newest_first()));

        assert!(query.starts_with("WITH p AS (SELECT * FROM posts)"));
        assert!(query.contains("LEFT JOIN users u ON u.id = p.poster_id"));
        assert!(query.trim_end().ends_with("ORDER BY p.date_posted DESC, p.id ASC"));
    }

    #[test]
    fn test_title_order_uses_byte_collation() {
        assert!(order_clause(PostOrder::by_title()).contains(r#"COLLATE "C""#));
    }

    // The tests below need a Postgres server: DATABASE_URL=... cargo test -- --ignored

    fn new_account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            name: format!("{} Person", username),
            email: format!("{}@example.com", username),
            favorite_color: Some("green".to_string()),
            about_author: None,
            password_hash: PasswordDigest::from_phc("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"),
        }
    }

    fn new_post(author_id: AccountId, title: &str) -> NewPost {
        NewPost {
            author_id,
            title: title.to_string(),
            content: "Some words".to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_update_account_sets_and_clears_optional_fields(pool: PgPool) {
        let store = PgStore::new(pool);
        let account = store.insert_account(new_account("ada")).await.unwrap();

        let updated = store
            .update_account(
                account.id,
                &ProfileChanges {
                    favorite_color: Some(None),
                    about_author: Some(Some("Writes about engines".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, account.name);
        assert_eq!(updated.email, account.email);
        assert_eq!(updated.favorite_color, None);
        assert_eq!(updated.about_author.as_deref(), Some("Writes about engines"));

        let missing = store
            .update_account(AccountId(account.id.0 + 1000), &ProfileChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_duplicate_email_names_its_constraint(pool: PgPool) {
        let store = PgStore::new(pool);
        store.insert_account(new_account("ada")).await.unwrap();

        let duplicate = store
            .insert_account(NewAccount {
                username: "ada2".to_string(),
                ..new_account("ada")
            })
            .await;

        match duplicate {
            Err(StoreError::UniqueViolation { constraint }) => {
                assert_eq!(constraint, USERS_EMAIL_UNIQUE)
            }
            other => panic!("expected a unique violation, got {:?}", other),
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_update_post_checks_version(pool: PgPool) {
        let store = PgStore::new(pool);
        let ada = store.insert_account(new_account("ada")).await.unwrap();
        let post = store.insert_post(new_post(ada.id, "Intro to X")).await.unwrap();
        assert_eq!(post.version, 1);
        assert_eq!(post.author_name.as_deref(), Some("ada Person"));

        let edit = PostChanges {
            title: Some("Intro to Y".to_string()),
            expected_version: Some(1),
            ..Default::default()
        };

        let PostUpdate::Updated(updated) = store.update_post(post.id, &edit).await.unwrap() else {
            panic!("first edit should apply");
        };
        assert_eq!(updated.version, 2);
        assert_eq!(updated.title, "Intro to Y");
        assert_eq!(updated.content, post.content);
        assert_eq!(updated.author_name.as_deref(), Some("ada Person"));

        assert!(matches!(
            store.update_post(post.id, &edit).await.unwrap(),
            PostUpdate::Stale { current_version: 2 }
        ));
        assert!(matches!(
            store.update_post(PostId(post.id.0 + 1000), &edit).await.unwrap(),
            PostUpdate::Missing
        ));

        let unversioned = PostChanges {
            expected_version: None,
            ..edit
        };
        assert!(matches!(
            store.update_post(post.id, &unversioned).await.unwrap(),
            PostUpdate::Updated(Post { version: 3, .. })
        ));
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_deleting_account_orphans_posts_and_drops_sessions(pool: PgPool) {
        let store = PgStore::new(pool);
        let ada = store.insert_account(new_account("ada")).await.unwrap();
        let post = store.insert_post(new_post(ada.id, "Intro to X")).await.unwrap();
        let session = store
            .insert_session(ada.id, Utc::now() + chrono::Duration::days(1))
            .await
            .unwrap();

        assert!(store.delete_account(ada.id).await.unwrap());
        assert!(!store.delete_account(ada.id).await.unwrap());

        let orphan = store.post_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(orphan.author_id, None);
        assert_eq!(orphan.author_name, None);
        assert!(store.session_by_id(session.session_id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn test_title_search_is_case_sensitive_and_literal(pool: PgPool) {
        let store = PgStore::new(pool);
        let ada = store.insert_account(new_account("ada")).await.unwrap();
        for title in ["Intro to X", "Advanced", "introduction", "100% Intro"] {
            store.insert_post(new_post(ada.id, title)).await.unwrap();
        }

        let titles = |posts: Vec<Post>| posts.into_iter().map(|p| p.title).collect::<Vec<_>>();

        assert_eq!(
            titles(store.posts_with_title_containing("Intro").await.unwrap()),
            vec!["100% Intro", "Intro to X"]
        );
        assert_eq!(
            titles(store.posts_with_title_containing("%").await.unwrap()),
            vec!["100% Intro"]
        );
        assert_eq!(
            titles(store.list_posts(PostOrder::by_title()).await.unwrap()),
            vec!["100% Intro", "Advanced", "Intro to X", "introduction"]
        );
    }
}
