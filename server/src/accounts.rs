use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::{AppError, AuthError, DuplicateField};
use crate::password::{hash_password, verify_against_dummy, verify_password, PasswordDigest};
use crate::store::{NewAccount, Store, StoreError, USERS_EMAIL_UNIQUE, USERS_USERNAME_UNIQUE};
use crate::uploads::UploadStore;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a registered account
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    /// Server assigned, never changes
    pub id: AccountId,
    pub username: String,
    /// Display name
    pub name: String,
    pub email: String,
    pub favorite_color: Option<String>,
    pub about_author: Option<String>,
    /// Storage name of the uploaded profile picture
    pub profile_pic: Option<String>,
    pub(crate) password_hash: PasswordDigest,
    pub date_added: DateTime<Utc>,
}

/// Represents a session for authenticated accounts
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Session {
    /// Unique session ID (used in cookies)
    pub session_id: Uuid,
    /// The account this session belongs to
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
    /// Cleared on logout
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Input for [`AccountManager::register`].
///
/// Deliberately not `Debug`: it carries the raw password.
#[derive(Clone)]
pub struct Registration {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub favorite_color: Option<String>,
    pub about_author: Option<String>,
}

/// Profile fields to change. `None` leaves a field untouched; for the optional fields
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub favorite_color: Option<Option<String>>,
    pub about_author: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self == &ProfileChanges::default()
    }
}

#[derive(Debug, Clone)]
pub enum PasswordCheck {
    UnknownEmail,
    Matches(Account),
    Mismatch(Account),
}

/// Owns account records, credential checks and sessions.
#[derive(Clone)]
pub struct AccountManager {
    store: Arc<dyn Store>,
    uploads: UploadStore,
    session_duration: chrono::Duration,
}

impl AccountManager {
    pub fn new(store: Arc<dyn Store>, uploads: UploadStore, session_duration_days: i64) -> Self {
        Self {
            store,
            uploads,
            session_duration: chrono::Duration::days(session_duration_days),
        }
    }

    pub async fn get(&self, id: AccountId) -> Result<Account, AppError> {
        self.store
            .account_by_id(id)
            .await?
            .ok_or_else(|| AppError::account_not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.store.list_accounts().await?)
    }

    /// Create a new account. The email must not belong to any other account.
    #[tracing::instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<Account, AppError> {
        if self
            .store
            .account_by_email(&registration.email)
            .await?
            .is_some()
        {
            warn!("Registration rejected, email already in use");
            return Err(AppError::Duplicate(DuplicateField::Email));
        }

        let password_hash = hash_password(&registration.password).await?;

        let account = self
            .store
            .insert_account(NewAccount {
                username: registration.username,
                name: registration.name,
                email: registration.email,
                favorite_color: registration.favorite_color,
                about_author: registration.about_author,
                password_hash,
            })
            .await
            .map_err(duplicate_from_store)?;

        info!(account_id = %account.id, "Registered new account");
        Ok(account)
    }

    /// Check a username and password and open a session for the account.
    #[tracing::instrument(skip(self, raw_password))]
    pub async fn authenticate(
        &self,
        username: &str,
        raw_password: &str,
    ) -> Result<(Account, Session), AppError> {
        let Some(account) = self.store.account_by_username(username).await? else {
            info!("Login attempt for unknown username");
            verify_against_dummy(raw_password).await?;
            return Err(AuthError::NotFound.into());
        };

        if !verify_password(raw_password, &account.password_hash).await? {
            warn!(account_id = %account.id, "Login attempt with wrong password");
            return Err(AuthError::BadCredential.into());
        }

        let session = self
            .store
            .insert_session(account.id, Utc::now() + self.session_duration)
            .await?;

        info!(
            "Created new session {} for account {}",
            session.session_id, account.id
        );
        Ok((account, session))
    }

    /// Returns the account behind an active, unexpired session
    pub async fn resolve_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<(Account, Session)>, AppError> {
        let Some(session) = self.store.session_by_id(session_id).await? else {
            return Ok(None);
        };

        if session.is_expired() {
            info!("Session {} is expired", session_id);
            return Ok(None);
        }

        if !session.is_active {
            info!("Session {} is inactive", session_id);
            return Ok(None);
        }

        match self.store.account_by_id(session.account_id).await? {
            Some(account) => Ok(Some((account, session))),
            None => {
                error!("No account found for session {}", session_id);
                Ok(None)
            }
        }
    }

    pub async fn end_session(&self, session_id: Uuid) -> Result<(), AppError> {
        self.store.deactivate_session(session_id).await?;
        info!("Session {} invalidated", session_id);
        Ok(())
    }

    /// Apply the supplied profile fields. The password is never changed here.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        id: AccountId,
        changes: ProfileChanges,
    ) -> Result<Account, AppError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let account = self
            .store
            .update_account(id, &changes)
            .await
            .map_err(duplicate_from_store)?
            .ok_or_else(|| AppError::account_not_found(id))?;

        info!("Updated profile for account {}", id);
        Ok(account)
    }

    /// Store a new profile picture and point the account at it.
    ///
    /// The record is committed before the file is written. If writing fails the previous
    /// reference is put back so the account never points at a missing file.
    #[tracing::instrument(skip(self, file_bytes))]
    pub async fn upload_profile_picture(
        &self,
        id: AccountId,
        file_bytes: &[u8],
        original_name: &str,
    ) -> Result<String, AppError> {
        let previous = self.get(id).await?.profile_pic;
        let stored_name = self.uploads.storage_name(original_name);

        self.store
            .set_profile_pic(id, Some(&stored_name))
            .await?
            .ok_or_else(|| AppError::account_not_found(id))?;

        if let Err(err) = self.uploads.save(&stored_name, file_bytes).await {
            error!("Failed to write profile picture {}: {:?}", stored_name, err);

            if let Err(restore_err) = self.store.set_profile_pic(id, previous.as_deref()).await {
                error!(
                    "Failed to restore previous profile picture for account {}: {:?}",
                    id, restore_err
                );
            }

            return Err(AppError::Upload(err));
        }

        if let Some(previous) = previous {
            if let Err(err) = self.uploads.remove(&previous).await {
                warn!("Failed to remove old profile picture {}: {:?}", previous, err);
            }
        }

        info!("Stored profile picture {} for account {}", stored_name, id);
        Ok(stored_name)
    }

    /// Delete an account. Only the account itself may do this.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(
        &self,
        id: AccountId,
        requesting_account_id: AccountId,
    ) -> Result<(), AppError> {
        if requesting_account_id != id {
            warn!("Account {} attempted to delete account {}", requesting_account_id, id);
            return Err(AppError::Permission {
                requester: requesting_account_id,
                target: format!("account {}", id),
            });
        }

        let account = self.get(id).await?;

        if !self.store.delete_account(id).await? {
            return Err(AppError::account_not_found(id));
        }

        if let Some(profile_pic) = account.profile_pic {
            if let Err(err) = self.uploads.remove(&profile_pic).await {
                warn!("Failed to remove profile picture {}: {:?}", profile_pic, err);
            }
        }

        info!("Deleted account {}", id);
        Ok(())
    }

    /// Look an account up by email and report whether the password matches it.
    pub async fn check_password(
        &self,
        email: &str,
        raw_password: &str,
    ) -> Result<PasswordCheck, AppError> {
        let Some(account) = self.store.account_by_email(email).await? else {
            return Ok(PasswordCheck::UnknownEmail);
        };

        if verify_password(raw_password, &account.password_hash).await? {
            Ok(PasswordCheck::Matches(account))
        } else {
            Ok(PasswordCheck::Mismatch(account))
        }
    }
}

fn duplicate_from_store(err: StoreError) -> AppError {
    match &err {
        StoreError::UniqueViolation { constraint } if constraint == USERS_EMAIL_UNIQUE => {
            AppError::Duplicate(DuplicateField::Email)
        }
        StoreError::UniqueViolation { constraint } if constraint == USERS_USERNAME_UNIQUE => {
            AppError::Duplicate(DuplicateField::Username)
        }
        _ => AppError::Store(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> (AccountManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let manager = AccountManager::new(
            Arc::new(MemoryStore::default()),
            UploadStore::new(dir.path()),
            30,
        );
        (manager, dir)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            name: format!("{} Person", username),
            email: email.to_string(),
            password: "correct horse".to_string(),
            favorite_color: Some("green".to_string()),
            about_author: None,
        }
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let (manager, _dir) = manager();

        let first = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        let second = manager
            .register(registration("ada2", "ada@example.com"))
            .await;
        assert!(matches!(
            second,
            Err(AppError::Duplicate(DuplicateField::Email))
        ));

        // The first account is untouched
        assert_eq!(manager.get(first.id).await.unwrap(), first);
        assert_eq!(manager.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let (manager, _dir) = manager();

        manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        assert!(manager
            .register(registration("ada2", "ADA@example.com"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_username() {
        let (manager, _dir) = manager();

        manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        let second = manager
            .register(registration("ada", "other@example.com"))
            .await;
        assert!(matches!(
            second,
            Err(AppError::Duplicate(DuplicateField::Username))
        ));
    }

    #[tokio::test]
    async fn test_raw_password_is_never_stored() {
        let (manager, _dir) = manager();

        let account = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        assert_ne!(account.password_hash.as_phc(), "correct horse");
        assert!(!format!("{:?}", account).contains("argon2"));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (manager, _dir) = manager();
        let account = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        let (logged_in, session) = manager
            .authenticate("ada", "correct horse")
            .await
            .unwrap();
        assert_eq!(logged_in.id, account.id);
        assert_eq!(session.account_id, account.id);
        assert!(session.is_active);

        let (resolved, _) = manager
            .resolve_session(session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let (manager, _dir) = manager();
        manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            manager.authenticate("ada", "wrong horse").await,
            Err(AppError::Auth(AuthError::BadCredential))
        ));
        assert!(matches!(
            manager.authenticate("Ada", "correct horse").await,
            Err(AppError::Auth(AuthError::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_ended_session_no_longer_resolves() {
        let (manager, _dir) = manager();
        manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();
        let (_, session) = manager
            .authenticate("ada", "correct horse")
            .await
            .unwrap();

        manager.end_session(session.session_id).await.unwrap();

        assert!(manager
            .resolve_session(session.session_id)
            .await
            .unwrap()
            .is_none());
        assert!(manager
            .resolve_session(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_profile_only_touches_supplied_fields() {
        let (manager, _dir) = manager();
        let account = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        let updated = manager
            .update_profile(
                account.id,
                ProfileChanges {
                    name: Some("Ada Lovelace".to_string()),
                    about_author: Some(Some("Writes about engines".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.about_author.as_deref(), Some("Writes about engines"));
        assert_eq!(updated.username, account.username);
        assert_eq!(updated.email, account.email);
        assert_eq!(updated.favorite_color, account.favorite_color);
        assert_eq!(updated.password_hash, account.password_hash);

        let cleared = manager
            .update_profile(
                account.id,
                ProfileChanges {
                    favorite_color: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.favorite_color, None);
    }

    #[tokio::test]
    async fn test_update_profile_errors() {
        let (manager, _dir) = manager();
        manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();
        let grace = manager
            .register(registration("grace", "grace@example.com"))
            .await
            .unwrap();

        let taken = manager
            .update_profile(
                grace.id,
                ProfileChanges {
                    email: Some("ada@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            taken,
            Err(AppError::Duplicate(DuplicateField::Email))
        ));

        let missing = manager
            .update_profile(
                AccountId(999),
                ProfileChanges {
                    name: Some("Nobody".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_account_requires_ownership() {
        let (manager, _dir) = manager();
        let ada = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();
        let grace = manager
            .register(registration("grace", "grace@example.com"))
            .await
            .unwrap();

        let result = manager.delete_account(ada.id, grace.id).await;
        assert!(matches!(result, Err(AppError::Permission { .. })));
        assert_eq!(manager.get(ada.id).await.unwrap(), ada);

        manager.delete_account(grace.id, grace.id).await.unwrap();
        assert!(matches!(
            manager.get(grace.id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleting_account_ends_its_sessions() {
        let (manager, _dir) = manager();
        let ada = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();
        let (_, session) = manager
            .authenticate("ada", "correct horse")
            .await
            .unwrap();

        manager.delete_account(ada.id, ada.id).await.unwrap();

        assert!(manager
            .resolve_session(session.session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_profile_picture_uploads_never_collide() {
        let (manager, dir) = manager();
        let ada = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();
        let grace = manager
            .register(registration("grace", "grace@example.com"))
            .await
            .unwrap();

        let ada_pic = manager
            .upload_profile_picture(ada.id, b"ada-bytes", "me.png")
            .await
            .unwrap();
        let grace_pic = manager
            .upload_profile_picture(grace.id, b"grace-bytes", "me.png")
            .await
            .unwrap();

        assert_ne!(ada_pic, grace_pic);
        assert!(ada_pic.ends_with("_me.png"));
        assert_eq!(
            std::fs::read(dir.path().join(&ada_pic)).unwrap(),
            b"ada-bytes"
        );
        assert_eq!(
            std::fs::read(dir.path().join(&grace_pic)).unwrap(),
            b"grace-bytes"
        );
        assert_eq!(
            manager.get(ada.id).await.unwrap().profile_pic,
            Some(ada_pic)
        );
    }

    #[tokio::test]
    async fn test_replacing_profile_picture_removes_old_file() {
        let (manager, dir) = manager();
        let ada = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        let first = manager
            .upload_profile_picture(ada.id, b"one", "one.png")
            .await
            .unwrap();
        let second = manager
            .upload_profile_picture(ada.id, b"two", "two.png")
            .await
            .unwrap();

        assert!(!dir.path().join(first).exists());
        assert!(dir.path().join(second).exists());
    }

    #[tokio::test]
    async fn test_failed_file_write_restores_previous_picture() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the upload directory should be makes every write fail
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();

        let manager = AccountManager::new(
            Arc::new(MemoryStore::default()),
            UploadStore::new(&blocked),
            30,
        );
        let ada = manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        let result = manager
            .upload_profile_picture(ada.id, b"bytes", "me.png")
            .await;

        assert!(matches!(result, Err(AppError::Upload(_))));
        assert_eq!(manager.get(ada.id).await.unwrap().profile_pic, None);
    }

    #[tokio::test]
    async fn test_check_password() {
        let (manager, _dir) = manager();
        manager
            .register(registration("ada", "ada@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            manager
                .check_password("ada@example.com", "correct horse")
                .await
                .unwrap(),
            PasswordCheck::Matches(_)
        ));
        assert!(matches!(
            manager
                .check_password("ada@example.com", "nope")
                .await
                .unwrap(),
            PasswordCheck::Mismatch(_)
        ));
        assert!(matches!(
            manager
                .check_password("nobody@example.com", "nope")
                .await
                .unwrap(),
            PasswordCheck::UnknownEmail
        ));
    }
}
