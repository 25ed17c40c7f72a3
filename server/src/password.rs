use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tokio::sync::OnceCell;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("stored password hash is malformed: {0}")]
    Malformed(argon2::password_hash::Error),
    #[error("password hashing task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// A one-way password hash in PHC string format.
///
/// The wrapped value never shows up in `Debug` output and has no `Display` or `Serialize`
/// implementation, so it can't leak into logs or rendered pages.
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub(crate) fn as_phc(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest([redacted])")
    }
}

/// Hash a password using Argon2id
///
/// Hashing is CPU bound so it runs on the blocking pool.
pub async fn hash_password(raw_password: &str) -> Result<PasswordDigest, PasswordError> {
    let raw_password = raw_password.to_owned();

    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| PasswordDigest(hash.to_string()))
            .map_err(PasswordError::Hash)
    })
    .await?
}

/// Verify a password against a stored hash
pub async fn verify_password(
    raw_password: &str,
    digest: &PasswordDigest,
) -> Result<bool, PasswordError> {
    let raw_password = raw_password.to_owned();
    let digest = digest.clone();

    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(digest.as_phc()).map_err(PasswordError::Malformed)?;

        match Argon2::default().verify_password(raw_password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordError::Hash(err)),
        }
    })
    .await?
}

static DUMMY_DIGEST: OnceCell<PasswordDigest> = OnceCell::const_new();

/// Spend the same argon2 work as [`verify_password`] when there is no stored hash to check,
/// so a missing account takes as long to reject as a wrong password.
pub async fn verify_against_dummy(raw_password: &str) -> Result<(), PasswordError> {
    let digest = DUMMY_DIGEST
        .get_or_try_init(|| hash_password("quill-dummy-password"))
        .await?;

    verify_password(raw_password, digest).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let digest = hash_password("cat-on-keyboard").await.unwrap();

        assert!(digest.as_phc().starts_with("$argon2"));
        assert!(verify_password("cat-on-keyboard", &digest).await.unwrap());
        assert!(!verify_password("dog-on-keyboard", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_different_salts() {
        let first = hash_password("hunter2").await.unwrap();
        let second = hash_password("hunter2").await.unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let digest = PasswordDigest::from_phc("$argon2id$v=19$secret");

        assert_eq!(format!("{:?}", digest), "PasswordDigest([redacted])");
    }

    #[tokio::test]
    async fn test_dummy_verification_uses_a_real_hash() {
        verify_against_dummy("anything").await.unwrap();
        verify_against_dummy("anything else").await.unwrap();

        let digest = DUMMY_DIGEST.get().unwrap();
        assert!(digest.as_phc().starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_malformed_digest_is_an_error() {
        let digest = PasswordDigest::from_phc("plaintext-password");

        assert!(matches!(
            verify_password("plaintext-password", &digest).await,
            Err(PasswordError::Malformed(_))
        ));
    }
}
