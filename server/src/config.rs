use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use color_eyre::eyre::{eyre, WrapErr as _};

use crate::accounts::AccountId;

/// Accepted values for `SESSION_DURATION_DAYS`
const SESSION_DURATION_RANGE: RangeInclusive<i64> = 1..=3650;

/// Settings read from the environment at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without one everything lives in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub domain: String,
    pub protocol: String,
    /// Where uploaded profile pictures are written
    pub upload_dir: PathBuf,
    /// The account allowed to edit and delete any post
    pub super_user_id: Option<AccountId>,
    pub session_duration_days: i64,
    pub development_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 3000,
            domain: "localhost:3000".to_string(),
            protocol: "http".to_string(),
            upload_dir: PathBuf::from("uploads"),
            super_user_id: None,
            session_duration_days: 30,
            development_mode: false,
        }
    }
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        let defaults = Config::default();

        let port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .wrap_err_with(|| format!("PORT is not a valid port number: {}", port))?,
            Err(_) => defaults.port,
        };

        let super_user_id = match env::var("SUPER_USER_ID") {
            Ok(id) => Some(AccountId(
                id.parse()
                    .wrap_err_with(|| format!("SUPER_USER_ID is not an account id: {}", id))?,
            )),
            Err(_) => None,
        };

        let session_duration_days = match env::var("SESSION_DURATION_DAYS") {
            Ok(days) => parse_session_duration(&days)?,
            Err(_) => defaults.session_duration_days,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            port,
            domain: env::var("DOMAIN").unwrap_or(defaults.domain),
            protocol: env::var("PROTO").unwrap_or(defaults.protocol),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            super_user_id,
            session_duration_days,
            development_mode: env::var("DEVELOPMENT_MODE")
                .map(|v| v == "1")
                .unwrap_or(false),
        })
    }

    /// Cookies are only marked `Secure` when served over https
    pub fn secure_cookies(&self) -> bool {
        self.protocol == "https"
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

fn parse_session_duration(days: &str) -> crate::Result<i64> {
    let days: i64 = days
        .parse()
        .wrap_err_with(|| format!("SESSION_DURATION_DAYS is not a number: {}", days))?;

    if !SESSION_DURATION_RANGE.contains(&days) {
        return Err(eyre!(
            "SESSION_DURATION_DAYS must be between {} and {}, got {}",
            SESSION_DURATION_RANGE.start(),
            SESSION_DURATION_RANGE.end(),
            days
        ));
    }

    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_duration_must_be_in_range() {
        assert_eq!(parse_session_duration("30").unwrap(), 30);
        assert_eq!(parse_session_duration("1").unwrap(), 1);
        assert_eq!(parse_session_duration("3650").unwrap(), 3650);

        assert!(parse_session_duration("0").is_err());
        assert!(parse_session_duration("-5").is_err());
        assert!(parse_session_duration("3651").is_err());
        assert!(parse_session_duration("9223372036854775807").is_err());
        assert!(parse_session_duration("a month").is_err());
    }

    #[test]
    fn test_secure_cookies_follow_protocol() {
        let mut config = Config::default();
        assert!(!config.secure_cookies());

        config.protocol = "https".to_string();
        assert!(config.secure_cookies());
        assert_eq!(config.base_url(), "https://localhost:3000");
    }
}
