use std::fmt;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::accounts::AccountId;
use crate::password::PasswordError;
use crate::posts::PostId;
use crate::store::StoreError;

#[derive(Debug)]
pub struct ServerError<R: IntoResponse>(pub(crate) color_eyre::Report, pub(crate) R);

pub type ServerResult<S, F = Response> = Result<S, ServerError<F>>;

impl<R: IntoResponse> IntoResponse for ServerError<R> {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = ?self.0, "Request Error");

        // Check if we're in development mode and this is a 500 error
        let is_dev_mode = std::env::var("DEVELOPMENT_MODE")
            .map(|v| v == "1")
            .unwrap_or(false);

        if is_dev_mode {
            let temp_response = self.1.into_response();
            if temp_response.status() == StatusCode::INTERNAL_SERVER_ERROR {
                let error_text = maud::html! { (format!("{:?}", self.0)) }.into_string();

                let error_html = format!(
                    r#"<!DOCTYPE html>
<html>
<head>
    <title>Development Error - 500</title>
    <style>
        body {{ font-family: monospace; margin: 20px; background: #1a1a1a; color: #fff; }}
        .error-container {{ background: #2d2d2d; padding: 20px; border-radius: 8px; }}
        .error-title {{ color: #ff6b6b; font-size: 24px; margin-bottom: 20px; }}
        .error-details {{ background: #000; padding: 15px; border-radius: 4px; overflow-x: auto; }}
        pre {{ margin: 0; white-space: pre-wrap; word-wrap: break-word; }}
    </style>
</head>
<body>
    <div class="error-container">
        <div class="error-title">Development Mode - Internal Server Error</div>
        <div class="error-details">
            <pre>{}</pre>
        </div>
    </div>
</body>
</html>"#,
                    error_text
                );

                return (StatusCode::INTERNAL_SERVER_ERROR, Html(error_html)).into_response();
            }
            return temp_response;
        }

        self.1.into_response()
    }
}

impl<E> From<E> for ServerError<StatusCode>
where
    E: Into<color_eyre::Report>,
{
    fn from(err: E) -> Self {
        ServerError(err.into(), StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError<StatusCode>>;
}

impl<T, E: Into<color_eyre::Report>> WithStatus<T> for Result<T, E> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError<StatusCode>> {
        self.map_err(|err| ServerError(err.into(), status))
    }
}

pub(crate) trait WithRedirect<T> {
    fn with_redirect(self, redirect: Redirect) -> Result<T, ServerError<Redirect>>;
}

impl<T, E: Into<color_eyre::Report>> WithRedirect<T> for Result<T, E> {
    fn with_redirect(self, redirect: Redirect) -> Result<T, ServerError<Redirect>> {
        self.map_err(|err| ServerError(err.into(), redirect))
    }
}

/// Which unique field a registration or profile edit collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Email,
    Username,
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateField::Email => f.write_str("email"),
            DuplicateField::Username => f.write_str("username"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no account with that username")]
    NotFound,
    #[error("password does not match")]
    BadCredential,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("an account with that {0} already exists")]
    Duplicate(DuplicateField),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("account {requester} may not modify {target}")]
    Permission {
        requester: AccountId,
        target: String,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("post {0} was changed by someone else")]
    Conflict(PostId),
    #[error("{0}")]
    Validation(String),
    #[error("failed to store uploaded file")]
    Upload(#[source] std::io::Error),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub(crate) fn account_not_found(id: AccountId) -> Self {
        AppError::NotFound {
            entity: "account",
            id: id.0,
        }
    }

    pub(crate) fn post_not_found(id: PostId) -> Self {
        AppError::NotFound {
            entity: "post",
            id: id.0,
        }
    }

    /// Store or filesystem failures where the mutation didn't happen and the user can try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Store(_) | AppError::Upload(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Duplicate(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Permission { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(err) if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upload(_) | AppError::Password(_) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to the person whose request failed.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Duplicate(field) => format!("An account with that {} already exists!", field),
            AppError::Auth(_) => "Wrong username or password - try again!".to_string(),
            AppError::Permission { .. } => "You aren't authorized to do that!".to_string(),
            AppError::NotFound { entity, .. } => format!("That {} doesn't exist!", entity),
            AppError::Conflict(_) => {
                "This post was changed while you were editing it. Review the latest version and try again.".to_string()
            }
            AppError::Validation(message) => message.clone(),
            AppError::Upload(_) | AppError::Password(_) | AppError::Store(_) => {
                "Whoops! There was a problem, please try again...".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_share_one_message() {
        assert_eq!(
            AppError::Auth(AuthError::NotFound).user_message(),
            AppError::Auth(AuthError::BadCredential).user_message()
        );
    }

    #[test]
    fn test_statuses() {
        assert_eq!(
            AppError::Duplicate(DuplicateField::Email).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Permission {
                requester: AccountId(1),
                target: "post 2".to_string()
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Store(StoreError::Unavailable(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(AppError::Store(StoreError::Unavailable(sqlx::Error::PoolClosed)).is_transient());
        assert!(!AppError::Validation("Title is required".to_string()).is_transient());
    }
}
