use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::accounts::{Account, Session};
use crate::cookies::CookieJar;
use crate::state::AppState;

/// Cookie name for storing the session ID
pub const SESSION_COOKIE_NAME: &str = "quill_session";

pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to view that page!";

/// The logged in account, or a redirect to the login page
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account: Account,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = CookieJar::from_request_parts(parts, state).await?;

        match current_account(state, &cookies).await? {
            Some((account, session)) => Ok(AuthUser { account, session }),
            None => {
                info!("No valid session, redirecting to login");
                cookies.flash(LOGIN_REQUIRED_MESSAGE);
                Err(Redirect::to("/login").into_response())
            }
        }
    }
}

/// Requires a logged in account whose id is the configured super-user
#[derive(Debug, Clone)]
pub struct SuperUser {
    pub account: Account,
}

#[async_trait]
impl FromRequestParts<AppState> for SuperUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { account, .. } = AuthUser::from_request_parts(parts, state).await?;

        if !state.posts.is_super_user(account.id) {
            warn!(
                "Account {} attempted to access admin area without super-user privileges",
                account.id
            );
            let cookies = CookieJar::from_request_parts(parts, state).await?;
            cookies.flash("Sorry, you must be the admin to access the admin page...");
            return Err(Redirect::to("/dashboard").into_response());
        }

        Ok(SuperUser { account })
    }
}

/// The logged in account if there is one
#[derive(Debug, Clone)]
pub struct OptionalUser {
    pub account: Option<Account>,
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = CookieJar::from_request_parts(parts, state).await?;

        Ok(OptionalUser {
            account: current_account(state, &cookies)
                .await?
                .map(|(account, _)| account),
        })
    }
}

async fn current_account(
    state: &AppState,
    cookies: &CookieJar,
) -> Result<Option<(Account, Session)>, Response> {
    let Some(session_id) = get_session_id_from_cookie(cookies) else {
        return Ok(None);
    };

    state
        .accounts
        .resolve_session(session_id)
        .await
        .map_err(|err| {
            error!("Error validating session {}: {:?}", session_id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

pub fn get_session_id_from_cookie(cookies: &CookieJar) -> Option<Uuid> {
    cookies
        .get(SESSION_COOKIE_NAME)
        .and_then(|cookie| cookie.value().parse::<Uuid>().ok())
}

/// Point the browser's session cookie at `session`
pub fn set_session_cookie(state: &AppState, cookies: &CookieJar, session: &Session) {
    let mut cookie = cookies.site_cookie(SESSION_COOKIE_NAME, session.session_id.to_string());
    cookie.set_max_age(Duration::days(state.config.session_duration_days));
    cookies.add(cookie);
}

/// Deactivate the browser's session, if any, and drop the cookie
pub async fn end_session(state: &AppState, cookies: &CookieJar) -> crate::Result<()> {
    if let Some(session_id) = get_session_id_from_cookie(cookies) {
        state.accounts.end_session(session_id).await?;
    }

    let mut cookie = cookies.site_cookie(SESSION_COOKIE_NAME, String::new());
    cookie.set_max_age(Duration::seconds(-1));
    cookies.remove(cookie);
    info!("Session cookie removed");

    Ok(())
}
