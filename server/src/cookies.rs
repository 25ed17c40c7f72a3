use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse as _, Response},
};
use tracing::{error, warn};

pub use tower_cookies::Cookie;

use crate::state::AppState;

/// Private cookie holding the messages shown on the next rendered page
pub const FLASH_COOKIE_NAME: &str = "quill_flash";

/// Private (encrypted and signed) cookies for this app
pub struct CookieJar {
    cookies: tower_cookies::Cookies,
    state: AppState,
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CookieJar {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = match tower_cookies::Cookies::from_request_parts(parts, state).await {
            Ok(cookies) => cookies,
            Err(_) => {
                error!("Failed to extract cookies from request");
                return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
            }
        };

        Ok(CookieJar {
            cookies,
            state: state.clone(),
        })
    }
}

impl CookieJar {
    pub fn add(&self, cookie: Cookie<'static>) {
        self.cookies.private(&self.state.cookie_key).add(cookie);
    }

    pub fn get(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies.private(&self.state.cookie_key).get(name)
    }

    pub fn remove(&self, cookie: Cookie<'static>) {
        self.cookies.private(&self.state.cookie_key).remove(cookie);
    }

    /// A cookie scoped to the whole site, `Secure` when served over https
    pub fn site_cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.state.config.secure_cookies());
        cookie
    }

    /// Queue a message for the next page this browser renders
    pub fn flash(&self, message: impl Into<String>) {
        let mut messages = self.peek_flashes();
        messages.push(message.into());

        match serde_json::to_string(&messages) {
            Ok(value) => self.add(self.site_cookie(FLASH_COOKIE_NAME, value)),
            Err(err) => error!("Failed to encode flash messages: {:?}", err),
        }
    }

    /// Take every queued message, clearing the cookie
    pub fn take_flashes(&self) -> Vec<String> {
        let messages = self.peek_flashes();
        if !messages.is_empty() {
            self.remove(self.site_cookie(FLASH_COOKIE_NAME, String::new()));
        }
        messages
    }

    fn peek_flashes(&self) -> Vec<String> {
        let Some(cookie) = self.get(FLASH_COOKIE_NAME) else {
            return vec![];
        };

        serde_json::from_str(cookie.value()).unwrap_or_else(|err| {
            warn!("Discarding unreadable flash cookie: {:?}", err);
            vec![]
        })
    }
}
