use std::net::SocketAddr;

use axum::{
    async_trait,
    body::Body,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{request::Parts, Request, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use maud::Render;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tracing::{error, info};

use crate::{
    accounts::{Account, AccountId},
    auth::OptionalUser,
    components::{layout::Page, ui::nav::NavBar},
    cookies::CookieJar,
    errors::AppError,
    state::AppState,
};

mod accounts;
mod pages;
mod posts;

/// Largest dashboard submission accepted, profile picture included
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/user/:name", get(pages::greet_user))
        .route("/name", get(pages::name_page).post(pages::submit_name))
        .route("/date", get(pages::today))
        .route("/test_pw", get(pages::password_page).post(pages::check_password))
        // Accounts
        .route(
            "/user/add",
            get(accounts::register_page).post(accounts::register),
        )
        .route("/login", get(accounts::login_page).post(accounts::login))
        .route("/logout", get(accounts::logout).post(accounts::logout))
        .route(
            "/dashboard",
            get(accounts::dashboard)
                .post(accounts::update_dashboard)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/delete_user/:id", get(accounts::delete_user))
        .route("/admin", get(accounts::admin))
        // Posts
        .route("/add_post", get(posts::new_post_page).post(posts::create_post))
        .route("/posts", get(posts::list_posts))
        .route("/blog_posts", get(posts::list_posts))
        .route("/posts/:id", get(posts::show_post))
        .route(
            "/posts/edit/:id",
            get(posts::edit_post_page).post(posts::edit_post),
        )
        .route("/delete_post/:id", get(posts::delete_post))
        .route("/search", axum::routing::post(posts::search))
        // Uploaded profile pictures
        .route("/uploads/:file", get(crate::uploads::serve_upload))
        .fallback(pages::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(sentry_tower::NewSentryLayer::<Request<Body>>::new_from_top())
                .layer(sentry_tower::SentryHttpLayer::with_transaction())
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new()),
        )
        .with_state(app_state)
}

pub async fn run_server(router: Router, port: u16) -> crate::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!("Listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}

/// Who is asking, plus the cookie jar that carries flash messages.
///
/// Flashes are only taken from the cookie when a page is rendered, so handlers that end up
/// redirecting pass them on to the next page.
pub(crate) struct PageContext {
    pub account: Option<Account>,
    is_super_user: bool,
    cookies: CookieJar,
}

#[async_trait]
impl FromRequestParts<AppState> for PageContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let OptionalUser { account } = OptionalUser::from_request_parts(parts, state).await?;
        let cookies = CookieJar::from_request_parts(parts, state).await?;

        Ok(PageContext {
            is_super_user: account
                .as_ref()
                .is_some_and(|account| state.posts.is_super_user(account.id)),
            account,
            cookies,
        })
    }
}

impl PageContext {
    pub fn account_id(&self) -> Option<AccountId> {
        self.account.as_ref().map(|account| account.id)
    }

    pub fn flash(&self, message: impl Into<String>) {
        self.cookies.flash(message);
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn page(&self, title: &str, content: impl Render + 'static) -> Page {
        Page::new(
            title,
            NavBar::new(self.account.clone(), self.is_super_user),
            content,
        )
        .with_flashes(self.cookies.take_flashes())
    }

    /// Flash a message and send the browser elsewhere
    pub fn redirect_with(&self, message: impl Into<String>, to: &str) -> Response {
        self.flash(message);
        Redirect::to(to).into_response()
    }

    /// Render `err` as a page with its status code
    pub fn error_page(&self, err: &AppError) -> Response {
        if err.status().is_server_error() {
            error!("Request failed: {:?}", err);
        }

        let content = pages::message_card(&err.user_message());
        (err.status(), self.page("Whoops", content)).into_response()
    }
}

/// The form was rejected. Show `message` above the redisplayed form with `status`.
pub(crate) fn rejected_form(
    ctx: &PageContext,
    status: StatusCode,
    message: Option<String>,
    title: &str,
    form: impl Render + 'static,
) -> Response {
    if let Some(message) = message {
        ctx.flash(message);
    }

    (status, ctx.page(title, form)).into_response()
}

/// Splits a failed mutation into the message for the redisplayed form, or an unexpected error.
///
/// Store and upload failures become a "try again" message since the change didn't happen.
pub(crate) fn form_failure(err: AppError) -> Result<(StatusCode, String), AppError> {
    match err {
        AppError::Password(_) => Err(err),
        err => {
            if err.is_transient() || err.status().is_server_error() {
                error!("Mutation failed, asking the user to retry: {:?}", err);
            }
            Ok((err.status(), err.user_message()))
        }
    }
}
