use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form,
};
use maud::{html, Markup, Render};

use super::{form_failure, rejected_form, PageContext};
use crate::{
    auth::AuthUser,
    components::{
        form::{Form as HtmlForm, InputField, TextArea},
        layout::{Card, ContentSection},
        post::PostCard,
        ui::{button::Button, heading::Heading},
    },
    errors::{AppError, ServerResult},
    forms::{FormErrors, PostForm, SearchForm},
    posts::{Post, PostId, PostListing, PostOrder},
    state::AppState,
};

fn post_form(action: &str, heading: &str, values: &PostForm, errors: &FormErrors) -> Markup {
    Card::new(ContentSection::new(html! {
        (Heading::h1(heading))

        (HtmlForm::post(action, html! {
            (InputField::new("title").label("Title").value(&values.title).required(true).errors(errors))
            (InputField::new("slug").label("Slug").placeholder("my-first-post").value(&values.slug).required(true).errors(errors))
            (TextArea::new("content").label("Content").rows(12).value(&values.content).errors(errors))
            (InputField::new("version").value(&values.version).hidden(true))
            (Button::primary("Submit").submit())
        }))
    }))
    .with_max_width("max-w-3xl")
    .render()
}

fn values_of(post: &Post) -> PostForm {
    PostForm {
        title: post.title.clone(),
        content: post.content.clone(),
        slug: post.slug.clone(),
        version: post.version.to_string(),
    }
}

fn listing(ctx: &PageContext, state: &AppState, posts: &PostListing) -> Markup {
    html! {
        div class="max-w-3xl mx-auto space-y-4" {
            @if posts.is_empty() {
                (Card::new(ContentSection::new(html! {
                    p class="text-gray-500" { "No posts found." }
                })).with_max_width("max-w-3xl"))
            }
            @for post in posts {
                @let can_modify = ctx.account_id().is_some_and(|id| state.posts.may_modify(post, id));
                (PostCard::summary(post).can_modify(can_modify))
            }
        }
    }
}

pub(super) async fn new_post_page(_user: AuthUser, ctx: PageContext) -> impl IntoResponse {
    ctx.page(
        "Add Post",
        post_form("/add_post", "Add Blog Post...", &PostForm::default(), &FormErrors::default()),
    )
}

pub(super) async fn create_post(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> ServerResult<Response, StatusCode> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(rejected_form(
                &ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                "Add Post",
                post_form("/add_post", "Add Blog Post...", &form, &errors),
            ))
        }
    };

    match state.posts.create_post(account.id, draft).await {
        Ok(post) => Ok(ctx.redirect_with(
            "Blog Post Submitted Successfully!",
            &format!("/posts/{}", post.id),
        )),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            Ok(rejected_form(
                &ctx,
                status,
                Some(message),
                "Add Post",
                post_form("/add_post", "Add Blog Post...", &form, &FormErrors::default()),
            ))
        }
    }
}

pub(super) async fn list_posts(
    ctx: PageContext,
    State(state): State<AppState>,
) -> ServerResult<Response, StatusCode> {
    let posts = state.posts.list_posts(PostOrder::newest_first()).await?;

    let content = html! {
        div class="max-w-3xl mx-auto mb-4" { (Heading::h1("Blog Posts")) }
        (listing(&ctx, &state, &posts))
    };

    Ok(ctx.page("Blog Posts", content).into_response())
}

pub(super) async fn show_post(
    ctx: PageContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServerResult<Response, StatusCode> {
    let post = match state.posts.get_post(PostId(id)).await {
        Ok(post) => post,
        Err(err @ AppError::NotFound { .. }) => return Ok(ctx.error_page(&err)),
        Err(err) => return Err(err.into()),
    };

    let can_modify = ctx
        .account_id()
        .is_some_and(|account_id| state.posts.may_modify(&post, account_id));

    let content = html! {
        div class="max-w-3xl mx-auto space-y-4" {
            (PostCard::full(&post).can_modify(can_modify))
            (Button::secondary("Back To Blog").href("/posts"))
        }
    };

    Ok(ctx.page(&post.title, content).into_response())
}

pub(super) async fn edit_post_page(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServerResult<Response, StatusCode> {
    let post = match state.posts.get_post(PostId(id)).await {
        Ok(post) => post,
        Err(err @ AppError::NotFound { .. }) => return Ok(ctx.error_page(&err)),
        Err(err) => return Err(err.into()),
    };

    if !state.posts.may_modify(&post, account.id) {
        return Ok(ctx.redirect_with("You Aren't Authorized To Edit This Post...", "/posts"));
    }

    let action = format!("/posts/edit/{}", post.id);
    Ok(ctx
        .page(
            "Edit Post",
            post_form(&action, "Edit Post", &values_of(&post), &FormErrors::default()),
        )
        .into_response())
}

pub(super) async fn edit_post(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> ServerResult<Response, StatusCode> {
    let id = PostId(id);
    let action = format!("/posts/edit/{}", id);

    let changes = match form.validate_changes() {
        Ok(changes) => changes,
        Err(errors) => {
            return Ok(rejected_form(
                &ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                "Edit Post",
                post_form(&action, "Edit Post", &form, &errors),
            ))
        }
    };

    match state.posts.edit_post(id, account.id, changes).await {
        Ok(post) => Ok(ctx.redirect_with("Post Has Been Updated!", &format!("/posts/{}", post.id))),
        Err(err @ AppError::Permission { .. }) => {
            Ok(ctx.redirect_with(err.user_message(), "/posts"))
        }
        Err(err @ AppError::NotFound { .. }) => Ok(ctx.error_page(&err)),
        Err(err @ AppError::Conflict(_)) => {
            // Keep what they typed, but against the latest version so resubmitting overwrites it
            let latest = state.posts.get_post(id).await?;
            let values = PostForm {
                version: latest.version.to_string(),
                ..form
            };
            Ok(rejected_form(
                &ctx,
                err.status(),
                Some(err.user_message()),
                "Edit Post",
                post_form(&action, "Edit Post", &values, &FormErrors::default()),
            ))
        }
        Err(err) => {
            let (status, message) = form_failure(err)?;
            Ok(rejected_form(
                &ctx,
                status,
                Some(message),
                "Edit Post",
                post_form(&action, "Edit Post", &form, &FormErrors::default()),
            ))
        }
    }
}

pub(super) async fn delete_post(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServerResult<Response, StatusCode> {
    match state.posts.delete_post(PostId(id), account.id).await {
        Ok(()) => Ok(ctx.redirect_with("Blog Post Was Deleted!", "/posts")),
        Err(err @ AppError::NotFound { .. }) => Ok(ctx.error_page(&err)),
        Err(err @ AppError::Permission { .. }) => {
            Ok(ctx.redirect_with(err.user_message(), "/posts"))
        }
        Err(err) => {
            let (_, message) = form_failure(err)?;
            Ok(ctx.redirect_with(message, "/posts"))
        }
    }
}

pub(super) async fn search(
    ctx: PageContext,
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> ServerResult<Response, StatusCode> {
    let searched = form.searched.trim();

    match state.posts.search(searched).await {
        Ok(posts) => {
            let content = html! {
                div class="max-w-3xl mx-auto mb-4" {
                    (Heading::h1("Search Results"))
                    p class="text-gray-600" {
                        "You searched for: " em { (searched) } " (" (posts.len()) " found)"
                    }
                }
                (listing(&ctx, &state, &posts))
            };
            Ok(ctx.page("Search", content).into_response())
        }
        Err(err @ AppError::Validation(_)) => Ok(ctx.error_page(&err)),
        Err(err) => Err(err.into()),
    }
}
