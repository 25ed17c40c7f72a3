use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use color_eyre::eyre::WrapErr as _;
use maud::{html, Markup, Render};
use tracing::{info, warn};

use super::{form_failure, rejected_form, PageContext};
use crate::{
    accounts::{Account, AccountId},
    auth::{self, AuthUser, SuperUser},
    components::{
        form::{Form as HtmlForm, InputField, TextArea},
        layout::{Card, ContentSection},
        post::PostCard,
        ui::{avatar::Avatar, button::Button, heading::Heading},
    },
    errors::{AppError, ServerResult, WithRedirect as _, WithStatus as _},
    forms::{FormErrors, LoginForm, ProfileForm, UserForm},
    posts::{PostListing, PostOrder},
    state::AppState,
};

fn account_table(accounts: &[Account]) -> Markup {
    html! {
        table class="w-full text-sm text-left mt-4" {
            thead class="text-gray-500 border-b" {
                tr { th { "Id" } th { "Username" } th { "Name" } th { "Email" } th { "Favorite Color" } }
            }
            tbody {
                @for account in accounts {
                    tr class="border-b border-gray-100" {
                        td { (account.id) }
                        td { (account.username) }
                        td { (account.name) }
                        td { (account.email) }
                        td { (account.favorite_color.as_deref().unwrap_or("")) }
                    }
                }
            }
        }
    }
}

fn register_form(values: &UserForm, errors: &FormErrors, accounts: &[Account]) -> Markup {
    Card::new(ContentSection::new(html! {
        (Heading::h1("Add User"))

        (HtmlForm::post("/user/add", html! {
            (InputField::new("name").label("Name").value(&values.name).required(true).errors(errors))
            (InputField::new("username").label("Username").value(&values.username).required(true).errors(errors))
            (InputField::new("email").label("Email").input_type("email").value(&values.email).required(true).errors(errors))
            (InputField::new("favorite_color").label("Favorite Color").value(&values.favorite_color))
            (TextArea::new("about_author").label("About Author").value(&values.about_author))
            (InputField::new("password").label("Password").input_type("password").required(true).errors(errors))
            (InputField::new("password_confirm").label("Confirm Password").input_type("password").errors(errors))
            (Button::primary("Submit").submit())
        }))

        @if !accounts.is_empty() {
            div class="mt-8" {
                (Heading::h2("Users"))
                (account_table(accounts))
            }
        }
    }))
    .with_max_width("max-w-3xl")
    .render()
}

pub(super) async fn register_page(
    ctx: PageContext,
    State(state): State<AppState>,
) -> ServerResult<Response, StatusCode> {
    let accounts = state.accounts.list().await?;

    Ok(ctx
        .page(
            "Add User",
            register_form(&UserForm::default(), &FormErrors::default(), &accounts),
        )
        .into_response())
}

pub(super) async fn register(
    ctx: PageContext,
    State(state): State<AppState>,
    Form(form): Form<UserForm>,
) -> ServerResult<Response, StatusCode> {
    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => {
            let accounts = state.accounts.list().await?;
            return Ok(rejected_form(
                &ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                "Add User",
                register_form(&form.without_passwords(), &errors, &accounts),
            ));
        }
    };

    match state.accounts.register(registration).await {
        Ok(account) => Ok(ctx.redirect_with(
            format!("User {} Added Successfully!", account.username),
            "/user/add",
        )),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let accounts = state.accounts.list().await.unwrap_or_default();
            Ok(rejected_form(
                &ctx,
                status,
                Some(message),
                "Add User",
                register_form(&form.without_passwords(), &FormErrors::default(), &accounts),
            ))
        }
    }
}

fn login_form(values: &LoginForm, errors: &FormErrors) -> Markup {
    Card::new(ContentSection::new(html! {
        (Heading::h1("Login"))

        (HtmlForm::post("/login", html! {
            (InputField::new("username").label("Username").value(&values.username).required(true).errors(errors))
            (InputField::new("password").label("Password").input_type("password").required(true).errors(errors))
            (Button::primary("Login").submit().full_width(true))
        }))

        p class="mt-6 text-sm text-gray-600 text-center" {
            "No account yet? "
            a href="/user/add" class="text-indigo-600 hover:underline" { "Register" }
        }
    }))
    .render()
}

pub(super) async fn login_page(ctx: PageContext) -> impl IntoResponse {
    ctx.page("Login", login_form(&LoginForm::default(), &FormErrors::default()))
}

pub(super) async fn login(
    ctx: PageContext,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ServerResult<Response, StatusCode> {
    if let Err(errors) = form.validate() {
        return Ok(rejected_form(
            &ctx,
            StatusCode::UNPROCESSABLE_ENTITY,
            None,
            "Login",
            login_form(&form, &errors),
        ));
    }

    match state
        .accounts
        .authenticate(form.username.trim(), &form.password)
        .await
    {
        Ok((_, session)) => {
            auth::set_session_cookie(&state, ctx.cookies(), &session);
            Ok(ctx.redirect_with("Login Successful!!", "/dashboard"))
        }
        Err(err) => {
            let (status, message) = form_failure(err)?;
            Ok(rejected_form(
                &ctx,
                status,
                Some(message),
                "Login",
                login_form(&form, &FormErrors::default()),
            ))
        }
    }
}

pub(super) async fn logout(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
) -> ServerResult<Response, Redirect> {
    auth::end_session(&state, ctx.cookies())
        .await
        .wrap_err("Failed to end session")
        .with_redirect(Redirect::to("/"))?;

    info!("Account {} logged out", account.id);
    Ok(ctx.redirect_with(
        "You Have Been Logged Out! Thanks For Stopping By...",
        "/login",
    ))
}

fn profile_values(account: &Account) -> ProfileForm {
    ProfileForm {
        name: account.name.clone(),
        username: account.username.clone(),
        email: account.email.clone(),
        favorite_color: account.favorite_color.clone().unwrap_or_default(),
        about_author: account.about_author.clone().unwrap_or_default(),
    }
}

fn dashboard_view(
    account: &Account,
    values: &ProfileForm,
    errors: &FormErrors,
    posts: &PostListing,
) -> Markup {
    Card::new(ContentSection::new(html! {
        div class="flex items-center gap-4 mb-6" {
            (Avatar::for_account(account).size("w-20 h-20"))
            div {
                (Heading::h1("Dashboard").with_classes("mb-0"))
                p class="text-gray-600" { "Member since " (account.date_added.format("%Y-%m-%d")) }
            }
        }

        dl class="grid grid-cols-3 gap-2 text-sm mb-6" {
            dt class="font-medium text-gray-500" { "Name" } dd class="col-span-2" { (account.name) }
            dt class="font-medium text-gray-500" { "Username" } dd class="col-span-2" { (account.username) }
            dt class="font-medium text-gray-500" { "User Id" } dd class="col-span-2" { (account.id) }
            dt class="font-medium text-gray-500" { "Email" } dd class="col-span-2" { (account.email) }
            dt class="font-medium text-gray-500" { "Favorite Color" }
            dd class="col-span-2" { (account.favorite_color.as_deref().unwrap_or("")) }
            dt class="font-medium text-gray-500" { "About Author" }
            dd class="col-span-2" { (account.about_author.as_deref().unwrap_or("")) }
        }

        (Heading::h2("Update Profile"))
        (HtmlForm::post("/dashboard", html! {
            (InputField::new("name").label("Name").value(&values.name).required(true).errors(errors))
            (InputField::new("username").label("Username").value(&values.username).required(true).errors(errors))
            (InputField::new("email").label("Email").input_type("email").value(&values.email).required(true).errors(errors))
            (InputField::new("favorite_color").label("Favorite Color").value(&values.favorite_color))
            (TextArea::new("about_author").label("About Author").value(&values.about_author))
            (InputField::new("profile_pic").label("Profile Picture").input_type("file"))
            div class="flex flex-wrap gap-3" {
                (Button::primary("Update").submit())
                (Button::danger("Delete Account").href(&format!("/delete_user/{}", account.id)))
            }
        }).multipart())

        div class="mt-8 space-y-4" {
            (Heading::h2("Your Posts"))
            @if posts.is_empty() {
                p class="text-gray-500" { "You haven't written anything yet." }
            }
            @for post in posts {
                (PostCard::summary(post).can_modify(true))
            }
        }
    }))
    .with_max_width("max-w-3xl")
    .render()
}

pub(super) async fn dashboard(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
) -> ServerResult<Response, StatusCode> {
    let posts = state.posts.posts_by_author(account.id).await?;

    Ok(ctx
        .page(
            "Dashboard",
            dashboard_view(&account, &profile_values(&account), &FormErrors::default(), &posts),
        )
        .into_response())
}

/// A file chosen in the dashboard's picture input
struct ProfilePicture {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_dashboard_form(
    mut multipart: Multipart,
) -> color_eyre::Result<(ProfileForm, Option<ProfilePicture>)> {
    let mut form = ProfileForm::default();
    let mut picture = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "profile_pic" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;

            if !file_name.is_empty() && !bytes.is_empty() {
                picture = Some(ProfilePicture {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            form.set(&name, field.text().await?);
        }
    }

    Ok((form, picture))
}

pub(super) async fn update_dashboard(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ServerResult<Response, StatusCode> {
    let (form, picture) = read_dashboard_form(multipart)
        .await
        .wrap_err("Failed to read dashboard form")
        .with_status(StatusCode::BAD_REQUEST)?;

    let changes = match form.validate() {
        Ok(changes) => changes,
        Err(errors) => {
            let posts = state.posts.posts_by_author(account.id).await?;
            return Ok(rejected_form(
                &ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                "Dashboard",
                dashboard_view(&account, &form, &errors, &posts),
            ));
        }
    };

    let updated = match state.accounts.update_profile(account.id, changes).await {
        Ok(updated) => updated,
        Err(err) => {
            let (status, message) = form_failure(err)?;
            let current = state.accounts.get(account.id).await.unwrap_or(account);
            return Ok(redisplay_dashboard(&ctx, &state, &current, &form, status, message).await);
        }
    };

    // The profile is already committed at this point, so a failed upload must not read as
    // a failed update
    if let Some(picture) = &picture {
        if let Err(err) = state
            .accounts
            .upload_profile_picture(updated.id, &picture.bytes, &picture.file_name)
            .await
        {
            let (status, _) = form_failure(err)?;
            let current = state.accounts.get(updated.id).await.unwrap_or(updated);
            return Ok(redisplay_dashboard(
                &ctx,
                &state,
                &current,
                &form,
                status,
                PICTURE_NOT_SAVED.to_string(),
            )
            .await);
        }
    }

    Ok(ctx.redirect_with("User Updated Successfully!", "/dashboard"))
}

const PICTURE_NOT_SAVED: &str =
    "Your profile was updated, but the picture could not be saved. Please try uploading it again...";

async fn redisplay_dashboard(
    ctx: &PageContext,
    state: &AppState,
    account: &Account,
    form: &ProfileForm,
    status: StatusCode,
    message: String,
) -> Response {
    let posts = state
        .posts
        .posts_by_author(account.id)
        .await
        .unwrap_or_default();

    rejected_form(
        ctx,
        status,
        Some(message),
        "Dashboard",
        dashboard_view(account, form, &FormErrors::default(), &posts),
    )
}

pub(super) async fn delete_user(
    AuthUser { account, .. }: AuthUser,
    ctx: PageContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServerResult<Response, StatusCode> {
    let target = AccountId(id);

    match state.accounts.delete_account(target, account.id).await {
        Ok(()) => {
            auth::end_session(&state, ctx.cookies())
                .await
                .wrap_err("Failed to end session of deleted account")?;
            Ok(ctx.redirect_with("User Deleted Successfully!!", "/user/add"))
        }
        Err(err @ AppError::Permission { .. }) => {
            warn!("{}", err);
            Ok(ctx.redirect_with("Sorry, you can't delete that user!", "/dashboard"))
        }
        Err(err) => {
            let (_, message) = form_failure(err)?;
            Ok(ctx.redirect_with(message, "/dashboard"))
        }
    }
}

pub(super) async fn admin(
    SuperUser { account }: SuperUser,
    ctx: PageContext,
    State(state): State<AppState>,
) -> ServerResult<Response, StatusCode> {
    let accounts = state.accounts.list().await?;
    let posts = state.posts.list_posts(PostOrder::newest_first()).await?;

    let content = Card::new(ContentSection::new(html! {
        (Heading::h1("Admin Area"))
        p class="text-gray-600" {
            "Hello, " (account.name) "! You can edit or delete any post."
        }
        p class="mt-2 text-sm text-gray-500" {
            (accounts.len()) " accounts, " (posts.len()) " posts"
        }
        (account_table(&accounts))
    }))
    .with_max_width("max-w-4xl");

    Ok(ctx.page("Admin", content).into_response())
}
