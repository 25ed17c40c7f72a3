use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::{NaiveDate, Utc};
use maud::{html, Markup, Render};
use serde::Serialize;

use super::{form_failure, rejected_form, PageContext};
use crate::{
    accounts::PasswordCheck,
    components::{
        form::{Form as HtmlForm, InputField},
        layout::{Card, ContentSection},
        ui::{button::Button, heading::Heading},
    },
    errors::ServerResult,
    forms::{FormErrors, NamerForm, PasswordForm},
    state::AppState,
};

/// A card holding a single message
pub(crate) fn message_card(message: &str) -> Markup {
    Card::new(ContentSection::new(html! {
        p class="text-lg text-gray-700" { (message) }
        div class="mt-4" { (Button::secondary("Back to Home").href("/")) }
    }))
    .with_max_width("max-w-lg")
    .render()
}

pub(super) async fn index(ctx: PageContext, State(state): State<AppState>) -> impl IntoResponse {
    let greeting = match &ctx.account {
        Some(account) => format!("Welcome back, {}!", account.name),
        None => "Welcome to Quill!".to_string(),
    };

    let content = Card::new(ContentSection::new(html! {
        (Heading::h1(&greeting))
        p class="text-gray-600 mb-6" { "Write posts, keep a profile, find what others wrote." }

        div class="flex flex-wrap gap-3" {
            (Button::primary("Read the Blog").href("/posts"))
            @if ctx.account.is_some() {
                (Button::secondary("Write a Post").href("/add_post"))
            } @else {
                (Button::secondary("Create an Account").href("/user/add"))
            }
        }

        p class="mt-8 text-xs text-gray-400" { "Version " (state.version()) }
    }))
    .with_max_width("max-w-2xl");

    ctx.page("Home", content)
}

pub(super) async fn greet_user(ctx: PageContext, Path(name): Path<String>) -> impl IntoResponse {
    let content = Card::new(ContentSection::new(html! {
        (Heading::h1(&format!("Hello {}!", name)))
    }));

    ctx.page("Hello", content)
}

fn name_form(values: &NamerForm, errors: &FormErrors, greeted: Option<&str>) -> Markup {
    Card::new(ContentSection::new(html! {
        @if let Some(name) = greeted {
            (Heading::h1(&format!("Hello {}!!", name)))
        } @else {
            (Heading::h1("What's Your Name?"))
        }

        (HtmlForm::post("/name", html! {
            (InputField::new("name").label("What's your Name").value(&values.name).errors(errors))
            (Button::primary("Submit").submit())
        }))
    }))
    .render()
}

pub(super) async fn name_page(ctx: PageContext) -> impl IntoResponse {
    ctx.page("Name", name_form(&NamerForm::default(), &FormErrors::default(), None))
}

pub(super) async fn submit_name(ctx: PageContext, Form(form): Form<NamerForm>) -> Response {
    match form.validate() {
        Ok(name) => {
            ctx.flash("Form Submitted Successfully!");
            let content = name_form(&NamerForm::default(), &FormErrors::default(), Some(&name));
            ctx.page("Name", content).into_response()
        }
        Err(errors) => rejected_form(
            &ctx,
            StatusCode::UNPROCESSABLE_ENTITY,
            None,
            "Name",
            name_form(&form, &errors, None),
        ),
    }
}

#[derive(Debug, Serialize)]
pub(super) struct Today {
    #[serde(rename = "Date")]
    date: NaiveDate,
}

pub(super) async fn today() -> Json<Today> {
    Json(Today {
        date: Utc::now().date_naive(),
    })
}

fn password_form(values: &PasswordForm, errors: &FormErrors, check: Option<&PasswordCheck>) -> Markup {
    Card::new(ContentSection::new(html! {
        (Heading::h1("Test Password"))

        @match check {
            Some(PasswordCheck::Matches(account)) => {
                p class="mb-4 text-green-700" { "Password Correct for " (account.email) "!" }
            }
            Some(PasswordCheck::Mismatch(account)) => {
                p class="mb-4 text-red-700" { "Password Incorrect for " (account.email) "!" }
            }
            Some(PasswordCheck::UnknownEmail) => {
                p class="mb-4 text-red-700" { "No account uses that email." }
            }
            None => {}
        }

        (HtmlForm::post("/test_pw", html! {
            (InputField::new("email").label("What's your Email").value(&values.email).errors(errors))
            (InputField::new("password").label("What's your Password").input_type("password").errors(errors))
            (Button::primary("Submit").submit())
        }))
    }))
    .render()
}

pub(super) async fn password_page(ctx: PageContext) -> impl IntoResponse {
    ctx.page(
        "Test Password",
        password_form(&PasswordForm::default(), &FormErrors::default(), None),
    )
}

pub(super) async fn check_password(
    ctx: PageContext,
    State(state): State<AppState>,
    Form(form): Form<PasswordForm>,
) -> ServerResult<Response, StatusCode> {
    if let Err(errors) = form.validate() {
        return Ok(rejected_form(
            &ctx,
            StatusCode::UNPROCESSABLE_ENTITY,
            None,
            "Test Password",
            password_form(&form, &errors, None),
        ));
    }

    let values = PasswordForm {
        password: String::new(),
        ..form.clone()
    };

    match state.accounts.check_password(form.email.trim(), &form.password).await {
        Ok(check) => Ok(ctx
            .page(
                "Test Password",
                password_form(&values, &FormErrors::default(), Some(&check)),
            )
            .into_response()),
        Err(err) => {
            let (status, message) = form_failure(err)?;
            Ok(rejected_form(
                &ctx,
                status,
                Some(message),
                "Test Password",
                password_form(&values, &FormErrors::default(), None),
            ))
        }
    }
}

pub(super) async fn not_found(ctx: PageContext) -> Response {
    (
        StatusCode::NOT_FOUND,
        ctx.page("Page Not Found", message_card("Page Not Found - Try Again...")),
    )
        .into_response()
}
