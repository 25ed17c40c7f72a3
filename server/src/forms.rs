//! Typed request forms and their validation.
//!
//! Every form deserializes leniently (missing fields become empty strings) so that a bad
//! submission can be shown again with its errors instead of being rejected by the extractor.

use serde::Deserialize;

use crate::accounts::{ProfileChanges, Registration};
use crate::posts::{PostChanges, PostDraft};

const REQUIRED: &str = "This field is required.";

/// Validation messages keyed by form field name
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(Vec<(&'static str, String)>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, REQUIRED);
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub favorite_color: String,
    pub about_author: String,
}

impl UserForm {
    pub fn validate(&self) -> Result<Registration, FormErrors> {
        let mut errors = FormErrors::default();
        errors.require("name", &self.name);
        errors.require("username", &self.username);
        errors.require("email", &self.email);
        errors.require("password", &self.password);
        errors.require("password_confirm", &self.password_confirm);

        if !self.password.is_empty() && self.password != self.password_confirm {
            errors.add("password", "Passwords Must Match!");
        }

        errors.finish(|| Registration {
            username: self.username.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            favorite_color: optional(&self.favorite_color),
            about_author: optional(&self.about_author),
        })
    }

    /// The submitted values minus the passwords, for redisplaying the form
    pub fn without_passwords(&self) -> Self {
        Self {
            password: String::new(),
            password_confirm: String::new(),
            ..self.clone()
        }
    }
}

/// The profile half of the dashboard form
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub favorite_color: String,
    pub about_author: String,
}

impl ProfileForm {
    /// Sets one field from its multipart name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = value,
            "username" => self.username = value,
            "email" => self.email = value,
            "favorite_color" => self.favorite_color = value,
            "about_author" => self.about_author = value,
            _ => {}
        }
    }

    pub fn validate(&self) -> Result<ProfileChanges, FormErrors> {
        let mut errors = FormErrors::default();
        errors.require("name", &self.name);
        errors.require("username", &self.username);
        errors.require("email", &self.email);

        errors.finish(|| ProfileChanges {
            name: Some(self.name.trim().to_string()),
            username: Some(self.username.trim().to_string()),
            email: Some(self.email.trim().to_string()),
            favorite_color: Some(optional(&self.favorite_color)),
            about_author: Some(optional(&self.about_author)),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.require("username", &self.username);
        errors.require("password", &self.password);
        errors.finish(|| ())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub slug: String,
    /// Version of the post the edit form was rendered from
    pub version: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<PostDraft, FormErrors> {
        let mut errors = FormErrors::default();
        errors.require("title", &self.title);
        errors.require("content", &self.content);
        errors.require("slug", &self.slug);

        errors.finish(|| PostDraft {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            slug: self.slug.trim().to_string(),
        })
    }

    pub fn validate_changes(&self) -> Result<PostChanges, FormErrors> {
        let draft = self.validate()?;

        Ok(PostChanges {
            title: Some(draft.title),
            content: Some(draft.content),
            slug: Some(draft.slug),
            expected_version: self.version.trim().parse().ok(),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub searched: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct NamerForm {
    pub name: String,
}

impl NamerForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        errors.require("name", &self.name);
        errors.finish(|| self.name.trim().to_string())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordForm {
    pub email: String,
    pub password: String,
}

impl PasswordForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        errors.require("email", &self.email);
        errors.require("password", &self.password);
        errors.finish(|| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_form() -> UserForm {
        UserForm {
            name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical".to_string(),
            password_confirm: "analytical".to_string(),
            favorite_color: "".to_string(),
            about_author: "  First programmer  ".to_string(),
        }
    }

    #[test]
    fn test_registration_trims_and_drops_blank_optionals() {
        let registration = user_form().validate().unwrap();

        assert_eq!(registration.username, "ada");
        assert_eq!(registration.favorite_color, None);
        assert_eq!(registration.about_author.as_deref(), Some("First programmer"));
    }

    #[test]
    fn test_registration_requires_matching_passwords() {
        let form = UserForm {
            password_confirm: "engine".to_string(),
            ..user_form()
        };

        let errors = form.validate().err().unwrap();
        assert_eq!(errors.for_field("password"), Some("Passwords Must Match!"));
        assert_eq!(errors.for_field("name"), None);
    }

    #[test]
    fn test_registration_reports_every_missing_field() {
        let errors = UserForm::default().validate().err().unwrap();

        for field in ["name", "username", "email", "password", "password_confirm"] {
            assert_eq!(errors.for_field(field), Some(REQUIRED), "{field}");
        }
        assert_eq!(errors.for_field("favorite_color"), None);
    }

    #[test]
    fn test_redisplayed_user_form_has_no_passwords() {
        let form = user_form().without_passwords();

        assert!(form.password.is_empty());
        assert!(form.password_confirm.is_empty());
        assert_eq!(form.email, "ada@example.com");
    }

    #[test]
    fn test_profile_form_clears_blank_optionals() {
        let mut form = ProfileForm::default();
        form.set("name", "Ada".to_string());
        form.set("username", "ada".to_string());
        form.set("email", "ada@example.com".to_string());
        form.set("favorite_color", "  ".to_string());
        form.set("profile_pic", "ignored".to_string());

        let changes = form.validate().unwrap();
        assert_eq!(changes.favorite_color, Some(None));
        assert_eq!(changes.about_author, Some(None));
        assert_eq!(changes.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_post_form_carries_expected_version() {
        let form = PostForm {
            title: "Intro to X".to_string(),
            content: "<p>hello</p>".to_string(),
            slug: "intro-to-x".to_string(),
            version: "3".to_string(),
        };

        assert_eq!(form.validate_changes().unwrap().expected_version, Some(3));

        let unversioned = PostForm {
            version: "".to_string(),
            ..form
        };
        assert_eq!(unversioned.validate_changes().unwrap().expected_version, None);
    }

    #[test]
    fn test_post_form_requires_all_fields() {
        let errors = PostForm::default().validate().err().unwrap();

        assert!(errors.for_field("title").is_some());
        assert!(errors.for_field("content").is_some());
        assert!(errors.for_field("slug").is_some());
    }
}
