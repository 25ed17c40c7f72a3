use maud::{html, Markup, Render};

use crate::accounts::Account;

/// An account's profile picture, or its initial when there isn't one
pub struct Avatar {
    pub src: Option<String>,
    pub alt: String,
    pub size: String,
}

impl Avatar {
    pub fn for_account(account: &Account) -> Self {
        Self {
            src: account
                .profile_pic
                .as_ref()
                .map(|name| format!("/uploads/{}", name)),
            alt: account.name.clone(),
            size: "w-12 h-12".to_string(),
        }
    }

    pub fn size(mut self, size: &str) -> Self {
        self.size = size.to_string();
        self
    }

    fn initial(&self) -> String {
        self.alt
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }
}

impl Render for Avatar {
    fn render(&self) -> Markup {
        html! {
            div class={"rounded-full overflow-hidden border-4 border-white shadow-lg " (self.size)} {
                @if let Some(src) = &self.src {
                    img src=(src) alt=(self.alt) class="w-full h-full object-cover" {}
                } @else {
                    div class="bg-gradient-to-br from-blue-300 to-indigo-300 w-full h-full flex items-center justify-center text-white font-bold" {
                        (self.initial())
                    }
                }
            }
        }
    }
}
