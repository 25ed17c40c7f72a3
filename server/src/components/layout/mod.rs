use maud::{html, Markup, Render, DOCTYPE};

use super::ui::{flash::Flash, nav::NavBar};

pub struct Page {
    pub title: String,
    pub nav: NavBar,
    pub flashes: Vec<String>,
    pub content: Box<dyn Render>,
}

impl Page {
    pub fn new(title: impl Into<String>, nav: NavBar, content: impl Render + 'static) -> Self {
        Self {
            title: title.into(),
            nav,
            flashes: vec![],
            content: Box::new(content),
        }
    }

    pub fn with_flashes(mut self, flashes: Vec<String>) -> Self {
        self.flashes = flashes;
        self
    }
}

impl Render for Page {
    fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) " - Quill" }
                    script src="https://unpkg.com/@tailwindcss/browser@4" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                }

                body class="min-h-screen bg-gray-50" {
                    (self.nav)

                    main class="py-4 md:py-8 px-0 sm:px-4 md:px-6 lg:px-8" {
                        @if !self.flashes.is_empty() {
                            div class="max-w-3xl mx-auto mb-4 space-y-2" {
                                @for message in &self.flashes {
                                    (Flash::new(message))
                                }
                            }
                        }

                        (self.content.render())
                    }
                }
            }
        }
    }
}

impl axum::response::IntoResponse for Page {
    fn into_response(self) -> axum::response::Response {
        self.render().into_response()
    }
}

pub struct Card {
    pub content: Box<dyn Render>,
    pub max_width: Option<String>,
}

impl Card {
    pub fn new(content: impl Render + 'static) -> Self {
        Self {
            content: Box::new(content),
            max_width: None,
        }
    }

    pub fn with_max_width(mut self, max_width: &str) -> Self {
        self.max_width = Some(max_width.to_string());
        self
    }
}

impl Render for Card {
    fn render(&self) -> Markup {
        let width_class = self.max_width.as_deref().unwrap_or("max-w-md");

        html! {
            div class={(width_class) " mx-auto bg-white rounded-lg sm:rounded-xl border border-gray-100 shadow-md overflow-hidden w-full"} {
                (self.content.render())
            }
        }
    }
}

/// Padded block inside a card
pub struct ContentSection {
    pub content: Box<dyn Render>,
}

impl ContentSection {
    pub fn new(content: impl Render + 'static) -> Self {
        Self {
            content: Box::new(content),
        }
    }
}

impl Render for ContentSection {
    fn render(&self) -> Markup {
        html! {
            div class="px-8 py-6" {
                (self.content.render())
            }
        }
    }
}
