use maud::{html, Markup, Render};

/// A one-off message carried over from the previous request
pub struct Flash<'a> {
    pub message: &'a str,
}

impl<'a> Flash<'a> {
    pub fn new(message: &'a str) -> Self {
        Self { message }
    }
}

impl Render for Flash<'_> {
    fn render(&self) -> Markup {
        html! {
            div class="flex items-start justify-between gap-4 px-4 py-3 rounded-lg border border-yellow-200 bg-yellow-50 text-yellow-900" role="alert" {
                span { (self.message) }
            }
        }
    }
}
