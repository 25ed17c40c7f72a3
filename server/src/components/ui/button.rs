use maud::{html, Markup, Render};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonVariant {
    Primary,
    Secondary,
    Danger,
    Link,
}

pub struct Button {
    pub text: String,
    pub href: Option<String>,
    pub variant: ButtonVariant,
    pub full_width: bool,
    pub button_type: Option<String>,
}

impl Button {
    pub fn new(text: &str, variant: ButtonVariant) -> Self {
        Self {
            text: text.to_string(),
            href: None,
            variant,
            full_width: false,
            button_type: None,
        }
    }

    pub fn primary(text: &str) -> Self {
        Self::new(text, ButtonVariant::Primary)
    }

    pub fn secondary(text: &str) -> Self {
        Self::new(text, ButtonVariant::Secondary)
    }

    pub fn danger(text: &str) -> Self {
        Self::new(text, ButtonVariant::Danger)
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn full_width(mut self, full_width: bool) -> Self {
        self.full_width = full_width;
        self
    }

    pub fn submit(mut self) -> Self {
        self.button_type = Some("submit".to_string());
        self
    }

    fn variant_classes(&self) -> &'static str {
        match self.variant {
            ButtonVariant::Primary => "bg-indigo-600 hover:bg-indigo-700 text-white shadow-sm",
            ButtonVariant::Secondary => "bg-white hover:bg-gray-50 text-indigo-600 border border-indigo-300 shadow-sm",
            ButtonVariant::Danger => "bg-red-600 hover:bg-red-700 text-white shadow-sm",
            ButtonVariant::Link => "bg-transparent text-indigo-600 hover:text-indigo-800 hover:underline",
        }
    }
}

impl Render for Button {
    fn render(&self) -> Markup {
        let classes = format!(
            "{} {} py-2 px-4 text-sm sm:text-base font-medium rounded-lg inline-flex items-center justify-center cursor-pointer",
            self.variant_classes(),
            if self.full_width { "w-full" } else { "" },
        );

        match &self.href {
            Some(href) => html! {
                a href=(href) class=(classes) { (self.text) }
            },
            None => html! {
                button type=(self.button_type.as_deref().unwrap_or("button")) class=(classes) { (self.text) }
            },
        }
    }
}
