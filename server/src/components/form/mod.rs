use maud::{html, Markup, Render};

use crate::forms::FormErrors;

const INPUT_CLASSES: &str = "w-full px-4 py-2 border border-gray-300 rounded-lg focus:ring-2 focus:ring-indigo-500 focus:border-indigo-500 text-gray-900";

pub struct InputField {
    pub name: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub value: Option<String>,
    pub input_type: String,
    pub required: bool,
    pub hidden: bool,
    pub error: Option<String>,
}

impl InputField {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            placeholder: None,
            value: None,
            input_type: "text".to_string(),
            required: false,
            hidden: false,
            error: None,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn input_type(mut self, input_type: &str) -> Self {
        self.input_type = input_type.to_string();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Show the validation message for this field, if `errors` has one
    pub fn errors(mut self, errors: &FormErrors) -> Self {
        self.error = errors.for_field(&self.name).map(str::to_string);
        self
    }
}

impl Render for InputField {
    fn render(&self) -> Markup {
        if self.hidden {
            return html! {
                input type="hidden" name=(self.name) value=(self.value.as_deref().unwrap_or("")) {}
            };
        }

        html! {
            div class="mb-4" {
                @if let Some(label) = &self.label {
                    label for=(self.name) class="block text-sm font-medium text-gray-700 mb-1" { (label) }
                }

                input
                    type=(self.input_type)
                    name=(self.name)
                    id=(self.name)
                    value=(self.value.as_deref().unwrap_or(""))
                    placeholder=(self.placeholder.as_deref().unwrap_or(""))
                    class=(INPUT_CLASSES)
                    required[self.required] {}

                (FieldError(self.error.as_deref()))
            }
        }
    }
}

pub struct TextArea {
    pub name: String,
    pub label: Option<String>,
    pub value: Option<String>,
    pub rows: u8,
    pub error: Option<String>,
}

impl TextArea {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            value: None,
            rows: 5,
            error: None,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn rows(mut self, rows: u8) -> Self {
        self.rows = rows;
        self
    }

    pub fn errors(mut self, errors: &FormErrors) -> Self {
        self.error = errors.for_field(&self.name).map(str::to_string);
        self
    }
}

impl Render for TextArea {
    fn render(&self) -> Markup {
        html! {
            div class="mb-4" {
                @if let Some(label) = &self.label {
                    label for=(self.name) class="block text-sm font-medium text-gray-700 mb-1" { (label) }
                }

                textarea name=(self.name) id=(self.name) rows=(self.rows) class=(INPUT_CLASSES) {
                    (self.value.as_deref().unwrap_or(""))
                }

                (FieldError(self.error.as_deref()))
            }
        }
    }
}

struct FieldError<'a>(Option<&'a str>);

impl Render for FieldError<'_> {
    fn render(&self) -> Markup {
        html! {
            @if let Some(message) = self.0 {
                p class="mt-1 text-sm text-red-600" { (message) }
            }
        }
    }
}

pub struct Form {
    pub action: String,
    pub method: String,
    pub content: Box<dyn Render>,
    pub multipart: bool,
}

impl Form {
    pub fn new(action: &str, method: &str, content: impl Render + 'static) -> Self {
        Self {
            action: action.to_string(),
            method: method.to_string(),
            content: Box::new(content),
            multipart: false,
        }
    }

    pub fn post(action: &str, content: impl Render + 'static) -> Self {
        Self::new(action, "post", content)
    }

    /// Needed for forms with a file input
    pub fn multipart(mut self) -> Self {
        self.multipart = true;
        self
    }
}

impl Render for Form {
    fn render(&self) -> Markup {
        html! {
            @if self.multipart {
                form action=(self.action) method=(self.method) enctype="multipart/form-data" class="space-y-4" {
                    (self.content.render())
                }
            } @else {
                form action=(self.action) method=(self.method) class="space-y-4" {
                    (self.content.render())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_field_shows_its_error() {
        let mut errors = FormErrors::default();
        errors.add("email", "This field is required.");

        let markup = InputField::new("email").errors(&errors).render().into_string();
        assert!(markup.contains("This field is required."));

        let other = InputField::new("name").errors(&errors).render().into_string();
        assert!(!other.contains("This field is required."));
    }

    #[test]
    fn test_input_field_placeholder_and_required() {
        let markup = InputField::new("slug")
            .placeholder("my-first-post")
            .required(true)
            .render()
            .into_string();
        assert!(markup.contains(r#"placeholder="my-first-post""#));
        assert!(markup.contains("required"));

        let optional = InputField::new("favorite_color").render().into_string();
        assert!(!optional.contains("required"));
    }

    #[test]
    fn test_text_area_escapes_its_value() {
        let markup = TextArea::new("content")
            .value("<script>alert(1)</script>")
            .render()
            .into_string();

        assert!(markup.contains("&lt;script&gt;"));
        assert!(!markup.contains("<script>"));
    }
}
