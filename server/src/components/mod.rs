pub mod form;
pub mod layout;
pub mod post;
pub mod ui;
