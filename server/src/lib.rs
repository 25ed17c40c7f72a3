pub mod accounts;
pub mod auth;
pub mod components;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod forms;
pub mod password;
pub mod posts;
pub mod routes;
pub mod setup;
pub mod state;
pub mod store;
pub mod uploads;

pub type Result<T, E = color_eyre::Report> = std::result::Result<T, E>;
