pub mod auth_handler;
pub mod user_html_handler;
