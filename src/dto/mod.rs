pub mod auth_dto;
pub mod search_form;
pub mod user_form;
pub mod user_view;
