pub mod auth_router;
pub mod user_router;
