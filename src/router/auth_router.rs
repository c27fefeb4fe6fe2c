use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::handler::auth_handler::{
    login_form_handler, login_handler, logout_handler, root_handler, AuthState,
};

pub fn auth_router(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/login", get(login_form_handler).post(login_handler))
        .route("/logout", post(logout_handler))
        .with_state(state)
}
