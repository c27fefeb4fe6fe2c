use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};

use crate::handler::user_html_handler::{
    create_user_handler, download_users_handler, edit_user_form_handler, find_users_handler,
    new_user_form_handler, search_users_handler, show_user_handler, test_role_handler,
    update_user_handler, UserHtmlState,
};
use crate::middlewares::admin_middleware::{admin_auth, staff_auth, AdminAuthState};

pub fn user_router(state: Arc<UserHtmlState>, admin_auth_state: Arc<AdminAuthState>) -> Router {
    let pages = Router::new()
        .route("/users/new", get(new_user_form_handler).post(create_user_handler))
        .route("/users/find", get(find_users_handler).post(search_users_handler))
        .route("/users/show/{id}", get(show_user_handler))
        .route("/users/edit/{id}", get(edit_user_form_handler).post(update_user_handler))
        .route("/users/download/{filename}", get(download_users_handler))
        .route_layer(middleware::from_fn_with_state(admin_auth_state.clone(), staff_auth))
        .with_state(state);

    // ADMIN-only role check
    let admin = Router::new()
        .route("/users/testRole", get(test_role_handler))
        .route_layer(middleware::from_fn_with_state(admin_auth_state, admin_auth));

    pages.merge(admin)
}
