use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use cookie::{Cookie, SameSite};
use tera::Context;
use tracing::info;
use validator::Validate;

use crate::dto::auth_dto::LoginForm;
use crate::service::auth_service::{AuthService, AuthServiceImpl};
use crate::util::error::{HandlerError, ServiceError};
use crate::util::session::set_cookie;
use crate::util::template::Templates;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

pub struct AuthState {
    pub auth_service: Arc<AuthServiceImpl>,
    pub templates: Arc<Templates>,
}

fn render_login(state: &AuthState, email: &str, error: Option<&str>) -> Result<Html<String>, HandlerError> {
    let mut context = Context::new();
    context.insert("email", email);
    context.insert("error", &error);
    state.templates.render("login.html", &context)
}

// GET /login
pub async fn login_form_handler(State(state): State<Arc<AuthState>>) -> Result<Html<String>, HandlerError> {
    render_login(&state, "", None)
}

// POST /login
pub async fn login_handler(
    State(state): State<Arc<AuthState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, HandlerError> {
    if let Err(e) = form.validate() {
        let page = render_login(&state, &form.email, Some(&format!("Validation error: {}", e)))?;
        return Ok((StatusCode::UNAUTHORIZED, page).into_response());
    }

    let token = match state.auth_service.login(&form.email, &form.password).await {
        Ok(token) => token,
        Err(ServiceError::InvalidInput(message)) => {
            let page = render_login(&state, &form.email, Some(&message))?;
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let mut response = Redirect::to("/users/find").into_response();
    set_cookie(&mut response, cookie);
    info!("[login_handler] Staff signed in: {}", form.email);
    Ok(response)
}

// POST /logout
pub async fn logout_handler() -> Response {
    let mut cookie = Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build();
    cookie.make_removal();
    let mut response = Redirect::to("/login").into_response();
    set_cookie(&mut response, cookie);
    response
}

// GET /
pub async fn root_handler() -> Redirect {
    Redirect::to("/users/find")
}
