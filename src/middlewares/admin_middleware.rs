use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, error, warn};

use crate::handler::auth_handler::ACCESS_TOKEN_COOKIE;
use crate::model::permission::ADMIN_ROLE;
use crate::repository::staff_permission_dao::StaffPermissionDao;
use crate::util::jwt::{Claims, JwtTokenUtils, JwtTokenUtilsImpl};
use crate::util::session::read_cookie;

pub const LOGIN_PATH: &str = "/login";

pub struct AdminAuthState {
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub permission_dao: Arc<dyn StaffPermissionDao>,
}

/// Bearer header first, then the login cookie.
fn access_token(state: &AdminAuthState, req: &Request<Body>) -> Option<String> {
    if let Some(header) = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return state.jwt_utils.extract_token_from_header(header).ok();
    }
    read_cookie(req.headers(), ACCESS_TOKEN_COOKIE).filter(|t| !t.is_empty())
}

fn signed_in_claims(state: &AdminAuthState, req: &Request<Body>) -> Option<Claims> {
    let token = access_token(state, req)?;
    match state.jwt_utils.validate_access_token(&token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!("Rejected access token: {}", e);
            None
        }
    }
}

/// Console pages: any signed-in staff member. Everyone else is sent to the
/// login page.
pub async fn staff_auth(
    State(state): State<Arc<AdminAuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match signed_in_claims(&state, &req) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => {
            debug!("Anonymous request to {}, redirecting to login", req.uri().path());
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// Lets the request through only for staff holding the ADMIN role.
pub async fn admin_auth(
    State(state): State<Arc<AdminAuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = signed_in_claims(&state, &req).ok_or(StatusCode::UNAUTHORIZED)?;
    let staff_id = claims.staff_id().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let roles = state
        .permission_dao
        .select_by_staff_id(staff_id, HashSet::new(), |mut roles, permission| {
            roles.insert(permission.role_key);
            roles
        })
        .await
        .map_err(|e| {
            error!("Failed to load permissions for staff {}: {}", staff_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if !roles.contains(ADMIN_ROLE) {
        warn!("Staff {} lacks the {} role", staff_id, ADMIN_ROLE);
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
