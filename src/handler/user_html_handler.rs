use std::sync::Arc;

use axum::extract::{Form, Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use tera::Context;
use tracing::{debug, error, info};
use validator::Validate;

use crate::dto::search_form::SearchUserForm;
use crate::dto::user_form::{field_errors, FieldErrors, FormMode, UserForm};
use crate::dto::user_view::{UserCsv, UserView, USER_CSV_HEADERS};
use crate::model::id::Id;
use crate::model::page::{Page, Pageable};
use crate::model::user::{User, UserSearch};
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::util::csv_export::{csv_attachment, write_csv};
use crate::util::error::HandlerError;
use crate::util::multipart::read_user_form;
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};
use crate::util::session::{FormSession, FormSessionStore};
use crate::util::template::Templates;

pub struct UserHtmlState {
    pub user_service: Arc<UserServiceImpl>,
    pub sessions: Arc<FormSessionStore>,
    pub templates: Arc<Templates>,
}

fn hash_password(password: &str) -> Result<String, HandlerError> {
    PasswordUtilsImpl::hash_password(password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        HandlerError::internal("Failed to hash password")
    })
}

fn show_url(id: Id<User>) -> String {
    format!("/users/show/{}", id)
}

fn render_new(state: &UserHtmlState, form: &UserForm, errors: &FieldErrors) -> Result<Response, HandlerError> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("pending_image", &form.has_pending_image());
    Ok(state.templates.render("users/new.html", &context)?.into_response())
}

fn render_edit(
    state: &UserHtmlState,
    id: Id<User>,
    form: &UserForm,
    errors: &FieldErrors,
) -> Result<Response, HandlerError> {
    let mut context = Context::new();
    context.insert("user_id", &id);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("pending_image", &form.has_pending_image());
    Ok(state.templates.render("users/edit.html", &context)?.into_response())
}

fn render_find(
    state: &UserHtmlState,
    search: &SearchUserForm,
    page: Option<&Page<UserView>>,
    errors: &FieldErrors,
) -> Result<Response, HandlerError> {
    let mut context = Context::new();
    context.insert("search", search);
    context.insert("errors", errors);
    context.insert("page", &page);
    let prev_url = page.filter(|p| p.has_previous()).map(|p| search.to_url(Some(p.page - 1)));
    let next_url = page.filter(|p| p.has_next()).map(|p| search.to_url(Some(p.page + 1)));
    context.insert("prev_url", &prev_url);
    context.insert("next_url", &next_url);
    Ok(state.templates.render("users/find.html", &context)?.into_response())
}

// GET /users/new
pub async fn new_user_form_handler(
    State(state): State<Arc<UserHtmlState>>,
    session: FormSession,
) -> Result<Response, HandlerError> {
    state.sessions.clear_user_form(&session.token);
    let response = render_new(&state, &UserForm::default(), &FieldErrors::new())?;
    Ok(session.attach(response))
}

// POST /users/new
pub async fn create_user_handler(
    State(state): State<Arc<UserHtmlState>>,
    session: FormSession,
    multipart: Multipart,
) -> Result<Response, HandlerError> {
    let mut form = read_user_form(multipart).await?;
    if form.user_image.is_none() {
        form.user_image = state
            .sessions
            .user_form(&session.token)
            .filter(|pending| pending.id.is_none())
            .and_then(|pending| pending.user_image);
    }

    if let Err(e) = form.validate_for(FormMode::Create) {
        debug!("[create_user_handler] Validation failed: {}", e);
        state.sessions.store_user_form(&session.token, form.clone());
        let response = render_new(&state, &form, &field_errors(&e))?;
        return Ok(session.attach(response));
    }

    let password_hash = hash_password(&form.password)?;
    let created = state.user_service.create(form.into_user(password_hash)).await?;
    let id = created
        .id
        .ok_or_else(|| HandlerError::internal("Created user has no id"))?;
    state.sessions.clear_user_form(&session.token);
    info!("[create_user_handler] Registered user {}", id);
    Ok(session.attach(Redirect::to(&show_url(id)).into_response()))
}

// GET /users/find
pub async fn find_users_handler(
    State(state): State<Arc<UserHtmlState>>,
    Query(search): Query<SearchUserForm>,
) -> Result<Response, HandlerError> {
    if let Err(e) = search.validate() {
        return render_find(&state, &search, None, &field_errors(&e));
    }
    let page = state
        .user_service
        .find_all(&search.to_search(), search.pageable())
        .await?
        .map(|user| UserView::from(&user));
    render_find(&state, &search, Some(&page), &FieldErrors::new())
}

// POST /users/find
pub async fn search_users_handler(
    State(state): State<Arc<UserHtmlState>>,
    Form(search): Form<SearchUserForm>,
) -> Result<Response, HandlerError> {
    if let Err(e) = search.validate() {
        return render_find(&state, &search, None, &field_errors(&e));
    }
    Ok(Redirect::to(&search.to_url(None)).into_response())
}

// GET /users/show/{id}
pub async fn show_user_handler(
    State(state): State<Arc<UserHtmlState>>,
    Path(id): Path<Id<User>>,
) -> Result<Response, HandlerError> {
    let user = state.user_service.find_by_id(id).await?;
    let mut context = Context::new();
    context.insert("user", &UserView::from(&user));
    Ok(state.templates.render("users/show.html", &context)?.into_response())
}

// GET /users/edit/{id}
pub async fn edit_user_form_handler(
    State(state): State<Arc<UserHtmlState>>,
    session: FormSession,
    Path(id): Path<Id<User>>,
) -> Result<Response, HandlerError> {
    let form = match state.sessions.user_form(&session.token) {
        Some(form) if form.id == Some(id) => {
            debug!("[edit_user_form_handler] Reusing in-flight form for user {}", id);
            form
        }
        _ => {
            let user = state.user_service.find_by_id(id).await?;
            let form = UserForm::from(&user);
            state.sessions.store_user_form(&session.token, form.clone());
            form
        }
    };
    let response = render_edit(&state, id, &form, &FieldErrors::new())?;
    Ok(session.attach(response))
}

// POST /users/edit/{id}
pub async fn update_user_handler(
    State(state): State<Arc<UserHtmlState>>,
    session: FormSession,
    Path(id): Path<Id<User>>,
    multipart: Multipart,
) -> Result<Response, HandlerError> {
    let mut form = read_user_form(multipart).await?;
    form.id = Some(id);
    if form.user_image.is_none() {
        // An image chosen on an earlier, rejected submit is still pending.
        form.user_image = state
            .sessions
            .user_form(&session.token)
            .filter(|pending| pending.id == Some(id))
            .and_then(|pending| pending.user_image);
    }

    if let Err(e) = form.validate_for(FormMode::Edit) {
        debug!("[update_user_handler] Validation failed: {}", e);
        state.sessions.store_user_form(&session.token, form.clone());
        let response = render_edit(&state, id, &form, &field_errors(&e))?;
        return Ok(session.attach(response));
    }

    let mut user = state.user_service.find_by_id(id).await?;
    form.apply_to(&mut user);
    if !form.password.is_empty() {
        user.password = hash_password(&form.password)?;
    }
    if let Some(image) = form.user_image.take() {
        match user.upload_file.as_mut() {
            Some(existing) => existing.replace_with(image),
            None => user.upload_file = Some(image),
        }
    }

    state.user_service.update(user).await?;
    state.sessions.clear_user_form(&session.token);
    info!("[update_user_handler] Updated user {}", id);
    Ok(session.attach(Redirect::to(&show_url(id)).into_response()))
}

// GET /users/download/{filename}
pub async fn download_users_handler(
    State(state): State<Arc<UserHtmlState>>,
    Path(filename): Path<String>,
) -> Result<Response, HandlerError> {
    let users = state
        .user_service
        .find_all(&UserSearch::default(), Pageable::unpaged())
        .await?;
    let rows: Vec<UserCsv> = users.data.iter().map(UserCsv::from).collect();
    let body = write_csv(&USER_CSV_HEADERS, &rows)?;
    csv_attachment(&filename, body)
}

// GET /users/testRole
pub async fn test_role_handler() -> Redirect {
    Redirect::to("/")
}
