//! Per-browser state for multi-step form flows.
//!
//! A session is an opaque token carried in the `ADMIN_SESSION` cookie. The
//! data it points at lives in a process-local [`FormSessionStore`].

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use cookie::{Cookie, SameSite};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::dto::user_form::UserForm;

pub const SESSION_COOKIE: &str = "ADMIN_SESSION";

/// Finds a cookie value in the `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// Appends a `Set-Cookie` header; a header value that fails to encode is dropped.
pub fn set_cookie(response: &mut Response, cookie: Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => warn!("Dropping unencodable cookie {}: {}", cookie.name(), e),
    }
}

#[derive(Debug, Clone)]
struct FormSessionData {
    user_form: Option<UserForm>,
    expires_at: SystemTime,
}

impl FormSessionData {
    fn is_valid_at(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }

    fn pending_bytes(&self) -> usize {
        self.user_form
            .as_ref()
            .and_then(|f| f.user_image.as_ref())
            .map_or(0, |image| image.content.len())
    }
}

/// Bounded by entry count and by the total size of pending images. Writes
/// sweep expired sessions, then evict the least recently written ones.
#[derive(Debug)]
pub struct FormSessionStore {
    sessions: RwLock<HashMap<String, FormSessionData>>,
    ttl: Duration,
    max_sessions: usize,
    max_pending_bytes: usize,
}

impl FormSessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        FormSessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl: config.ttl(),
            max_sessions: config.max_sessions.max(1),
            max_pending_bytes: config.max_pending_bytes,
        }
    }

    /// The in-flight user form of this session, if it has not expired.
    pub fn user_form(&self, token: &str) -> Option<UserForm> {
        let now = SystemTime::now();
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(token)
            .filter(|s| s.is_valid_at(now))
            .and_then(|s| s.user_form.clone())
    }

    pub fn store_user_form(&self, token: &str, form: UserForm) {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, s| s.is_valid_at(now));
        sessions.insert(
            token.to_string(),
            FormSessionData { user_form: Some(form), expires_at: now + self.ttl },
        );
        self.evict(&mut sessions, token);
    }

    fn evict(&self, sessions: &mut HashMap<String, FormSessionData>, keep: &str) {
        let mut pending: usize = sessions.values().map(FormSessionData::pending_bytes).sum();
        while sessions.len() > self.max_sessions || pending > self.max_pending_bytes {
            let oldest = sessions
                .iter()
                .filter(|(token, _)| token.as_str() != keep)
                .min_by_key(|(_, s)| s.expires_at)
                .map(|(token, _)| token.clone());
            let Some(oldest) = oldest else { break };
            if let Some(evicted) = sessions.remove(&oldest) {
                pending -= evicted.pending_bytes();
            }
            debug!("Evicted form session to stay within limits");
        }

        // A single image larger than the whole budget is not kept.
        if pending > self.max_pending_bytes {
            if let Some(form) = sessions.get_mut(keep).and_then(|s| s.user_form.as_mut()) {
                warn!("Dropping pending image over the session budget");
                form.user_image = None;
            }
        }
    }

    /// Ends the form flow for this session.
    pub fn clear_user_form(&self, token: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(token);
    }

    pub fn cleanup(&self) {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, s| s.is_valid_at(now));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[cfg(test)]
    fn pending_bytes(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.values().map(FormSessionData::pending_bytes).sum()
    }
}

/// The caller's session token; minted when the request carried none.
#[derive(Debug, Clone)]
pub struct FormSession {
    pub token: String,
    is_new: bool,
}

impl FormSession {
    /// Adds the session cookie to `response` when the token was just minted.
    pub fn attach(&self, mut response: Response) -> Response {
        if self.is_new {
            let cookie = Cookie::build((SESSION_COOKIE, self.token.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            set_cookie(&mut response, cookie);
        }
        response
    }
}

impl<S: Send + Sync> FromRequestParts<S> for FormSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match read_cookie(&parts.headers, SESSION_COOKIE) {
            Some(token) if !token.is_empty() => Ok(FormSession { token, is_new: false }),
            _ => {
                let token = Uuid::new_v4().simple().to_string();
                debug!("Starting new form session");
                Ok(FormSession { token, is_new: true })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload_file::UploadFile;

    fn store(ttl_secs: u64, max_sessions: usize, max_pending_bytes: usize) -> FormSessionStore {
        FormSessionStore::new(&SessionConfig {
            ttl_minutes: 1,
            max_sessions,
            max_pending_bytes,
        })
        .with_ttl(Duration::from_secs(ttl_secs))
    }

    impl FormSessionStore {
        fn with_ttl(mut self, ttl: Duration) -> Self {
            self.ttl = ttl;
            self
        }
    }

    fn form(first_name: &str) -> UserForm {
        UserForm { first_name: first_name.to_string(), ..UserForm::default() }
    }

    fn form_with_image(first_name: &str, bytes: usize) -> UserForm {
        UserForm {
            user_image: Some(UploadFile {
                file_name: "f.png".to_string(),
                original_file_name: "f.png".to_string(),
                content_type: "image/png".to_string(),
                content: vec![7; bytes],
            }),
            ..form(first_name)
        }
    }

    #[test]
    fn test_store_and_clear() {
        let store = store(60, 10, 1024);
        assert!(store.user_form("t1").is_none());

        store.store_user_form("t1", form("alice"));
        assert_eq!(store.user_form("t1").unwrap().first_name, "alice");
        assert!(store.user_form("t2").is_none());

        store.clear_user_form("t1");
        assert!(store.user_form("t1").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_expired_sessions_are_swept_on_write() {
        let store = store(0, 10, 1024);
        store.store_user_form("t1", form("alice"));
        assert!(store.user_form("t1").is_none());
        store.store_user_form("t2", form("bob"));
        assert_eq!(store.len(), 1);
        store.cleanup();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = store(60, 10, 1024);
        store.store_user_form("a", form("alice"));
        store.store_user_form("b", form("bob"));
        assert_eq!(store.user_form("a").unwrap().first_name, "alice");
        assert_eq!(store.user_form("b").unwrap().first_name, "bob");
    }

    #[test]
    fn test_session_count_is_capped() {
        let store = store(60, 100, usize::MAX);
        for i in 0..500 {
            store.store_user_form(&format!("t{}", i), form("x"));
        }
        assert_eq!(store.len(), 100);
        // The newest write always survives.
        assert!(store.user_form("t499").is_some());
    }

    #[test]
    fn test_pending_image_bytes_are_capped() {
        let store = store(60, usize::MAX, 10 * 1024);
        for i in 0..1000 {
            store.store_user_form(&format!("t{}", i), form_with_image("x", 1024));
        }
        assert!(store.pending_bytes() <= 10 * 1024);
        assert_eq!(store.len(), 10);
        assert!(store.user_form("t999").unwrap().user_image.is_some());
    }

    #[test]
    fn test_image_over_whole_budget_is_dropped() {
        let store = store(60, 10, 100);
        store.store_user_form("t1", form_with_image("alice", 1000));
        let kept = store.user_form("t1").unwrap();
        assert_eq!(kept.first_name, "alice");
        assert!(kept.user_image.is_none());
    }
}
