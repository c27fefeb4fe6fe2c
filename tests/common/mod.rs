#![allow(dead_code)]

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt; // for .oneshot()

use user_admin_backend::app::app::{App, Backend};
use user_admin_backend::config::{AdminUserConfig, AppConfig, JwtConfig, SessionConfig, StorageKind};
use user_admin_backend::handler::auth_handler::ACCESS_TOKEN_COOKIE;
use user_admin_backend::service::auth_service::AuthService;

pub const BOUNDARY: &str = "user-admin-test-boundary";

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub fn admin_config() -> AdminUserConfig {
    AdminUserConfig {
        first_name: "Ada".to_string(),
        last_name: "Admin".to_string(),
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    }
}

pub struct TestApp {
    pub app: App,
    pub backend: Backend,
    /// `access_token=...` sent with every request once signed in.
    pub auth_cookie: Option<String>,
}

impl TestApp {
    /// An anonymous client on the in-memory backend.
    pub fn new() -> Self {
        TestApp::with_backend(Backend::memory())
    }

    pub fn with_backend(backend: Backend) -> Self {
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            storage: StorageKind::Memory,
        };
        let app = App::with_backend(config, backend.clone(), JwtConfig::default(), SessionConfig::default())
            .expect("app");
        TestApp { app, backend, auth_cookie: None }
    }

    /// A client logged in as the bootstrapped admin through `POST /login`.
    pub async fn signed_in() -> Self {
        let mut app = TestApp::new();
        app.app.auth_service.bootstrap_admin(&admin_config()).await.unwrap();
        let resp = app
            .post_form("/login", "email=admin%40example.com&password=admin-password")
            .await;
        assert_eq!(resp.status(), 303, "login should redirect");
        app.auth_cookie = Some(set_cookie(&resp, ACCESS_TOKEN_COOKIE).expect("access token cookie"));
        app
    }

    fn cookie_header(&self, extra: Option<&str>) -> Option<String> {
        match (self.auth_cookie.as_deref(), extra) {
            (Some(auth), Some(extra)) => Some(format!("{}; {}", auth, extra)),
            (Some(auth), None) => Some(auth.to_string()),
            (None, Some(extra)) => Some(extra.to_string()),
            (None, None) => None,
        }
    }

    pub fn router(&self) -> Router {
        self.app.router()
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request("GET", uri, None, Body::empty(), None).await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.request("GET", uri, None, Body::empty(), Some(cookie)).await
    }

    pub async fn post_form(&self, uri: &str, body: &str) -> Response<Body> {
        let body = Body::from(body.to_string());
        self.request("POST", uri, Some("application/x-www-form-urlencoded".to_string()), body, None)
            .await
    }

    pub async fn post_multipart(&self, uri: &str, form: &MultipartForm, cookie: Option<&str>) -> Response<Body> {
        let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
        self.request("POST", uri, Some(content_type), Body::from(form.body()), cookie)
            .await
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        content_type: Option<String>,
        body: Body,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(cookie) = self.cookie_header(cookie) {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(body).unwrap()).await
    }

    /// Registers a user and returns the detail page URL it redirected to.
    pub async fn register(&self, first_name: &str, password: &str, image: Option<&[u8]>) -> String {
        let mut form = MultipartForm::user(first_name, password);
        if let Some(bytes) = image {
            form = form.file("user_image", "me.png", "image/png", bytes);
        }
        let resp = self.post_multipart("/users/new", &form, None).await;
        assert_eq!(resp.status(), 303, "registration should redirect");
        location(&resp)
    }
}

#[derive(Default)]
pub struct MultipartForm {
    parts: Vec<u8>,
}

impl MultipartForm {
    pub fn user(first_name: &str, password: &str) -> Self {
        MultipartForm::default()
            .text("first_name", first_name)
            .text("last_name", "Liddell")
            .text("email", &format!("{}@example.com", first_name))
            .text("password", password)
            .text("password_confirm", password)
            .text("tel", "0123456789")
            .text("zip", "12345")
            .text("address", "1 Rabbit Hole")
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        let part = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        );
        self.parts.extend_from_slice(part.as_bytes());
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, content: &[u8]) -> Self {
        let head = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, name, file_name, content_type
        );
        self.parts.extend_from_slice(head.as_bytes());
        self.parts.extend_from_slice(content);
        self.parts.extend_from_slice(b"\r\n");
        self
    }

    pub fn body(&self) -> Vec<u8> {
        let mut body = self.parts.clone();
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get(LOCATION)
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// `name=value` of the named Set-Cookie, ready for a Cookie header.
pub fn set_cookie(resp: &Response<Body>, name: &str) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", name)))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
