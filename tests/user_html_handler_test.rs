mod common;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine};

use common::{body_string, location, set_cookie, MultipartForm, TestApp};
use user_admin_backend::model::id::Id;
use user_admin_backend::model::page::Pageable;
use user_admin_backend::model::user::UserSearch;
use user_admin_backend::repository::user_repo::UserRepository;
use user_admin_backend::util::multipart::{MAX_IMAGE_BYTES, MAX_REQUEST_BYTES};
use user_admin_backend::util::session::SESSION_COOKIE;

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d, 0xff, 0xfe];

fn embedded_image(body: &str) -> Option<Vec<u8>> {
    let start = body.find("data:image/png;base64,")? + "data:image/png;base64,".len();
    let end = start + body[start..].find('"')?;
    STANDARD.decode(&body[start..end]).ok()
}

#[tokio::test]
async fn test_new_user_form_renders() {
    let app = TestApp::signed_in().await;
    let resp = app.get("/users/new").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookie(&resp, SESSION_COOKIE).is_some());
    let body = body_string(resp).await;
    assert!(body.contains("name=\"first_name\""));
    assert!(body.contains("enctype=\"multipart/form-data\""));
}

#[tokio::test]
async fn test_register_alice_then_show() {
    let app = TestApp::signed_in().await;
    let show = app.register("alice", "pw123", None).await;
    assert_eq!(show, "/users/show/1");

    let resp = app.get(&show).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("alice"));
    assert!(!body.contains("pw123"));
    assert!(!body.contains("argon2"));
    assert!(!body.contains("data:image"));

    let stored = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();
    assert_ne!(stored.password, "pw123");
    assert!(stored.password.starts_with("$argon2"));
}

#[tokio::test]
async fn test_registered_image_is_embedded_as_base64() {
    let app = TestApp::signed_in().await;
    let show = app.register("alice", "pw123", Some(PNG_BYTES)).await;

    let body = body_string(app.get(&show).await).await;
    assert_eq!(embedded_image(&body).expect("image block"), PNG_BYTES);

    let stored = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();
    let file = stored.upload_file.expect("upload file");
    assert_eq!(file.original_file_name, "me.png");
    assert_eq!(file.content_type, "image/png");
    assert!(file.file_name.ends_with(".png"));
}

#[tokio::test]
async fn test_invalid_registration_rerenders_with_errors() {
    let app = TestApp::signed_in().await;
    let form = MultipartForm::default()
        .text("first_name", "")
        .text("last_name", "Liddell")
        .text("email", "not-an-email")
        .text("password", "pw123")
        .text("password_confirm", "pw124")
        .text("tel", "12-34");
    let resp = app.post_multipart("/users/new", &form, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("First name is required"));
    assert!(body.contains("Passwords do not match"));
    assert!(body.contains("Tel must contain digits only"));
    // Entered values survive the round trip.
    assert!(body.contains("value=\"Liddell\""));

    let page = app.backend.user_repo.find_all(&UserSearch::default(), Pageable::unpaged()).await.unwrap();
    assert_eq!(page.count, 0);
}

#[tokio::test]
async fn test_show_missing_user_is_not_found() {
    let app = TestApp::signed_in().await;
    assert_eq!(app.get("/users/show/999").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/users/edit/999").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_post_redirects_to_get_url() {
    let app = TestApp::signed_in().await;
    let resp = app.post_form("/users/find", "first_name=ali&last_name=&email=").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/find?first_name=ali");

    let resp = app.post_form("/users/find", "first_name=&last_name=&email=").await;
    assert_eq!(location(&resp), "/users/find");
}

#[tokio::test]
async fn test_invalid_search_rerenders() {
    let app = TestApp::signed_in().await;
    let long = "x".repeat(60);
    let resp = app.post_form("/users/find", &format!("first_name={}", long)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("First name must be at most 50 characters"));
}

#[tokio::test]
async fn test_find_filters_and_pages() {
    let app = TestApp::signed_in().await;
    app.register("alice", "pw123", None).await;
    app.register("bob", "pw123", None).await;

    let body = body_string(app.get("/users/find?first_name=ALI").await).await;
    assert!(body.contains("alice@example.com"));
    assert!(!body.contains("bob@example.com"));
    assert!(body.contains("1 user(s), page 1 of 1"));

    for i in 0..10 {
        app.register(&format!("carol{}", i), "pw123", None).await;
    }
    let body = body_string(app.get("/users/find").await).await;
    assert!(body.contains("12 user(s), page 1 of 2"));
    assert!(body.contains("rel=\"next\""));
    assert!(!body.contains("rel=\"prev\""));

    let body = body_string(app.get("/users/find?page=2").await).await;
    assert!(body.contains("carol9@example.com"));
    assert!(body.contains("rel=\"prev\""));
}

#[tokio::test]
async fn test_edit_without_image_keeps_upload_file() {
    let app = TestApp::signed_in().await;
    let show = app.register("alice", "pw123", Some(PNG_BYTES)).await;
    let before = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();

    let resp = app.get("/users/edit/1").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = set_cookie(&resp, SESSION_COOKIE).expect("session cookie");
    let body = body_string(resp).await;
    assert!(body.contains("value=\"alice\""));

    let form = MultipartForm::user("alice2", "")
        .file("user_image", "", "application/octet-stream", b"");
    let resp = app.post_multipart("/users/edit/1", &form, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), show);

    let body = body_string(app.get(&show).await).await;
    assert!(body.contains("alice2"));
    assert_eq!(embedded_image(&body).expect("image kept"), PNG_BYTES);

    let after = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();
    assert_eq!(after.password, before.password, "blank password keeps the hash");
    assert_eq!(after.upload_file, before.upload_file);
}

#[tokio::test]
async fn test_edit_with_image_replaces_upload_file() {
    let app = TestApp::signed_in().await;
    app.register("alice", "pw123", Some(PNG_BYTES)).await;

    let form = MultipartForm::user("alice", "newpass").file("user_image", "new.jpg", "image/jpeg", b"jpeg-bytes");
    let resp = app.post_multipart("/users/edit/1", &form, None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let after = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();
    let file = after.upload_file.expect("upload file");
    assert_eq!(file.content, b"jpeg-bytes");
    assert_eq!(file.original_file_name, "new.jpg");
    assert!(after.password.starts_with("$argon2"));
    assert_ne!(after.password, "newpass");
}

#[tokio::test]
async fn test_edit_creates_upload_file_when_missing() {
    let app = TestApp::signed_in().await;
    app.register("alice", "pw123", None).await;

    let form = MultipartForm::user("alice", "").file("user_image", "me.png", "image/png", PNG_BYTES);
    let resp = app.post_multipart("/users/edit/1", &form, None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = body_string(app.get("/users/show/1").await).await;
    assert_eq!(embedded_image(&body).expect("image block"), PNG_BYTES);
}

#[tokio::test]
async fn test_image_from_rejected_edit_survives_in_session() {
    let app = TestApp::signed_in().await;
    app.register("alice", "pw123", None).await;

    let invalid = MultipartForm::user("alice", "")
        .text("zip", "abc")
        .file("user_image", "me.png", "image/png", PNG_BYTES);
    let resp = app.post_multipart("/users/edit/1", &invalid, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = set_cookie(&resp, SESSION_COOKIE).expect("session cookie");
    let body = body_string(resp).await;
    assert!(body.contains("Zip must contain digits only"));
    assert!(body.contains("pending-image"));

    // The in-flight form is reused by the edit page.
    let body = body_string(app.get_with_cookie("/users/edit/1", &cookie).await).await;
    assert!(body.contains("pending-image"));

    let valid = MultipartForm::user("alice", "");
    let resp = app.post_multipart("/users/edit/1", &valid, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let stored = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();
    assert_eq!(stored.upload_file.expect("pending image saved").content, PNG_BYTES);
}

#[tokio::test]
async fn test_download_csv() {
    let app = TestApp::signed_in().await;
    app.register("alice", "pw123", None).await;
    app.register("bob", "pw123", None).await;

    let resp = app.get("/users/download/users.csv").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[CONTENT_TYPE], "text/csv; charset=utf-8");
    assert_eq!(resp.headers()[CONTENT_DISPOSITION], "attachment; filename=\"users.csv\"");

    let body = body_string(resp).await;
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("id,first_name,last_name,email,tel,zip,address,created_at"));
    let alice = lines.next().expect("alice row");
    assert!(alice.starts_with("1,alice,Liddell,alice@example.com,0123456789,12345,1 Rabbit Hole,"));
    assert!(lines.next().expect("bob row").starts_with("2,bob,"));
    assert!(!body.contains("argon2"));
}

#[tokio::test]
async fn test_download_csv_without_users_has_header() {
    let app = TestApp::signed_in().await;
    let body = body_string(app.get("/users/download/empty.csv").await).await;
    assert_eq!(body, "id,first_name,last_name,email,tel,zip,address,created_at\n");
}

#[tokio::test]
async fn test_image_from_rejected_registration_survives_in_session() {
    let app = TestApp::signed_in().await;
    let invalid = MultipartForm::user("alice", "pw123")
        .text("password_confirm", "pw124")
        .file("user_image", "me.png", "image/png", PNG_BYTES);
    let resp = app.post_multipart("/users/new", &invalid, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = set_cookie(&resp, SESSION_COOKIE).expect("session cookie");
    let body = body_string(resp).await;
    assert!(body.contains("Passwords do not match"));
    assert!(body.contains("pending-image"));

    let valid = MultipartForm::user("alice", "pw123");
    let resp = app.post_multipart("/users/new", &valid, Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/users/show/1");

    let stored = app.backend.user_repo.find_by_id(Id::of(1)).await.unwrap().unwrap();
    let file = stored.upload_file.expect("pending image saved");
    assert_eq!(file.content, PNG_BYTES);
    assert_eq!(file.original_file_name, "me.png");

    // A fresh registration form starts without the consumed image.
    let body = body_string(app.get_with_cookie("/users/new", &cookie).await).await;
    assert!(!body.contains("pending-image"));
}

#[tokio::test]
async fn test_oversized_image_is_a_field_error() {
    let app = TestApp::signed_in().await;
    let image = vec![0u8; MAX_IMAGE_BYTES + 1];
    let form = MultipartForm::user("alice", "pw123").file("user_image", "big.png", "image/png", &image);
    let resp = app.post_multipart("/users/new", &form, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("Image must be at most 2 MB"));
    assert!(body.contains("value=\"alice\""));

    let page = app.backend.user_repo.find_all(&UserSearch::default(), Pageable::unpaged()).await.unwrap();
    assert_eq!(page.count, 0);
}

#[tokio::test]
async fn test_body_over_request_limit_is_a_field_error() {
    let app = TestApp::signed_in().await;
    let image = vec![0u8; MAX_REQUEST_BYTES + 1];
    let form = MultipartForm::user("alice", "pw123").file("user_image", "huge.png", "image/png", &image);
    let resp = app.post_multipart("/users/new", &form, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Image must be at most 2 MB"));

    let page = app.backend.user_repo.find_all(&UserSearch::default(), Pageable::unpaged()).await.unwrap();
    assert_eq!(page.count, 0);
}
