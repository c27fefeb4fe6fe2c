use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::BytesMut;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::dto::user_form::UserForm;
use crate::model::upload_file::UploadFile;
use crate::util::error::HandlerError;

pub const USER_IMAGE_FIELD: &str = "user_image";

/// Largest accepted profile image.
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Request body limit for the multipart forms. Larger than the image limit so
/// an oversized image is still reported against its field.
pub const MAX_REQUEST_BYTES: usize = 8 * 1024 * 1024;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn bad_multipart(what: &str, e: MultipartError) -> HandlerError {
    error!("[read_user_form] {}: {}", what, e);
    HandlerError::bad_request(format!("{}: {}", what, e))
}

fn optional(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Stored name: random, keeping the original extension.
fn stored_file_name(original: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    match original.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{}.{}", token, ext.to_ascii_lowercase())
        }
        _ => token,
    }
}

enum FilePart {
    Empty,
    Oversized,
    File(UploadFile),
}

fn is_too_large(e: &MultipartError) -> bool {
    e.status() == StatusCode::PAYLOAD_TOO_LARGE
}

async fn read_file(mut field: Field<'_>) -> Result<FilePart, MultipartError> {
    let original_file_name = field.file_name().map(|s| s.to_string()).unwrap_or_default();
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
            warn!("[read_user_form] Discarding oversized file: {}", original_file_name);
            return Ok(FilePart::Oversized);
        }
        buf.extend_from_slice(&chunk);
    }

    // Browsers send an empty part when no file was chosen.
    if buf.is_empty() {
        return Ok(FilePart::Empty);
    }
    info!("[read_user_form] Received file: {} ({} bytes)", original_file_name, buf.len());
    Ok(FilePart::File(UploadFile {
        file_name: stored_file_name(&original_file_name),
        original_file_name,
        content_type,
        content: buf.to_vec(),
    }))
}

/// Binds a multipart user form. The image, if one was chosen, ends up in
/// `user_image`; unknown parts are ignored. An image over `MAX_IMAGE_BYTES`,
/// or a body over the request limit, sets `oversized_image` and stops reading.
pub async fn read_user_form(mut multipart: Multipart) -> Result<UserForm, HandlerError> {
    let mut form = UserForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if is_too_large(&e) => {
                form.oversized_image = true;
                break;
            }
            Err(e) => return Err(bad_multipart("Failed to get next field", e)),
        };
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();
        debug!("[read_user_form] Processing field: {}", name);
        if name == USER_IMAGE_FIELD {
            match read_file(field).await {
                Ok(FilePart::File(file)) => form.user_image = Some(file),
                Ok(FilePart::Empty) => form.user_image = None,
                Ok(FilePart::Oversized) => {
                    form.user_image = None;
                    form.oversized_image = true;
                }
                Err(e) if is_too_large(&e) => {
                    form.user_image = None;
                    form.oversized_image = true;
                    break;
                }
                Err(e) => return Err(bad_multipart("Failed to read file chunk", e)),
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| bad_multipart("Failed to read field", e))?;
        match name.as_str() {
            "first_name" => form.first_name = value.trim().to_string(),
            "last_name" => form.last_name = value.trim().to_string(),
            "email" => form.email = value.trim().to_string(),
            "password" => form.password = value,
            "password_confirm" => form.password_confirm = value,
            "tel" => form.tel = optional(value),
            "zip" => form.zip = optional(value),
            "address" => form.address = optional(value),
            _ => debug!("[read_user_form] Ignoring field: {}", name),
        }
    }

    Ok(form)
}
