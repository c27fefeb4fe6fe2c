use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, info};

use crate::util::error::HandlerError;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Writes `headers` then one record per row. The header line is present even
/// when there are no rows.
pub fn write_csv<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>, HandlerError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    let internal = |e: csv::Error| {
        error!("Failed to write csv: {}", e);
        HandlerError::internal("Failed to write csv")
    };
    writer.write_record(headers).map_err(internal)?;
    for row in rows {
        writer.serialize(row).map_err(internal)?;
    }
    writer.into_inner().map_err(|e| {
        error!("Failed to flush csv: {}", e);
        HandlerError::internal("Failed to write csv")
    })
}

/// Strips characters that would break out of the quoted filename.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect()
}

pub fn csv_attachment(filename: &str, body: Vec<u8>) -> Result<Response, HandlerError> {
    let disposition = format!("attachment; filename=\"{}\"", sanitize_filename(filename));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|_| HandlerError::bad_request("Invalid download file name"))?;
    info!("Sending csv {} ({} bytes)", filename, body.len());
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(CSV_CONTENT_TYPE)),
            (CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
