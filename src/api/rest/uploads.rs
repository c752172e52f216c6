//! Multipart upload endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
};
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::api::types::{HttpError, Json};
use crate::infrastructure::upload::{BatchUploadResult, UploadFailure, UploadedFile};

/// Text field naming the sub-directory of the uploads directory
pub const DIRECTORY_FIELD: &str = "directory";

/// POST /api/uploads
///
/// Every file part is validated and stored; files that fail are reported in
/// `failed` without aborting the batch.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchUploadResult>, HttpError> {
    let mut directory = String::new();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };

        let name = field.name().unwrap_or_default().to_string();

        let Some(client_filename) = field.file_name().map(str::to_string) else {
            if name == DIRECTORY_FIELD {
                directory = field.text().await.map_err(multipart_error)?.trim().to_string();
            }
            continue;
        };

        let media_type = field.content_type().unwrap_or_default().to_string();

        match field.bytes().await {
            Ok(data) if client_filename.is_empty() && data.is_empty() => {
                files.push(UploadedFile::failed(UploadFailure::NoFile).with_field_name(name));
            }
            Ok(data) => {
                files.push(UploadedFile::new(client_filename, media_type, data).with_field_name(name));
            }
            Err(e) => {
                let failure = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    UploadFailure::IniSize
                } else {
                    UploadFailure::Partial
                };
                warn!(field = %name, error = %e, "Upload was not received completely");
                files.push(UploadedFile::failed(failure).with_field_name(name));
                break;
            }
        }
    }

    if files.is_empty() {
        return Err(failure_error(UploadFailure::NoFile));
    }
    // Nothing usable arrived; report the first transport failure
    if let [first, ..] = files.as_slice() {
        if files.iter().all(|f| f.error.is_some()) {
            return Err(failure_error(first.error.unwrap_or(UploadFailure::Unknown)));
        }
    }

    let options = state.uploads.options().clone();
    let result = state
        .uploads
        .process_multiple_uploads(&files, &directory, &options)
        .await;

    info!(
        directory = %directory,
        successful = result.successful.len(),
        failed = result.failed.len(),
        "Processed uploads"
    );

    Ok(Json(result))
}

fn multipart_error(err: MultipartError) -> HttpError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        failure_error(UploadFailure::IniSize)
    } else {
        HttpError::new(status, "Malformed multipart request").with_detail(err.body_text())
    }
}

fn failure_error(failure: UploadFailure) -> HttpError {
    match failure {
        UploadFailure::IniSize | UploadFailure::FormSize => {
            HttpError::payload_too_large(failure.message())
        }
        other => HttpError::bad_request(other.message()),
    }
}
