use crate::AppState;
use crate::api::error::AppError;
use crate::services::upload_intake::UploadedFile;
use crate::utils::validation::{BYTES_PER_MEGABYTE, ValidationError, round_to_cents};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode, header::CONTENT_LENGTH},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use utoipa::ToSchema;
use validator::Validate;

pub const TEMP_ID_FIELD: &str = "tempId";
pub const FILE_FIELD: &str = "file";

/// Multipart body accepted by `POST /upload`.
#[derive(Deserialize, ToSchema)]
pub struct UploadForm {
    #[serde(rename = "tempId")]
    pub temp_id: String,
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Validate)]
struct UploadFields {
    #[validate(length(min = 1, max = 64), custom(function = "validate_temp_id"))]
    temp_id: String,
}

// The temp id becomes a directory name under the storage root
fn validate_temp_id(value: &str) -> Result<(), validator::ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("temp_id_charset"))
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data", description = "Asset upload"),
    responses(
        (status = 200, description = "File staged under the session's temp directory", body = crate::services::upload_intake::FinalizeOutcome),
        (status = 400, description = "Invalid tempId, missing file or extension not allowed"),
        (status = 413, description = "File exceeds the maximum upload size")
    ),
    tag = "uploads"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Map<String, Value>>, AppError> {
    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut temp_id = String::new();
    let mut upload: Option<UploadedFile> = None;
    let mut received_bytes: u64 = 0;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e, declared_length.unwrap_or(received_bytes)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == TEMP_ID_FIELD {
            temp_id = field.text().await.map_err(|e| {
                multipart_error(&state, e, declared_length.unwrap_or(received_bytes))
            })?;
        } else if name == FILE_FIELD {
            let original_filename = field.file_name().unwrap_or("unnamed").to_string();
            let extension = Path::new(&original_filename)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_string();

            let mut spool = state.pipeline.begin_spool(&extension).await?;
            while let Some(chunk) = field.chunk().await.map_err(|e| {
                multipart_error(&state, e, declared_length.unwrap_or(received_bytes))
            })? {
                spool.write_chunk(&chunk).await?;
                received_bytes += chunk.len() as u64;
            }

            tracing::debug!(
                "Received {} ({} bytes) as {:?}",
                original_filename,
                spool.size_bytes(),
                spool.path()
            );
            upload = Some(spool.finish().await?);
        }
    }

    let temp_id = temp_id.trim().to_string();
    UploadFields {
        temp_id: temp_id.clone(),
    }
    .validate()
    .map_err(|_| {
        AppError::BadRequest(
            "tempId must be 1-64 characters of letters, digits, '-' or '_'".to_string(),
        )
    })?;

    let file = upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let pipeline = state.pipeline.clone();
    let response = tokio::task::spawn_blocking(move || pipeline.process(&temp_id, Some(file)))
        .await
        .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))??;

    Ok(Json(response))
}

/// Maps a multipart failure to a response. Running past the body limit is
/// reported as an oversized file, with the same message validation would give.
fn multipart_error(state: &AppState, err: MultipartError, size_bytes: u64) -> AppError {
    if err.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::BadRequest(err.to_string());
    }

    let max_size_mb = round_to_cents(state.config.effective_max_upload_size_mb());
    let reason = ValidationError::FileTooLarge {
        file_size_mb: round_to_cents(size_bytes as f64 / BYTES_PER_MEGABYTE as f64)
            .max(max_size_mb),
        max_size_mb,
    };
    tracing::warn!(
        "🚫 Upload rejected [{}]: body exceeded the request limit ({} bytes seen)",
        reason.code(),
        size_bytes
    );

    AppError::PayloadTooLarge(state.translator.translate(&reason.template()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_id_rules() {
        let valid = |s: &str| {
            UploadFields {
                temp_id: s.to_string(),
            }
            .validate()
            .is_ok()
        };

        assert!(valid("5f1a2b3c4d"));
        assert!(valid("session_01-a"));
        assert!(!valid(""));
        assert!(!valid("../etc"));
        assert!(!valid("a/b"));
        assert!(!valid(".spool"));
        assert!(!valid(&"x".repeat(65)));
    }
}
