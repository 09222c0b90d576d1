use crate::AppState;
use crate::api::models::uploads::UploadResponse;
use crate::errors::{Error, Result};
use crate::storage::{self, DEFAULT_CONTENT_TYPE};
use anyhow::Context;
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use std::path::Path;
use tracing::{debug, info, warn};

/// The part of a multipart upload we care about.
struct FilePart {
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

/// Pull the `file` field out of the form, ignoring any other fields.
async fn read_file_part(multipart: &mut Multipart) -> Result<Option<FilePart>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        return Ok(Some(FilePart {
            filename,
            content_type,
            data,
        }));
    }

    Ok(None)
}

fn remove_temp_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temporary upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temporary upload"),
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    summary = "Upload image",
    description = "Store an image in the upload bucket under a generated name and return its public URL.",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with a single `file` field"
    ),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing filename or malformed form"),
        (status = 413, description = "Upload larger than the configured limit"),
        (status = 422, description = "No `file` field in the form"),
        (status = 500, description = "Bucket not configured or storage failure")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let storage_config = &state.config.storage;
    storage_config.require_bucket()?;

    let mut multipart = multipart.map_err(|rejection| Error::Unprocessable {
        message: rejection.body_text(),
    })?;
    let part = read_file_part(&mut multipart).await?.ok_or_else(|| Error::Unprocessable {
        message: "Missing file field".to_string(),
    })?;

    let original = part.filename.filter(|name| !name.is_empty()).ok_or_else(|| Error::BadRequest {
        message: "Missing filename".to_string(),
    })?;
    let content_type = part
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let filename = storage::upload_filename(&original);
    let key = storage::object_key(&storage_config.key_prefix, &filename);

    let temp_dir = storage_config.temp_dir();
    tokio::fs::create_dir_all(&temp_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", temp_dir.display()))?;

    // Removed on every exit path from here on, including a failed or partial write
    let temp_path = scopeguard::guard(temp_dir.join(&filename), |path| remove_temp_file(&path));
    tokio::fs::write(&*temp_path, &part.data)
        .await
        .with_context(|| format!("Failed to buffer upload to {}", temp_path.display()))?;

    info!(
        original = %original,
        key = %key,
        size = part.data.len(),
        content_type = %content_type,
        "Storing upload"
    );
    let url = state.storage.store(temp_path.as_path(), &content_type, &key).await?;

    Ok(Json(UploadResponse { url, filename }))
}
