use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use payscope_core::error::PayScopeError;
use payscope_core::model::{Artifact, FileFormat};
use payscope_tenant::TenantContext;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, QUEUE_HIGH_WATERMARK};

#[derive(Serialize)]
struct UploadResponse {
    artifact_id: Uuid,
    status_url: String,
}

fn detect_file_format(filename: &str) -> Result<FileFormat, PayScopeError> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".csv") {
        Ok(FileFormat::Csv)
    } else if lower.ends_with(".xlsx") {
        Ok(FileFormat::Xlsx)
    } else if lower.ends_with(".pdf") {
        // Digital vs scanned is a content property, not a filename one;
        // the pipeline worker's extractor re-examines the page text layer
        // and falls back to the OCR path when it finds none.
        Ok(FileFormat::PdfDigital)
    } else {
        Err(PayScopeError::ExtractionFailed {
            detail: format!("unrecognized file extension in {filename}"),
        })
    }
}

/// `POST /upload` (spec.md §6): authenticate (via `auth_guard`), put
/// bytes to the object store, enqueue a `ParseJob`. Backpressure is
/// checked before anything is written, so an overloaded queue never
/// leaves an orphaned object in the bucket. The 413 response for an
/// oversized body is handled upstream by `routes.rs`'s `DefaultBodyLimit`
/// layer, before this handler ever runs.
pub async fn upload(State(state): State<AppState>, Extension(ctx): Extension<TenantContext>, mut multipart: Multipart) -> impl IntoResponse {
    match handle(state, ctx, &mut multipart).await {
        Ok(response) => (axum::http::StatusCode::ACCEPTED, Json(response)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn handle(state: AppState, ctx: TenantContext, multipart: &mut Multipart) -> Result<UploadResponse, PayScopeError> {
    let pending = payscope_jobs::pending_job_count(&state.db_pool).await?;
    if pending >= QUEUE_HIGH_WATERMARK {
        return Err(PayScopeError::IngestionOverloaded);
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| PayScopeError::ValidationRowFailed {
            detail: format!("malformed multipart body: {e}"),
        })?
        .ok_or_else(|| PayScopeError::ValidationRowFailed {
            detail: "multipart body had no file field".to_string(),
        })?;

    let filename = field.file_name().unwrap_or("upload").to_string();
    let file_format = detect_file_format(&filename)?;

    let bytes = field.bytes().await.map_err(|e| PayScopeError::ValidationRowFailed {
        detail: format!("failed to read upload body: {e}"),
    })?;

    let artifact_id = Uuid::new_v4();
    let sha256 = hex::encode(Sha256::digest(&bytes));
    let object_key = payscope_objectstore::keys::raw_key(ctx.bank_id, artifact_id, &filename);

    state.objects.put(&object_key, bytes.to_vec()).await?;

    let artifact = Artifact {
        artifact_id,
        bank_id: ctx.bank_id,
        object_key,
        file_format,
        sha256,
        upload_time: chrono::Utc::now(),
    };
    payscope_jobs::enqueue_upload(&state.db_pool, &artifact).await?;

    Ok(UploadResponse {
        artifact_id,
        status_url: format!("/jobs/{artifact_id}"),
    })
}
