//! Chunk upload endpoint.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{self, record_upload_error};
use crate::state::AppState;
use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use spool_core::{TransferFault, UploadOutcome};
use spool_lifecycle::ChunkUpload;
use std::time::Instant;

/// POST /v1/uploads - Accept one chunk of a file.
///
/// Multipart fields: `chunkIndex` (default 0), `totalChunks` (default 1),
/// `fileName`, `unique` (session key, omitted on the first chunk) and the
/// `file` part. Responds 200 when the file is complete and 202 while more
/// chunks are expected.
pub async fn upload_chunk(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let start_time = Instant::now();

    let upload = read_chunk_form(multipart).await.inspect_err(record_error)?;
    let size = upload.payload.len() as u64;

    let result = state.uploads.handle_chunk(upload).await;
    metrics::CHUNK_UPLOAD_DURATION.observe(start_time.elapsed().as_secs_f64());
    let outcome = result.map_err(ApiError::from).inspect_err(record_error)?;

    metrics::CHUNKS_STORED.inc();
    metrics::BYTES_UPLOADED.inc_by(size);

    let status = match &outcome {
        UploadOutcome::Complete { .. } => {
            metrics::UPLOADS_COMPLETED.inc();
            StatusCode::OK
        }
        UploadOutcome::InProgress { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(outcome)).into_response())
}

async fn read_chunk_form(mut multipart: Multipart) -> ApiResult<ChunkUpload> {
    let mut chunk_index = 0;
    let mut total_chunks = 1;
    let mut file_name = None;
    let mut part_file_name = None;
    let mut session_key = None;
    let mut payload = None;

    while let Some(field) = multipart.next_field().await.map_err(transfer_fault)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "chunkIndex" => {
                chunk_index = parse_count(&name, &field.text().await.map_err(transfer_fault)?)?;
            }
            "totalChunks" => {
                total_chunks = parse_count(&name, &field.text().await.map_err(transfer_fault)?)?;
            }
            "fileName" => file_name = Some(field.text().await.map_err(transfer_fault)?),
            "unique" => session_key = Some(field.text().await.map_err(transfer_fault)?),
            "file" => {
                part_file_name = field.file_name().map(str::to_string);
                payload = Some(field.bytes().await.map_err(transfer_fault)?);
            }
            _ => tracing::debug!(field = %name, "Ignoring unknown upload field"),
        }
    }

    let payload = payload.ok_or(ApiError::Transfer(TransferFault::NoFile))?;
    let file_name = file_name
        .filter(|name| !name.trim().is_empty())
        .or(part_file_name)
        .unwrap_or_default();

    Ok(ChunkUpload {
        session_key,
        chunk_index,
        total_chunks,
        file_name,
        payload,
    })
}

fn parse_count(field: &str, value: &str) -> ApiResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a non-negative integer")))
}

/// Map a multipart read failure onto the transfer fault it represents.
fn transfer_fault(err: MultipartError) -> ApiError {
    let fault = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        TransferFault::SizeExceeded
    } else {
        TransferFault::Partial
    };
    tracing::debug!(error = %err.body_text(), ?fault, "Multipart read failed");
    ApiError::Transfer(fault)
}

fn record_error(err: &ApiError) {
    let error_type = match err {
        ApiError::Rejected(reason) => reason.label(),
        ApiError::Transfer(_) => "transfer_fault",
        other => other.code(),
    };
    record_upload_error(error_type);
}
