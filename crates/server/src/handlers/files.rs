//! File record endpoints.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use spool_core::UriName;
use spool_metadata::FileRow;

/// GET /v1/files/{uri_name} - Fetch a file record.
pub async fn get_file(
    State(state): State<AppState>,
    Path(uri_name): Path<String>,
) -> ApiResult<Json<FileRow>> {
    UriName::parse(&uri_name)?;

    state
        .files
        .lookup(&uri_name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("file not found: {uri_name}")))
}

/// Query parameters for file deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteFileQuery {
    /// Owner on whose behalf the file is removed.
    #[serde(default)]
    pub link_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub deleted: bool,
}

/// DELETE /v1/files/{uri_name}?link_id= - Remove a linked file.
///
/// Unlinked files are never removed through this endpoint.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(uri_name): Path<String>,
    Query(query): Query<DeleteFileQuery>,
) -> ApiResult<Json<DeleteFileResponse>> {
    UriName::parse(&uri_name)?;

    let deleted = state
        .files
        .remove_owned_file(&uri_name, &query.link_id)
        .await?;
    Ok(Json(DeleteFileResponse { deleted }))
}
