//! Link management: which files an owning entity uses.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use spool_lifecycle::GcStats;

#[derive(Debug, Deserialize)]
pub struct LinkFilesRequest {
    pub uri_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkFilesResponse {
    pub link_id: String,
    /// Number of records now linked.
    pub adopted: u64,
}

/// PUT /v1/links/{link_id}/files - Replace the set of files linked to an owner.
///
/// Files previously linked but not listed are demoted to temp.
pub async fn link_files(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(req): Json<LinkFilesRequest>,
) -> ApiResult<Json<LinkFilesResponse>> {
    let adopted = state.files.use_files(&req.uri_names, &link_id).await?;
    Ok(Json(LinkFilesResponse { link_id, adopted }))
}

#[derive(Debug, Deserialize)]
pub struct LinkContentRequest {
    pub content: String,
    #[serde(default = "default_syntax")]
    pub syntax: String,
}

fn default_syntax() -> String {
    "markdown".to_string()
}

#[derive(Debug, Serialize)]
pub struct LinkContentResponse {
    pub link_id: String,
    /// Names referenced by the content, in order of appearance.
    pub uri_names: Vec<String>,
}

/// PUT /v1/links/{link_id}/content - Link exactly the files a document references.
pub async fn link_content(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(req): Json<LinkContentRequest>,
) -> ApiResult<Json<LinkContentResponse>> {
    let uri_names = state
        .files
        .use_content(&req.content, &req.syntax, &link_id)
        .await?;
    Ok(Json(LinkContentResponse { link_id, uri_names }))
}

/// DELETE /v1/links/{link_id} - Delete every file linked to an owner.
pub async fn delete_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> ApiResult<Json<GcStats>> {
    let stats = state.files.remove_files(&link_id).await?;
    Ok(Json(stats))
}
