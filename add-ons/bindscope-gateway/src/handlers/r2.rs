use super::ApiResult;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bindscope_core::{select, BucketListing, CapabilityKind, ObjectBrowser, ObjectPreview};
use serde::Deserialize;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BucketParams {
    binding: Option<String>,
    prefix: Option<String>,
}

/// GET /api/v1/r2 – bucket selection, plus one level of the active bucket.
pub(crate) async fn overview(
    State(state): State<AppState>,
    Query(params): Query<BucketParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let selection = select(
        &state.env,
        CapabilityKind::ObjectBucket,
        params.binding.as_deref(),
    );
    let listing = match selection.active.as_deref() {
        Some(name) => Some(
            ObjectBrowser::open(&state.env, name)?
                .list(params.prefix.as_deref())
                .await?,
        ),
        None => None,
    };
    Ok(Json(serde_json::json!({
        "selection": selection,
        "listing": listing,
    })))
}

/// GET /api/v1/r2/:binding/objects?prefix
pub(crate) async fn list_objects(
    State(state): State<AppState>,
    Path(binding): Path<String>,
    Query(params): Query<BucketParams>,
) -> ApiResult<Json<BucketListing>> {
    let browser = ObjectBrowser::open(&state.env, &binding)?;
    Ok(Json(browser.list(params.prefix.as_deref()).await?))
}

/// GET /api/v1/r2/:binding/view/*key – metadata only.
pub(crate) async fn view_object(
    State(state): State<AppState>,
    Path((binding, key)): Path<(String, String)>,
) -> ApiResult<Json<ObjectPreview>> {
    let browser = ObjectBrowser::open(&state.env, &binding)?;
    Ok(Json(browser.preview(&key).await))
}

/// GET /api/v1/r2/:binding/raw/*key – object bytes with their stored content type and etag.
pub(crate) async fn raw_object(
    State(state): State<AppState>,
    Path((binding, key)): Path<(String, String)>,
) -> ApiResult<Response> {
    let browser = ObjectBrowser::open(&state.env, &binding)?;
    let object = browser.raw(&key).await?;
    let content_type = object
        .meta
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::ETAG, object.meta.http_etag.clone()),
        ],
        object.body,
    )
        .into_response())
}
