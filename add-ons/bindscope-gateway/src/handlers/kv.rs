use super::ApiResult;
use crate::AppState;
use axum::extract::{Form, Path, Query, State};
use axum::Json;
use bindscope_core::{select, CapabilityKind, KvBrowser, KvEntryForm};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct KvParams {
    binding: Option<String>,
    search: Option<String>,
}

/// GET /api/v1/kv – namespace selection, plus the active namespace's entries.
pub(crate) async fn overview(
    State(state): State<AppState>,
    Query(params): Query<KvParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let selection = select(
        &state.env,
        CapabilityKind::KvNamespace,
        params.binding.as_deref(),
    );
    let entries = match selection.active.as_deref() {
        Some(name) => Some(
            KvBrowser::open(&state.env, name)?
                .list(params.search.as_deref())
                .await?,
        ),
        None => None,
    };
    Ok(Json(serde_json::json!({
        "selection": selection,
        "search": params.search,
        "entries": entries,
    })))
}

/// GET /api/v1/kv/:binding/entries – list, optionally filtered by `search`.
pub(crate) async fn list_entries(
    State(state): State<AppState>,
    Path(binding): Path<String>,
    Query(params): Query<KvParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let browser = KvBrowser::open(&state.env, &binding)?;
    let entries = browser.list(params.search.as_deref()).await?;
    Ok(Json(serde_json::json!({
        "binding": binding,
        "entries": entries,
    })))
}

/// POST /api/v1/kv/:binding/entries – create or overwrite an entry from form fields.
pub(crate) async fn save_entry(
    State(state): State<AppState>,
    Path(binding): Path<String>,
    Form(form): Form<KvEntryForm>,
) -> ApiResult<Json<serde_json::Value>> {
    let browser = KvBrowser::open(&state.env, &binding)?;
    let entries = browser.save(&form).await?;
    Ok(Json(serde_json::json!({
        "binding": binding,
        "saved": form.key,
        "entries": entries,
    })))
}

/// GET /api/v1/kv/:binding/entries/:key – pre-filled edit form.
pub(crate) async fn edit_entry(
    State(state): State<AppState>,
    Path((binding, key)): Path<(String, String)>,
) -> ApiResult<Json<KvEntryForm>> {
    let browser = KvBrowser::open(&state.env, &binding)?;
    Ok(Json(browser.edit_form(&key).await?))
}

/// DELETE /api/v1/kv/:binding/entries/:key
pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    Path((binding, key)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let browser = KvBrowser::open(&state.env, &binding)?;
    let entries = browser.delete(&key).await?;
    Ok(Json(serde_json::json!({
        "binding": binding,
        "deleted": key,
        "entries": entries,
    })))
}
