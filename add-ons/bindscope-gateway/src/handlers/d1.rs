use super::ApiResult;
use crate::AppState;
use axum::extract::{Form, Path, Query, State};
use axum::Json;
use bindscope_core::{select, CapabilityKind, QueryPage, QueryRunner};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DatabaseParams {
    binding: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryForm {
    #[serde(default)]
    query: String,
}

/// GET /api/v1/d1 – database selection, plus the active database's table catalog.
pub(crate) async fn overview(
    State(state): State<AppState>,
    Query(params): Query<DatabaseParams>,
) -> ApiResult<Json<serde_json::Value>> {
    let selection = select(&state.env, CapabilityKind::Database, params.binding.as_deref());
    let page = match selection.active.as_deref() {
        Some(name) => Some(QueryRunner::open(&state.env, name)?.page(None).await),
        None => None,
    };
    Ok(Json(serde_json::json!({
        "selection": selection,
        "page": page,
    })))
}

/// GET /api/v1/d1/:binding – table catalog.
pub(crate) async fn catalog(
    State(state): State<AppState>,
    Path(binding): Path<String>,
) -> ApiResult<Json<QueryPage>> {
    let runner = QueryRunner::open(&state.env, &binding)?;
    Ok(Json(runner.page(None).await))
}

/// POST /api/v1/d1/:binding/query – runs the `query` form field verbatim.
/// Statement failures come back inside the page, not as an error status.
pub(crate) async fn run_query(
    State(state): State<AppState>,
    Path(binding): Path<String>,
    Form(form): Form<QueryForm>,
) -> ApiResult<Json<QueryPage>> {
    let runner = QueryRunner::open(&state.env, &binding)?;
    Ok(Json(runner.page(Some(form.query.as_str())).await))
}
