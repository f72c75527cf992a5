/// Search handler
use crate::error::Result;
use crate::models::SearchKind;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Kept as text so a malformed limit falls back to the default
    pub limit: Option<String>,
}

/// GET /api/search?q&type&limit
pub async fn search(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse> {
    let kind = SearchKind::from_param(params.kind.as_deref());
    let limit = params
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok());
    let results = state
        .search
        .search(params.q.as_deref().unwrap_or_default(), kind, limit)
        .await?;

    Ok(HttpResponse::Ok().json(results))
}
