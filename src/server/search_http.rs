//! POST /search: compile, execute, reconcile, transform, envelope.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::search::{
    self, compile, merge_search_metadata, parse_facets, parse_geohash_grid, parse_response,
    reconcile, FacetBucket,
};
use crate::server::validate::parse_search_request;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEnvelope {
    pub total: u64,
    pub search_time: u64,
    pub entities: Vec<Value>,
    pub facets: BTreeMap<String, Vec<FacetBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geohash_grid: Option<BTreeMap<String, u64>>,
}

pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let request = parse_search_request(&body)?;
    let ctx = RequestContext::new(state.ctx.clone());
    tracing::debug!(request_id = %ctx.request_id, query = %request.query, "search");

    let engine_body = compile(&request);
    let engine_response = state.ctx.search.search(&engine_body).await?;
    let outcome = parse_response(&engine_response)?;

    // One batched store fetch keyed by the hit identifiers.
    let ids: Vec<String> = outcome.hits.iter().map(|h| h.id.clone()).collect();
    let records = if ids.is_empty() {
        Vec::new()
    } else {
        state.ctx.store.entities_by_ids(&ids).await?
    };
    let pairs = reconcile(outcome.hits, records);
    let (hits, entities): (Vec<search::SearchHit>, Vec<_>) = pairs.into_iter().unzip();

    let transformed = state.entity_pipeline.run_all(entities, &ctx).await?;
    let entities: Vec<Value> = transformed
        .into_iter()
        .zip(hits.iter())
        .map(|(value, hit)| merge_search_metadata(value, hit))
        .collect();

    let envelope = SearchEnvelope {
        total: outcome.total,
        search_time: outcome.took_ms,
        entities,
        facets: parse_facets(&engine_response),
        geohash_grid: parse_geohash_grid(&engine_response),
    };
    Ok(Json(envelope).into_response())
}
