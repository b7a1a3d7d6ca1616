//! Entity lookup, listing and metadata-document routes.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::HashMap;

use crate::context::RequestContext;
use crate::delivery::{self, DeliveryOptions};
use crate::error::AppError;
use crate::model::{EntitySortKey, SortOrder};
use crate::server::validate::{
    finish, parse_csv, parse_i64, parse_keyword, validate_limit, validate_offset, LIMIT_DEFAULT,
};
use crate::server::AppState;
use crate::store::EntityListQuery;

pub async fn get_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ctx = RequestContext::new(state.ctx.clone());
    tracing::debug!(request_id = %ctx.request_id, %id, "entity lookup");
    let entity = state
        .ctx
        .store
        .get_entity(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("entity not found: {id}")))?;
    let mut values = state.entity_pipeline.run_all(vec![entity], &ctx).await?;
    let value = values
        .pop()
        .ok_or_else(|| AppError::internal("pipeline returned no output for entity"))?;
    Ok(Json(value).into_response())
}

pub async fn list_entities(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut issues = Vec::new();
    let limit = validate_limit(parse_i64(&params, "limit", LIMIT_DEFAULT, &mut issues), &mut issues);
    let offset = validate_offset(parse_i64(&params, "offset", 0, &mut issues), &mut issues);
    let sort: EntitySortKey = parse_keyword(&params, "sort", EntitySortKey::Id, &mut issues);
    let order: SortOrder = parse_keyword(&params, "order", SortOrder::Asc, &mut issues);
    finish(issues)?;

    let query = EntityListQuery {
        member_of: params.get("memberOf").cloned(),
        entity_types: parse_csv(&params, "entityType"),
        limit,
        offset,
        sort,
        order,
    };
    let total = state.ctx.store.count_entities(&query).await?;
    let entities = state.ctx.store.list_entities(&query).await?;

    let ctx = RequestContext::new(state.ctx.clone());
    let values = state.entity_pipeline.run_all(entities, &ctx).await?;
    Ok(Json(json!({ "total": total, "entities": values })).into_response())
}

/// Entity metadata document via the RO-Crate handler. A metadata endpoint:
/// no Content-Disposition, no redirect special-casing.
pub async fn get_entity_rocrate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let ctx = RequestContext::new(state.ctx.clone());
    let entity = state
        .ctx
        .store
        .get_entity(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("entity not found: {id}")))?;
    match state.rocrate_handler.get(&entity, &ctx).await? {
        Some(result) => {
            delivery::respond_content(
                result,
                None,
                &DeliveryOptions::default(),
                &state.ctx.config.accel_header,
            )
            .await
        }
        None => Err(AppError::not_found(format!("metadata document not available: {id}"))),
    }
}
