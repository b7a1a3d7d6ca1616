//! File listing and content delivery routes.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::HashMap;

use crate::context::RequestContext;
use crate::delivery::{self, DeliveryOptions, Disposition};
use crate::error::AppError;
use crate::model::{FileSortKey, SortOrder};
use crate::server::validate::{
    finish, parse_bool, parse_i64, parse_keyword, validate_limit, validate_offset, LIMIT_DEFAULT,
};
use crate::server::AppState;
use crate::store::FileListQuery;

pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut issues = Vec::new();
    let limit = validate_limit(parse_i64(&params, "limit", LIMIT_DEFAULT, &mut issues), &mut issues);
    let offset = validate_offset(parse_i64(&params, "offset", 0, &mut issues), &mut issues);
    let sort: FileSortKey = parse_keyword(&params, "sort", FileSortKey::Id, &mut issues);
    let order: SortOrder = parse_keyword(&params, "order", SortOrder::Asc, &mut issues);
    finish(issues)?;

    let query = FileListQuery { member_of: params.get("memberOf").cloned(), limit, offset, sort, order };
    let total = state.ctx.store.count_files(&query).await?;
    let files = state.ctx.store.list_files(&query).await?;

    let ctx = RequestContext::new(state.ctx.clone());
    let values = state.file_pipeline.run_all(files, &ctx).await?;
    Ok(Json(json!({ "total": total, "files": values })).into_response())
}

fn delivery_options(
    params: &HashMap<String, String>,
    issues: &mut Vec<String>,
) -> DeliveryOptions {
    let disposition: Disposition =
        parse_keyword(params, "disposition", Disposition::Attachment, issues);
    DeliveryOptions {
        no_redirect: parse_bool(params, "noRedirect", issues),
        disposition: Some(disposition),
        filename: params.get("filename").cloned(),
    }
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut issues = Vec::new();
    let opts = delivery_options(&params, &mut issues);
    finish(issues)?;

    let ctx = RequestContext::new(state.ctx.clone());
    let file = state
        .ctx
        .store
        .get_file(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("file not found: {id}")))?;
    match state.file_handler.get(&file, &ctx).await? {
        Some(result) => {
            delivery::respond_content(
                result,
                Some(&file.filename),
                &opts,
                &state.ctx.config.accel_header,
            )
            .await
        }
        None => Err(AppError::not_found(format!("file content not available: {id}"))),
    }
}

/// HEAD reuses the handler's metadata-only path: no descriptor is opened and
/// no redirect target is minted just to answer.
pub async fn head_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let mut issues = Vec::new();
    let opts = delivery_options(&params, &mut issues);
    finish(issues)?;

    let ctx = RequestContext::new(state.ctx.clone());
    let file = state
        .ctx
        .store
        .get_file(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("file not found: {id}")))?;
    match state.file_handler.head(&file, &ctx).await? {
        Some(metadata) => delivery::respond_metadata(&metadata, Some(&file.filename), &opts),
        None => Err(AppError::not_found(format!("file content not available: {id}"))),
    }
}
