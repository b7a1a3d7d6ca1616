//!
//! tabularium HTTP server
//! ----------------------
//! This module defines the Axum-based HTTP API for the catalogue.
//!
//! Responsibilities:
//! - Route construction and the shared `AppState` injected into all handlers.
//! - Setup-time pipeline registration: the access stage comes from the
//!   configured policy and the server refuses to start without one.
//! - Liveness and collaborator health endpoints.
//!
//! Handlers live in the submodules; every request validates its input before
//! any collaborator is touched and maps failures through `AppError` into the
//! `{error: {code, message}}` envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, on, post, MethodFilter};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::context::AppContext;
use crate::delivery::disk::DiskFileHandler;
use crate::delivery::rocrate::RoCrateHandler;
use crate::delivery::ContentHandler;
use crate::error::AppError;
use crate::model::{Entity, FileRecord};
use crate::pipeline::{access, links, EntityPipeline, FilePipeline};
use crate::search::HttpSearchClient;
use crate::store::PgStore;

pub mod entities;
pub mod files;
pub mod search_http;
pub mod validate;

/// Shared server state injected into all handlers.
///
/// Pipelines are registered once at startup; the handlers are the two
/// pluggable content sources sharing one result contract.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub entity_pipeline: Arc<EntityPipeline>,
    pub file_pipeline: Arc<FilePipeline>,
    pub file_handler: Arc<dyn ContentHandler<FileRecord>>,
    pub rocrate_handler: Arc<dyn ContentHandler<Entity>>,
}

/// Register pipelines and handlers. This is the setup-time failure point for
/// access-control configuration: an unresolvable policy aborts startup here,
/// before any request is served.
pub fn build_state(ctx: Arc<AppContext>) -> Result<AppState, AppError> {
    let (entity_access, file_access) = access::stages_from_config(&ctx.config)?;
    let entity_pipeline = EntityPipeline::new(entity_access).with_extra(links::attach_links_stage());
    let file_pipeline = FilePipeline::new(file_access);
    Ok(AppState {
        rocrate_handler: Arc::new(RoCrateHandler::new(ctx.store.clone())),
        file_handler: Arc::new(DiskFileHandler::new(&ctx.config)),
        entity_pipeline: Arc::new(entity_pipeline),
        file_pipeline: Arc::new(file_pipeline),
        ctx,
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "tabularium ok" }))
        .route("/health", get(health))
        .route("/entity/{id}", get(entities::get_entity))
        .route("/entity/{id}/rocrate", get(entities::get_entity_rocrate))
        .route("/entities", get(entities::list_entities))
        .route("/files", get(files::list_files))
        // GET and HEAD are split on purpose: HEAD must only ever reach the
        // handler's metadata path.
        .route(
            "/file/{id}",
            on(MethodFilter::GET, files::get_file).on(MethodFilter::HEAD, files::head_file),
        )
        .route("/search", post(search_http::search))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    let store_ok = state.ctx.store.ping().await.is_ok();
    let search_ok = state.ctx.search.ping().await.is_ok();
    let body = Json(json!({
        "status": if store_ok && search_ok { "ok" } else { "degraded" },
        "store": store_ok,
        "search": search_ok,
    }));
    if store_ok && search_ok {
        body.into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}

/// Start the tabularium HTTP server: connect the store pool and search
/// client once, register pipelines, mount routes, serve.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.log_startup();

    let store = PgStore::connect(&config.database_url).await?;
    let search = HttpSearchClient::new(&config)?;
    let ctx = Arc::new(AppContext {
        store: Arc::new(store),
        search: Arc::new(search),
        config: config.clone(),
    });
    let state = build_state(ctx)?;
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
