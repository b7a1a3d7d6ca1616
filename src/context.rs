//! Process-wide and per-request dependency context.
//!
//! Collaborator clients are constructed once at startup and handed to every
//! component by reference; there is no ambient/global lookup.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::search::client::SearchEngine;
use crate::store::RecordStore;

/// Long-lived collaborators shared by all requests. The store pool and the
/// search client manage their own connection reuse; from the core's
/// perspective both are stateless handles.
pub struct AppContext {
    pub store: Arc<dyn RecordStore>,
    pub search: Arc<dyn SearchEngine>,
    pub config: Config,
}

/// Per-request context passed into pipeline stages and content handlers.
/// Cheap to clone; stages may hold it across await points.
#[derive(Clone)]
pub struct RequestContext {
    pub app: Arc<AppContext>,
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(app: Arc<AppContext>) -> Self {
        RequestContext { app, request_id: Uuid::new_v4() }
    }
}
