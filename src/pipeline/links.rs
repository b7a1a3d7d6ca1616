//! Stage 3 enrichment: API navigation links.
//!
//! Adds a `links` object (self, the RO-Crate document, the parent lookup)
//! derived from the transformed record and the configured public base URL.
//! Never overwrites a field an earlier stage produced.

use futures_util::future::BoxFuture;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::pipeline::ExtraStage;

pub fn attach_links_stage() -> ExtraStage {
    Arc::new(attach_links)
}

fn attach_links(mut value: Value, ctx: RequestContext) -> BoxFuture<'static, Result<Value, AppError>> {
    Box::pin(async move {
        let base = ctx.app.config.base_url.trim_end_matches('/').to_string();
        if let Some(obj) = value.as_object_mut() {
            let id = obj.get("id").and_then(|v| v.as_str()).map(|s| s.to_string());
            if let Some(id) = id {
                let encoded = urlencoding::encode(&id).into_owned();
                let mut links = Map::new();
                links.insert("self".to_string(), json!(format!("{base}/entity/{encoded}")));
                links.insert("rocrate".to_string(), json!(format!("{base}/entity/{encoded}/rocrate")));
                if let Some(parent) = obj
                    .get("memberOf")
                    .and_then(|v| v.get("id"))
                    .and_then(|v| v.as_str())
                {
                    let parent_encoded = urlencoding::encode(parent).into_owned();
                    links.insert("memberOf".to_string(), json!(format!("{base}/entity/{parent_encoded}")));
                }
                obj.entry("links".to_string()).or_insert(Value::Object(links));
            }
        }
        Ok(value)
    })
}
