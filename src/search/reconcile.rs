//! Parse the engine's response and reconcile its hits against the store.
//!
//! The index is a projection that may lag the system of record: a hit whose
//! identifier has no store record is dropped with a warning, never a request
//! failure. A response missing its hits structure entirely is different — that
//! is a contract violation with the collaborator and becomes an internal
//! error rather than a synthesized empty result.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::AppError;
use crate::model::Entity;
use crate::search::compile::{FACET_FIELDS, GEOHASH_AGG};

/// One engine hit: identifier plus relevance metadata.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: Option<f64>,
    pub highlight: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub total: u64,
    pub took_ms: u64,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetBucket {
    pub name: String,
    pub count: u64,
}

/// Extract hits and total from a `_search` response.
pub fn parse_response(response: &Value) -> Result<SearchOutcome, AppError> {
    let hits_obj = response
        .get("hits")
        .and_then(|h| h.as_object())
        .ok_or_else(|| AppError::internal("search engine response missing hits structure"))?;
    let hit_list = hits_obj
        .get("hits")
        .and_then(|h| h.as_array())
        .ok_or_else(|| AppError::internal("search engine response missing hits array"))?;

    let mut hits = Vec::with_capacity(hit_list.len());
    for hit in hit_list {
        let Some(id) = hit.get("_id").and_then(|v| v.as_str()) else {
            tracing::warn!("search hit without _id dropped");
            continue;
        };
        hits.push(SearchHit {
            id: id.to_string(),
            score: hit.get("_score").and_then(|v| v.as_f64()),
            highlight: hit.get("highlight").cloned(),
        });
    }

    Ok(SearchOutcome {
        total: normalize_total(hits_obj.get("total")),
        took_ms: response.get("took").and_then(|v| v.as_u64()).unwrap_or(0),
        hits,
    })
}

/// The engine reports total hits either as a bare number or as a
/// capped/uncapped `{value, relation}` object; absent means 0.
pub fn normalize_total(total: Option<&Value>) -> u64 {
    match total {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(obj)) => obj.get("value").and_then(|v| v.as_u64()).unwrap_or(0),
        _ => 0,
    }
}

/// Zip hits to their canonical records by identifier, preserving hit order.
/// Index/store drift is tolerated: unmatched hits are dropped with a warning.
pub fn reconcile(hits: Vec<SearchHit>, records: Vec<Entity>) -> Vec<(SearchHit, Entity)> {
    let mut by_id: HashMap<String, Entity> =
        records.into_iter().map(|e| (e.id.clone(), e)).collect();
    let mut pairs = Vec::with_capacity(hits.len());
    for hit in hits {
        match by_id.remove(&hit.id) {
            Some(entity) => pairs.push((hit, entity)),
            None => {
                tracing::warn!(id = %hit.id, "search hit has no store record; dropped");
            }
        }
    }
    pairs
}

/// Merge relevance metadata into a transformed entity as sibling fields.
/// Transformed fields are never overwritten.
pub fn merge_search_metadata(mut entity: Value, hit: &SearchHit) -> Value {
    if let Some(obj) = entity.as_object_mut() {
        if let Some(score) = hit.score {
            obj.entry("score".to_string()).or_insert(Value::from(score));
        }
        if let Some(highlight) = &hit.highlight {
            obj.entry("highlight".to_string()).or_insert(highlight.clone());
        }
    }
    entity
}

/// Facet buckets per aggregation field. Lenient by design: an empty result
/// set produces empty aggregations, which must still compile to (empty)
/// facets rather than an error.
pub fn parse_facets(response: &Value) -> BTreeMap<String, Vec<FacetBucket>> {
    let mut facets = BTreeMap::new();
    for field in FACET_FIELDS {
        let buckets = response
            .pointer(&format!("/aggregations/{field}/buckets"))
            .and_then(|b| b.as_array())
            .map(|buckets| {
                buckets
                    .iter()
                    .filter_map(|bucket| {
                        let name = bucket.get("key")?;
                        let name = match name {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        let count = bucket.get("doc_count").and_then(|c| c.as_u64()).unwrap_or(0);
                        Some(FacetBucket { name, count })
                    })
                    .collect()
            })
            .unwrap_or_default();
        facets.insert(field.to_string(), buckets);
    }
    facets
}

/// Geohash cell -> document count, when the grid aggregation was requested
/// and the engine returned it.
pub fn parse_geohash_grid(response: &Value) -> Option<BTreeMap<String, u64>> {
    let buckets = response
        .pointer(&format!("/aggregations/{GEOHASH_AGG}/buckets"))?
        .as_array()?;
    let mut grid = BTreeMap::new();
    for bucket in buckets {
        if let Some(cell) = bucket.get("key").and_then(|k| k.as_str()) {
            let count = bucket.get("doc_count").and_then(|c| c.as_u64()).unwrap_or(0);
            grid.insert(cell.to_string(), count);
        }
    }
    Some(grid)
}
