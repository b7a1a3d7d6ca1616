//! Compile a declarative search request into an engine `_search` body.
//!
//! Built as plain JSON trees: the engine's query DSL is itself JSON and a
//! typed mirror of it would only restate the engine's schema.

use serde_json::{json, Map, Value};

use crate::model::{BoundingBox, SearchRequest, SearchSortKey, SearchType, SortOrder};

/// Fields queried by both search modes; name outranks description 2x.
const QUERY_FIELDS: [&str; 2] = ["name^2", "description"];

/// Facet aggregations requested on every search.
pub const FACET_FIELDS: [&str; 4] = ["language", "mediaType", "communicationMode", "entityType"];
const FACET_SIZE: u32 = 20;

/// Aggregation key for the geospatial grid.
pub const GEOHASH_AGG: &str = "geohashGrid";

/// Geo-point field in the index mapping.
const LOCATION_FIELD: &str = "location";

/// Build the complete `_search` request body. Hits carry no source: the
/// store is the system of record, the engine only returns identifiers and
/// relevance metadata.
pub fn compile(request: &SearchRequest) -> Value {
    let mut body = json!({
        "query": compile_query(request),
        "aggs": compile_aggregations(request),
        "from": request.offset,
        "size": request.limit,
        "track_total_hits": true,
        "_source": false,
        "highlight": { "fields": { "name": {}, "description": {} } },
    });
    if let Some(sort) = compile_sort(request.sort, request.order) {
        body["sort"] = sort;
    }
    body
}

pub fn compile_query(request: &SearchRequest) -> Value {
    let main = match request.search_type {
        SearchType::Basic => json!({
            "multi_match": {
                "query": request.query,
                "fields": QUERY_FIELDS,
                "fuzziness": "AUTO",
            }
        }),
        SearchType::Advanced => json!({
            "query_string": {
                "query": request.query,
                "fields": QUERY_FIELDS,
                "default_operator": "AND",
            }
        }),
    };

    let filters = filter_clauses(request);
    if filters.is_empty() {
        main
    } else {
        // Filter context: exact-match constraints must not affect scoring.
        json!({ "bool": { "must": [main], "filter": filters } })
    }
}

fn filter_clauses(request: &SearchRequest) -> Vec<Value> {
    let mut clauses = Vec::new();
    // Deterministic clause order regardless of map iteration order.
    let mut fields: Vec<&String> = request.filters.keys().collect();
    fields.sort();
    for field in fields {
        let values = &request.filters[field];
        match values.len() {
            0 => {}
            1 => clauses.push(json!({ "term": { field.as_str(): values[0] } })),
            _ => clauses.push(json!({ "terms": { field.as_str(): values } })),
        }
    }
    if let Some(bbox) = &request.bounding_box {
        clauses.push(json!({ "geo_bounding_box": { LOCATION_FIELD: geo_bounds(bbox) } }));
    }
    clauses
}

/// Normalize the caller's two corners into the engine's diagonal-corner
/// convention: top_left takes the top-right latitude with the bottom-left
/// longitude, bottom_right the bottom-left latitude with the top-right
/// longitude.
pub fn geo_bounds(bbox: &BoundingBox) -> Value {
    json!({
        "top_left": { "lat": bbox.top_right.lat, "lon": bbox.bottom_left.lng },
        "bottom_right": { "lat": bbox.bottom_left.lat, "lon": bbox.top_right.lng },
    })
}

pub fn compile_aggregations(request: &SearchRequest) -> Value {
    let mut aggs = Map::new();
    for field in FACET_FIELDS {
        aggs.insert(
            field.to_string(),
            json!({ "terms": { "field": field, "size": FACET_SIZE } }),
        );
    }
    // The grid is only meaningful inside a viewport: both the precision and
    // the box must be present.
    if let (Some(precision), Some(bbox)) = (request.geohash_precision, &request.bounding_box) {
        aggs.insert(
            GEOHASH_AGG.to_string(),
            json!({
                "geohash_grid": {
                    "field": LOCATION_FIELD,
                    "precision": precision,
                    "bounds": geo_bounds(bbox),
                }
            }),
        );
    }
    Value::Object(aggs)
}

/// `relevance` defers to the engine's native score ordering by omitting the
/// sort clause entirely. `name` sorts on the keyword sub-field: ordering must
/// be lexicographic on the raw string, not token-based.
pub fn compile_sort(sort: SearchSortKey, order: SortOrder) -> Option<Value> {
    let field = match sort {
        SearchSortKey::Relevance => return None,
        SearchSortKey::Id => "id",
        SearchSortKey::Name => "name.keyword",
        SearchSortKey::CreatedAt => "createdAt",
        SearchSortKey::UpdatedAt => "updatedAt",
    };
    Some(json!([{ field: { "order": order.as_engine() } }]))
}
