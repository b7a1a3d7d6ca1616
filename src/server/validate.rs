//! Boundary validation for query and body parameters.
//!
//! Everything is checked here, before any collaborator is invoked; failures
//! collect into one itemized VALIDATION_ERROR instead of bailing on the first
//! problem.

use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::AppError;
use crate::model::{
    BoundingBox, SearchRequest, SearchSortKey, SearchType, SortOrder,
};

pub const LIMIT_DEFAULT: i64 = 10;
pub const LIMIT_MAX: i64 = 1000;
pub const GEOHASH_PRECISION_MAX: i64 = 12;

pub fn parse_i64(
    params: &HashMap<String, String>,
    key: &str,
    default: i64,
    issues: &mut Vec<String>,
) -> i64 {
    match params.get(key) {
        None => default,
        Some(raw) => match raw.parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                issues.push(format!("'{key}' must be an integer, got '{raw}'"));
                default
            }
        },
    }
}

pub fn validate_limit(limit: i64, issues: &mut Vec<String>) -> i64 {
    if !(1..=LIMIT_MAX).contains(&limit) {
        issues.push(format!("'limit' must be between 1 and {LIMIT_MAX}, got {limit}"));
    }
    limit
}

pub fn validate_offset(offset: i64, issues: &mut Vec<String>) -> i64 {
    if offset < 0 {
        issues.push(format!("'offset' must not be negative, got {offset}"));
    }
    offset
}

/// Parse an enum-valued parameter; unknown values are an issue, not a
/// silent fallback.
pub fn parse_keyword<K: FromStr + Copy>(
    params: &HashMap<String, String>,
    key: &str,
    default: K,
    issues: &mut Vec<String>,
) -> K {
    match params.get(key) {
        None => default,
        Some(raw) => match raw.parse::<K>() {
            Ok(v) => v,
            Err(_) => {
                issues.push(format!("unknown value '{raw}' for '{key}'"));
                default
            }
        },
    }
}

/// Comma-separated list parameter; empty items are dropped.
pub fn parse_csv(params: &HashMap<String, String>, key: &str) -> Vec<String> {
    params
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_bool(
    params: &HashMap<String, String>,
    key: &str,
    issues: &mut Vec<String>,
) -> bool {
    match params.get(key).map(|s| s.as_str()) {
        None => false,
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        Some(other) => {
            issues.push(format!("'{key}' must be a boolean, got '{other}'"));
            false
        }
    }
}

pub fn finish(issues: Vec<String>) -> Result<(), AppError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(issues))
    }
}

/// Validate a POST /search body into a `SearchRequest`. Manual field
/// extraction keeps every problem in the itemized issue list rather than
/// failing on the first deserialization error.
pub fn parse_search_request(body: &Value) -> Result<SearchRequest, AppError> {
    let Some(obj) = body.as_object() else {
        return Err(AppError::validation_one("request body must be a JSON object"));
    };
    let mut issues = Vec::new();
    let mut request = SearchRequest::default();

    match obj.get("query") {
        None => {}
        Some(Value::String(q)) => request.query = q.clone(),
        Some(_) => issues.push("'query' must be a string".to_string()),
    }

    match obj.get("searchType") {
        None => {}
        Some(Value::String(raw)) => match raw.parse::<SearchType>() {
            Ok(mode) => request.search_type = mode,
            Err(_) => issues.push(format!("unknown value '{raw}' for 'searchType'")),
        },
        Some(_) => issues.push("'searchType' must be a string".to_string()),
    }

    match obj.get("filters") {
        None => {}
        Some(Value::Object(filters)) => {
            for (field, values) in filters {
                match values {
                    Value::Array(items) => {
                        let mut parsed = Vec::with_capacity(items.len());
                        for item in items {
                            match item.as_str() {
                                Some(s) => parsed.push(s.to_string()),
                                None => issues
                                    .push(format!("filter '{field}' values must be strings")),
                            }
                        }
                        request.filters.insert(field.clone(), parsed);
                    }
                    Value::String(single) => {
                        request.filters.insert(field.clone(), vec![single.clone()]);
                    }
                    _ => issues.push(format!(
                        "filter '{field}' must be a string or an array of strings"
                    )),
                }
            }
        }
        Some(_) => issues.push("'filters' must be an object".to_string()),
    }

    match obj.get("boundingBox") {
        None => {}
        Some(raw) => match serde_json::from_value::<BoundingBox>(raw.clone()) {
            Ok(bbox) => {
                for (corner, point) in [("topRight", bbox.top_right), ("bottomLeft", bbox.bottom_left)] {
                    if !(-90.0..=90.0).contains(&point.lat) {
                        issues.push(format!("'boundingBox.{corner}.lat' out of range"));
                    }
                    if !(-180.0..=180.0).contains(&point.lng) {
                        issues.push(format!("'boundingBox.{corner}.lng' out of range"));
                    }
                }
                request.bounding_box = Some(bbox);
            }
            Err(_) => issues.push(
                "'boundingBox' must carry topRight and bottomLeft corners with lat/lng".to_string(),
            ),
        },
    }

    match obj.get("geohashPrecision") {
        None => {}
        Some(raw) => match raw.as_i64() {
            Some(p) if (0..=GEOHASH_PRECISION_MAX).contains(&p) => {
                request.geohash_precision = Some(p as u8)
            }
            _ => issues.push(format!(
                "'geohashPrecision' must be an integer between 0 and {GEOHASH_PRECISION_MAX}"
            )),
        },
    }

    match obj.get("limit") {
        None => {}
        Some(raw) => match raw.as_i64() {
            Some(limit) => request.limit = validate_limit(limit, &mut issues),
            None => issues.push("'limit' must be an integer".to_string()),
        },
    }
    match obj.get("offset") {
        None => {}
        Some(raw) => match raw.as_i64() {
            Some(offset) => request.offset = validate_offset(offset, &mut issues),
            None => issues.push("'offset' must be an integer".to_string()),
        },
    }

    match obj.get("sort") {
        None => {}
        Some(Value::String(raw)) => match raw.parse::<SearchSortKey>() {
            Ok(sort) => request.sort = sort,
            Err(_) => issues.push(format!("unknown value '{raw}' for 'sort'")),
        },
        Some(_) => issues.push("'sort' must be a string".to_string()),
    }
    match obj.get("order") {
        None => {}
        Some(Value::String(raw)) => match raw.parse::<SortOrder>() {
            Ok(order) => request.order = order,
            Err(_) => issues.push(format!("unknown value '{raw}' for 'order'")),
        },
        Some(_) => issues.push("'order' must be a string".to_string()),
    }

    finish(issues)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntitySortKey;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn limit_zero_and_negative_offset_are_rejected() {
        let mut issues = Vec::new();
        validate_limit(0, &mut issues);
        validate_offset(-1, &mut issues);
        assert_eq!(issues.len(), 2);
        let err = finish(issues).err().unwrap();
        assert_eq!(err.code_str(), "VALIDATION_ERROR");
    }

    #[test]
    fn limit_upper_bound_is_inclusive() {
        let mut issues = Vec::new();
        validate_limit(1000, &mut issues);
        assert!(issues.is_empty());
        validate_limit(1001, &mut issues);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn unknown_sort_key_is_an_issue() {
        let mut issues = Vec::new();
        let sort: EntitySortKey = parse_keyword(
            &params(&[("sort", "size")]),
            "sort",
            EntitySortKey::Id,
            &mut issues,
        );
        assert_eq!(sort, EntitySortKey::Id);
        assert_eq!(issues, vec!["unknown value 'size' for 'sort'".to_string()]);
    }

    #[test]
    fn csv_parameter_splits_and_drops_empties() {
        let types = parse_csv(&params(&[("entityType", "a, b,,c")]), "entityType");
        assert_eq!(types, vec!["a", "b", "c"]);
        assert!(parse_csv(&params(&[]), "entityType").is_empty());
    }

    #[test]
    fn search_body_defaults_and_ranges() {
        let request = parse_search_request(&json!({"query": "wave"})).unwrap();
        assert_eq!(request.limit, 10);
        assert_eq!(request.offset, 0);
        assert_eq!(request.sort, SearchSortKey::Relevance);

        let err = parse_search_request(&json!({
            "query": "wave",
            "searchType": "regex",
            "geohashPrecision": 13,
            "limit": 0,
        }))
        .err()
        .unwrap();
        let AppError::Validation { issues } = err else { panic!("expected validation") };
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn search_body_single_string_filter_becomes_list() {
        let request = parse_search_request(&json!({
            "query": "wave",
            "filters": {"language": "en", "mediaType": ["audio/wav", "video/mp4"]},
        }))
        .unwrap();
        assert_eq!(request.filters["language"], vec!["en"]);
        assert_eq!(request.filters["mediaType"].len(), 2);
    }
}
