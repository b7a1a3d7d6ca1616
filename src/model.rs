//! Canonical record types and the shapes the transformation pipeline moves
//! them through: raw store row -> Standard (normalized) -> Authorised
//! (access-annotated) -> arbitrarily enriched JSON.
//!
//! Raw `Entity`/`FileRecord` rows are read-only from the core's perspective
//! and are never serialized to clients; the Standard shapes are the only input
//! custom pipeline stages may assume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Canonical catalogue entity as stored: collection, object, person, media
/// object, or any other URI-tagged type. The `meta` bag is opaque
/// implementation detail consumed by content handlers only.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Entity {
    pub pk: i64,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub entity_type: String,
    pub member_of: Option<String>,
    pub root_collection: Option<String>,
    pub metadata_license_id: Option<String>,
    pub content_license_id: Option<String>,
    pub meta: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical media file record. Unlike entities, `member_of` and
/// `root_collection` are never null, and there is no metadata license: file
/// metadata is always public, only content is gated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    pub pk: i64,
    pub id: String,
    pub filename: String,
    pub media_type: String,
    pub size: i64,
    pub member_of: String,
    pub root_collection: String,
    pub content_license_id: Option<String>,
    pub meta: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A resolved parent pointer. `None` in the surrounding Option means the
/// referenced record no longer exists; that is graceful degradation, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub id: String,
    pub name: String,
}

/// Normalized entity projection: store-only fields stripped, parent
/// identifiers replaced by resolved references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardEntity {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub entity_type: String,
    pub member_of: Option<EntityReference>,
    pub root_collection: Option<EntityReference>,
}

/// Normalized file projection. Parent identifiers stay as raw id strings;
/// files are leaves and their parents are not folded into references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardFile {
    pub id: String,
    pub filename: String,
    pub media_type: String,
    pub size: i64,
    pub member_of: String,
    pub root_collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAccess {
    pub metadata: bool,
    pub content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_authorization_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAccess {
    pub content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_authorization_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorisedEntity {
    #[serde(flatten)]
    pub entity: StandardEntity,
    pub access: EntityAccess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorisedFile {
    #[serde(flatten)]
    pub file: StandardFile,
    pub access: FileAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
    pub fn as_engine(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySortKey {
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for EntitySortKey {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(EntitySortKey::Id),
            "name" => Ok(EntitySortKey::Name),
            "createdAt" => Ok(EntitySortKey::CreatedAt),
            "updatedAt" => Ok(EntitySortKey::UpdatedAt),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSortKey {
    Id,
    Filename,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for FileSortKey {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(FileSortKey::Id),
            "filename" => Ok(FileSortKey::Filename),
            "createdAt" => Ok(FileSortKey::CreatedAt),
            "updatedAt" => Ok(FileSortKey::UpdatedAt),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSortKey {
    Id,
    Name,
    CreatedAt,
    UpdatedAt,
    Relevance,
}

impl FromStr for SearchSortKey {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SearchSortKey::Id),
            "name" => Ok(SearchSortKey::Name),
            "createdAt" => Ok(SearchSortKey::CreatedAt),
            "updatedAt" => Ok(SearchSortKey::UpdatedAt),
            "relevance" => Ok(SearchSortKey::Relevance),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// Fuzzy multi-field match; recall over precision.
    Basic,
    /// Boolean query-string expression with AND as the implicit operator.
    Advanced,
}

impl FromStr for SearchType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(SearchType::Basic),
            "advanced" => Ok(SearchType::Advanced),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A bounding box given by two arbitrary corners as the caller labelled them.
/// The search compiler normalizes them into the engine's diagonal-corner
/// convention regardless of which corner actually is which.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub top_right: GeoPoint,
    pub bottom_left: GeoPoint,
}

/// A validated, declarative search request. Construction goes through the
/// HTTP boundary validation; everything in here is in range.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: SearchType,
    pub filters: HashMap<String, Vec<String>>,
    pub bounding_box: Option<BoundingBox>,
    pub geohash_precision: Option<u8>,
    pub limit: i64,
    pub offset: i64,
    pub sort: SearchSortKey,
    pub order: SortOrder,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            query: String::new(),
            search_type: SearchType::Basic,
            filters: HashMap::new(),
            bounding_box: None,
            geohash_precision: None,
            limit: 10,
            offset: 0,
            sort: SearchSortKey::Relevance,
            order: SortOrder::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorised_entity_flattens_standard_fields() {
        let auth = AuthorisedEntity {
            entity: StandardEntity {
                id: "arcp://name,corpus/item/1".to_string(),
                name: "Item 1".to_string(),
                description: None,
                entity_type: "http://pcdm.org/models#Object".to_string(),
                member_of: Some(EntityReference {
                    id: "arcp://name,corpus".to_string(),
                    name: "Corpus".to_string(),
                }),
                root_collection: Some(EntityReference {
                    id: "arcp://name,corpus".to_string(),
                    name: "Corpus".to_string(),
                }),
            },
            access: EntityAccess { metadata: true, content: false, content_authorization_url: None },
        };
        let v = serde_json::to_value(&auth).unwrap();
        assert_eq!(v["id"], "arcp://name,corpus/item/1");
        assert_eq!(v["memberOf"]["name"], "Corpus");
        assert_eq!(v["access"]["metadata"], true);
        assert_eq!(v["access"]["content"], false);
        assert!(v["access"].get("contentAuthorizationUrl").is_none());
    }

    #[test]
    fn sort_keys_parse_from_api_names() {
        assert_eq!("createdAt".parse::<EntitySortKey>(), Ok(EntitySortKey::CreatedAt));
        assert_eq!("filename".parse::<FileSortKey>(), Ok(FileSortKey::Filename));
        assert_eq!("relevance".parse::<SearchSortKey>(), Ok(SearchSortKey::Relevance));
        assert!("size".parse::<EntitySortKey>().is_err());
        assert!("ASC".parse::<SortOrder>().is_err());
    }
}
