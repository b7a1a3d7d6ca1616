//! In-memory collaborator fakes shared by the integration tests.
//! Nothing here talks to a live Postgres or search engine; the fakes count
//! their calls so tests can assert batching and validate-before-store rules.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tabularium::config::Config;
use tabularium::context::AppContext;
use tabularium::error::AppError;
use tabularium::model::{Entity, EntitySortKey, FileRecord, FileSortKey, SortOrder};
use tabularium::search::SearchEngine;
use tabularium::server::{build_state, AppState};
use tabularium::store::{EntityListQuery, FileListQuery, RecordStore};

pub const OPEN_LICENSE: &str = "https://example.org/licenses/open";
pub const RESTRICTED_LICENSE: &str = "https://example.org/licenses/restricted";

pub struct FakeStore {
    pub entities: Vec<Entity>,
    pub files: Vec<FileRecord>,
    /// Every store round trip, whatever the operation.
    pub calls: AtomicUsize,
    /// Batched id-list lookups specifically.
    pub batched_lookups: AtomicUsize,
}

impl FakeStore {
    pub fn new(entities: Vec<Entity>, files: Vec<FileRecord>) -> Arc<Self> {
        Arc::new(FakeStore {
            entities,
            files,
            calls: AtomicUsize::new(0),
            batched_lookups: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, AppError> {
        self.tick();
        Ok(self.entities.iter().find(|e| e.id == id).cloned())
    }

    async fn list_entities(&self, q: &EntityListQuery) -> Result<Vec<Entity>, AppError> {
        self.tick();
        let mut rows: Vec<Entity> = self
            .entities
            .iter()
            .filter(|e| q.member_of.as_ref().map_or(true, |m| e.member_of.as_deref() == Some(m)))
            .filter(|e| q.entity_types.is_empty() || q.entity_types.contains(&e.entity_type))
            .cloned()
            .collect();
        match q.sort {
            EntitySortKey::Id => rows.sort_by(|a, b| a.id.cmp(&b.id)),
            EntitySortKey::Name => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            EntitySortKey::CreatedAt => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            EntitySortKey::UpdatedAt => rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        }
        if q.order == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(q.offset.max(0) as usize)
            .take(q.limit.max(0) as usize)
            .collect())
    }

    async fn count_entities(&self, q: &EntityListQuery) -> Result<u64, AppError> {
        self.tick();
        let n = self
            .entities
            .iter()
            .filter(|e| q.member_of.as_ref().map_or(true, |m| e.member_of.as_deref() == Some(m)))
            .filter(|e| q.entity_types.is_empty() || q.entity_types.contains(&e.entity_type))
            .count();
        Ok(n as u64)
    }

    async fn entities_by_ids(&self, ids: &[String]) -> Result<Vec<Entity>, AppError> {
        self.tick();
        self.batched_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entities
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>, AppError> {
        self.tick();
        Ok(self.files.iter().find(|f| f.id == id).cloned())
    }

    async fn list_files(&self, q: &FileListQuery) -> Result<Vec<FileRecord>, AppError> {
        self.tick();
        let mut rows: Vec<FileRecord> = self
            .files
            .iter()
            .filter(|f| q.member_of.as_ref().map_or(true, |m| &f.member_of == m))
            .cloned()
            .collect();
        match q.sort {
            FileSortKey::Id => rows.sort_by(|a, b| a.id.cmp(&b.id)),
            FileSortKey::Filename => rows.sort_by(|a, b| a.filename.cmp(&b.filename)),
            FileSortKey::CreatedAt => rows.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            FileSortKey::UpdatedAt => rows.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
        }
        if q.order == SortOrder::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(q.offset.max(0) as usize)
            .take(q.limit.max(0) as usize)
            .collect())
    }

    async fn count_files(&self, q: &FileListQuery) -> Result<u64, AppError> {
        self.tick();
        let n = self
            .files
            .iter()
            .filter(|f| q.member_of.as_ref().map_or(true, |m| &f.member_of == m))
            .count();
        Ok(n as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct FakeSearch {
    pub response: Value,
    pub last_body: Mutex<Option<Value>>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new(response: Value) -> Arc<Self> {
        Arc::new(FakeSearch {
            response,
            last_body: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(json!({
            "took": 1,
            "hits": {"total": {"value": 0, "relation": "eq"}, "hits": []},
            "aggregations": {
                "language": {"buckets": []},
                "mediaType": {"buckets": []},
                "communicationMode": {"buckets": []},
                "entityType": {"buckets": []},
            }
        }))
    }

    pub fn recorded_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchEngine for FakeSearch {
    async fn search(&self, body: &Value) -> Result<Value, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock().unwrap() = Some(body.clone());
        Ok(self.response.clone())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        base_url: "http://api.test".to_string(),
        public_licenses: vec![OPEN_LICENSE.to_string()],
        authorization_url: Some("https://example.org/authorize".to_string()),
        ..Config::default()
    }
}

pub fn entity(id: &str, name: &str, member_of: Option<&str>, root: Option<&str>) -> Entity {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Entity {
        pk: 1,
        id: id.to_string(),
        name: name.to_string(),
        description: Some(format!("description of {name}")),
        entity_type: "http://pcdm.org/models#Object".to_string(),
        member_of: member_of.map(|s| s.to_string()),
        root_collection: root.map(|s| s.to_string()),
        metadata_license_id: Some(OPEN_LICENSE.to_string()),
        content_license_id: Some(OPEN_LICENSE.to_string()),
        meta: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn collection(id: &str, name: &str) -> Entity {
    let mut e = entity(id, name, None, None);
    e.entity_type = "http://pcdm.org/models#Collection".to_string();
    e
}

pub fn file(id: &str, filename: &str, member_of: &str, root: &str, path: Option<&str>) -> FileRecord {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    FileRecord {
        pk: 1,
        id: id.to_string(),
        filename: filename.to_string(),
        media_type: "audio/wav".to_string(),
        size: 4,
        member_of: member_of.to_string(),
        root_collection: root.to_string(),
        content_license_id: Some(OPEN_LICENSE.to_string()),
        meta: path.map(|p| json!({ "path": p })),
        created_at: created,
        updated_at: created,
    }
}

pub fn app_state_with(
    store: Arc<FakeStore>,
    search: Arc<FakeSearch>,
    config: Config,
) -> AppState {
    let ctx = Arc::new(AppContext { store, search, config });
    build_state(ctx).expect("state setup must succeed")
}

pub fn app_state(store: Arc<FakeStore>, search: Arc<FakeSearch>) -> AppState {
    app_state_with(store, search, test_config())
}

/// Collect a response body into JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
