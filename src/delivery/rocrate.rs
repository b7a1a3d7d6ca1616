//! RO-Crate handler: serves an entity's metadata document.
//!
//! The document is a JSON-LD graph assembled from the store — the entity as
//! the root dataset, its files as parts, its direct members — and delivered
//! as an in-memory stream. Entity metadata documents always exist, so this
//! handler never returns the absence sentinel for a record it was given.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

use crate::context::RequestContext;
use crate::delivery::{memory_stream, ContentHandler, ContentMetadata, FileResult};
use crate::error::AppError;
use crate::model::{Entity, EntitySortKey, FileSortKey, SortOrder};
use crate::store::{EntityListQuery, FileListQuery, RecordStore};

const ROCRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";
const ROCRATE_SPEC: &str = "https://w3id.org/ro/crate/1.1";
const MEDIA_TYPE: &str = "application/ld+json";

/// Upper bound on parts/members folded into one document.
const CHILD_LIMIT: i64 = 10_000;

pub struct RoCrateHandler {
    store: Arc<dyn RecordStore>,
}

impl RoCrateHandler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        RoCrateHandler { store }
    }

    async fn build(&self, entity: &Entity) -> Result<(Vec<u8>, ContentMetadata), AppError> {
        let document = self.build_document(entity).await?;
        let bytes = serde_json::to_vec_pretty(&document)?;
        let etag = format!("{:016x}", xxh3_64(&bytes));
        let metadata = ContentMetadata {
            content_type: MEDIA_TYPE.to_string(),
            content_length: bytes.len() as u64,
            etag: Some(etag),
            last_modified: Some(entity.updated_at),
        };
        Ok((bytes, metadata))
    }

    async fn build_document(&self, entity: &Entity) -> Result<Value, AppError> {
        let files = self
            .store
            .list_files(&FileListQuery {
                member_of: Some(entity.id.clone()),
                limit: CHILD_LIMIT,
                offset: 0,
                sort: FileSortKey::Id,
                order: SortOrder::Asc,
            })
            .await?;
        let members = self
            .store
            .list_entities(&EntityListQuery {
                member_of: Some(entity.id.clone()),
                entity_types: Vec::new(),
                limit: CHILD_LIMIT,
                offset: 0,
                sort: EntitySortKey::Id,
                order: SortOrder::Asc,
            })
            .await?;

        let mut graph = vec![
            json!({
                "@id": "ro-crate-metadata.json",
                "@type": "CreativeWork",
                "conformsTo": { "@id": ROCRATE_SPEC },
                "about": { "@id": "./" },
            }),
            json!({
                "@id": "./",
                "@type": "Dataset",
                "identifier": entity.id,
                "name": entity.name,
                "description": entity.description,
                "hasPart": files.iter().map(|f| json!({ "@id": f.id })).collect::<Vec<_>>(),
                "hasMember": members.iter().map(|m| json!({ "@id": m.id })).collect::<Vec<_>>(),
            }),
        ];
        for file in &files {
            graph.push(json!({
                "@id": file.id,
                "@type": "File",
                "name": file.filename,
                "encodingFormat": file.media_type,
                "contentSize": file.size,
            }));
        }
        for member in &members {
            graph.push(json!({
                "@id": member.id,
                "@type": "Dataset",
                "name": member.name,
                "additionalType": member.entity_type,
            }));
        }

        Ok(json!({ "@context": ROCRATE_CONTEXT, "@graph": graph }))
    }
}

#[async_trait]
impl ContentHandler<Entity> for RoCrateHandler {
    async fn get(
        &self,
        record: &Entity,
        _ctx: &RequestContext,
    ) -> Result<Option<FileResult>, AppError> {
        let (bytes, metadata) = self.build(record).await?;
        Ok(Some(FileResult::Stream { stream: memory_stream(bytes), metadata }))
    }

    async fn head(
        &self,
        record: &Entity,
        _ctx: &RequestContext,
    ) -> Result<Option<ContentMetadata>, AppError> {
        let (_, metadata) = self.build(record).await?;
        Ok(Some(metadata))
    }
}
