//! Stage 1: the fixed base transformers.
//!
//! Strips store-only fields (numeric primary key, timestamps, the opaque meta
//! bag, license ids) and, for entities, folds resolved parent references in
//! place of raw identifier strings. A parent missing from the reference map
//! becomes `None`, never an error and never the raw string.

use std::collections::HashMap;

use crate::model::{Entity, EntityReference, FileRecord, StandardEntity, StandardFile};

pub fn standard_entity(
    entity: &Entity,
    refs: &HashMap<String, EntityReference>,
) -> StandardEntity {
    StandardEntity {
        id: entity.id.clone(),
        name: entity.name.clone(),
        description: entity.description.clone(),
        entity_type: entity.entity_type.clone(),
        member_of: entity.member_of.as_ref().and_then(|id| refs.get(id).cloned()),
        root_collection: entity.root_collection.as_ref().and_then(|id| refs.get(id).cloned()),
    }
}

/// Files keep their parent identifiers as raw strings; only entities get
/// folded references.
pub fn standard_file(file: &FileRecord) -> StandardFile {
    StandardFile {
        id: file.id.clone(),
        filename: file.filename.clone(),
        media_type: file.media_type.clone(),
        size: file.size,
        member_of: file.member_of.clone(),
        root_collection: file.root_collection.clone(),
    }
}
